use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ipgeo::config::{IpgeoConfig, LoggingConfig};
use ipgeo::http::{create_router, AppState, HttpServer};
use ipgeo::lookup::LookupBackend;
use ipgeo::ratelimit::RateLimiter;

/// Rate-limited IP address to country/city lookup service.
#[derive(Parser, Debug)]
#[command(name = "ipgeo", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to load, overriding lookup.dataset_path
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Port to listen on, overriding the port of server.http_addr
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A missing .env is normal outside development
    let dotenv = dotenvy::dotenv();

    let mut config = IpgeoConfig::load(args.config.as_deref())?;
    if let Some(dataset) = args.dataset {
        config.lookup.dataset_path = dataset;
    }
    if let Some(port) = args.port {
        config.server.http_addr.set_port(port);
    }

    init_tracing(&config.logging);

    info!("Starting Ipgeo Lookup Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = dotenv {
        info!(reason = %e, "No .env file loaded");
    }
    info!(
        http_addr = %config.server.http_addr,
        request_timeout_secs = config.server.request_timeout_secs,
        shutdown_timeout_secs = config.server.shutdown_timeout_secs,
        requests_per_second = config.rate_limiting.requests_per_second,
        backend = ?config.lookup.backend,
        allowed_origins = ?config.cors.allowed_origins,
        "Configuration loaded"
    );

    // A dataset that fails to load aborts startup
    let lookup = Arc::new(LookupBackend::from_config(&config.lookup)?);

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limiting.requests_per_second));
    info!(budget = rate_limiter.budget(), "Rate limiter initialized");

    let router = create_router(AppState::new(lookup, rate_limiter), &config)?;
    let server = HttpServer::new(config.server.http_addr, router)
        .with_shutdown_timeout(config.server.shutdown_timeout());

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Ipgeo Lookup Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|e| {
            eprintln!("invalid log level {:?} ({e}), falling back to info", logging.level);
            EnvFilter::new("info")
        });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
