//! HTTP server implementation.

use axum::Router;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::{IpgeoError, Result};

/// Default time allowed for in-flight requests once shutdown begins.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP server for the lookup API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Fully layered application router
    router: Router,
    /// How long draining may take before the server stops anyway
    shutdown_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server serving `router` on `addr`.
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set how long in-flight requests may run after shutdown is signalled.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server stops accepting connections when the provided signal
    /// resolves. It returns once in-flight requests have finished, or when
    /// the shutdown timeout elapses, whichever comes first.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server");

        let (draining_tx, draining_rx) = oneshot::channel::<()>();
        let signal = async move {
            signal.await;
            let _ = draining_tx.send(());
        };

        let shutdown_timeout = self.shutdown_timeout;
        let deadline = async move {
            match draining_rx.await {
                Ok(()) => tokio::time::sleep(shutdown_timeout).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        let server = axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();

        tokio::select! {
            result = server => result.map_err(|e| {
                error!(error = %e, "HTTP server failed");
                IpgeoError::Server(e.to_string())
            }),
            () = deadline => {
                warn!(
                    timeout_secs = shutdown_timeout.as_secs_f64(),
                    "Shutdown timed out, abandoning in-flight requests"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let server = HttpServer::new(addr, Router::new());
        let result = server.serve_with_shutdown(async {}).await;
        assert!(matches!(result, Err(IpgeoError::Io(_))));
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        // Reserve a free port, then release it for the server.
        let addr = {
            let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
            reserved.local_addr().unwrap()
        };

        let router = Router::new().route("/ping", get(|| async { "pong" }));
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(HttpServer::new(addr, router).serve_with_shutdown(async {
            let _ = rx.await;
        }));

        let mut stream = loop {
            match tokio::net::TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("pong"));

        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_deadline_abandons_hung_requests() {
        let addr = {
            let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
            reserved.local_addr().unwrap()
        };

        let router = Router::new().route(
            "/hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(
            HttpServer::new(addr, router)
                .with_shutdown_timeout(Duration::from_millis(200))
                .serve_with_shutdown(async {
                    let _ = rx.await;
                }),
        );

        let mut stream = loop {
            match tokio::net::TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"GET /hang HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server should stop at the shutdown deadline");
        assert!(result.unwrap().is_ok());
    }
}
