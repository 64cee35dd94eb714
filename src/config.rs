//! Configuration management for Ipgeo.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables prefixed with `IPGEO__` (nested keys separated by
//! `__`, e.g. `IPGEO__RATE_LIMITING__REQUESTS_PER_SECOND=50`).

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{IpgeoError, Result};

const ENV_PREFIX: &str = "IPGEO";
const ENV_SEPARATOR: &str = "__";

/// Main configuration for the Ipgeo service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpgeoConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Lookup backend configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Cross-origin policy
    #[serde(default)]
    pub cors: CorsConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Longest a single request may take before it is answered with 408
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long in-flight requests may run after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_request_timeout() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    5
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per one-second window, across all clients
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_requests_per_second() -> u32 {
    100
}

/// The lookup backends this build knows how to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Exact-match in-memory table loaded from a CSV dataset
    #[default]
    Table,
}

/// Lookup backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Dataset with one `address,city,country` record per line
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            dataset_path: default_dataset_path(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/ip2country.csv")
}

/// Cross-origin resource sharing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// A YAML list, or a comma-separated string when set from the environment
    #[serde(
        default = "default_allowed_origins",
        deserialize_with = "deserialize_origins"
    )]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn deserialize_origins<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Origins {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Origins::deserialize(deserializer)? {
        Origins::List(origins) => origins,
        Origins::Joined(joined) => joined.split(',').map(|o| o.trim().to_string()).collect(),
    })
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Environment source for `IPGEO__*` variables.
///
/// Values stay strings; typed fields parse them during deserialization, so
/// an all-digit path is still a path.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
}

impl IpgeoConfig {
    /// Load configuration from an optional YAML file overlaid with
    /// `IPGEO__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }

        let config: IpgeoConfig = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML document, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: IpgeoConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would leave the service unable to do useful work.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limiting.requests_per_second == 0 {
            return Err(IpgeoError::Config(
                "rate_limiting.requests_per_second must be greater than zero".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(IpgeoError::Config(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.cors.allowed_origins.iter().any(|o| o.trim().is_empty()) {
            return Err(IpgeoError::Config(
                "cors.allowed_origins must not contain empty entries".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IpgeoConfig::default();
        assert_eq!(config.server.http_addr.port(), 8080);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.rate_limiting.requests_per_second, 100);
        assert_eq!(config.lookup.backend, BackendKind::Table);
        assert_eq!(config.lookup.dataset_path, PathBuf::from("data/ip2country.csv"));
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:3000"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  http_addr: "127.0.0.1:9000"
rate_limiting:
  requests_per_second: 25
lookup:
  backend: table
  dataset_path: /srv/geo.csv
cors:
  allowed_origins:
    - https://example.com
    - https://app.example.com
"#;
        let config = IpgeoConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.rate_limiting.requests_per_second, 25);
        assert_eq!(config.lookup.dataset_path, PathBuf::from("/srv/geo.csv"));
        assert_eq!(config.cors.allowed_origins.len(), 2);
        // Unspecified sections keep their defaults
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let yaml = r#"
lookup:
  backend: mongodb
"#;
        let result = IpgeoConfig::from_yaml(yaml);
        assert!(matches!(result, Err(IpgeoError::Config(_))));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let yaml = r#"
rate_limiting:
  requests_per_second: 0
"#;
        let result = IpgeoConfig::from_yaml(yaml);
        assert!(matches!(result, Err(IpgeoError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipgeo.yaml");
        std::fs::write(&path, "rate_limiting:\n  requests_per_second: 7\n").unwrap();

        let config = IpgeoConfig::load(Some(&path)).unwrap();
        assert_eq!(config.rate_limiting.requests_per_second, 7);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = IpgeoConfig::load(Some(Path::new("/nonexistent/ipgeo.yaml")));
        assert!(result.is_err());
    }

    fn env_source(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_overrides() {
        let env = env_source(&[
            ("IPGEO__SERVER__HTTP_ADDR", "127.0.0.1:9999"),
            ("IPGEO__SERVER__REQUEST_TIMEOUT_SECS", "3"),
            ("IPGEO__RATE_LIMITING__REQUESTS_PER_SECOND", "50"),
            ("IPGEO__LOOKUP__DATASET_PATH", "12345"),
            ("IPGEO__CORS__ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("IPGEO__LOGGING__JSON", "true"),
            ("UNRELATED", "ignored"),
        ]);

        let config = IpgeoConfig::load_with_env(None, env).unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9999".parse().unwrap());
        assert_eq!(config.server.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.rate_limiting.requests_per_second, 50);
        assert_eq!(config.lookup.dataset_path, PathBuf::from("12345"));
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipgeo.yaml");
        std::fs::write(
            &path,
            "rate_limiting:\n  requests_per_second: 7\nlookup:\n  dataset_path: /srv/geo.csv\n",
        )
        .unwrap();

        let env = env_source(&[("IPGEO__RATE_LIMITING__REQUESTS_PER_SECOND", "9")]);
        let config = IpgeoConfig::load_with_env(Some(&path), env).unwrap();
        assert_eq!(config.rate_limiting.requests_per_second, 9);
        assert_eq!(config.lookup.dataset_path, PathBuf::from("/srv/geo.csv"));
    }

    #[test]
    fn test_env_invalid_number_rejected() {
        let env = env_source(&[("IPGEO__RATE_LIMITING__REQUESTS_PER_SECOND", "lots")]);
        let result = IpgeoConfig::load_with_env(None, env);
        assert!(matches!(result, Err(IpgeoError::Config(_))));
    }
}
