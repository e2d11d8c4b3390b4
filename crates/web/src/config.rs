//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CIVIC_BASE_URL` - Public URL of the site (cookies are marked secure on https)
//! - `CIVIC_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed with the memory backend)
//!
//! ## Optional
//! - `CIVIC_DATA_BACKEND` - `postgres` (default) or `memory` (seeded demo data)
//! - `CIVIC_HOST` - Bind address (default: 127.0.0.1)
//! - `CIVIC_PORT` - Listen port (default: 3000)
//! - `CIVIC_UPLOAD_DIR` - Directory for uploaded photos (default: data/uploads)
//! - `CIVIC_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where issues, users and profiles are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBackend {
    #[default]
    Postgres,
    /// Process-local stores seeded with demo data. Nothing survives a restart.
    Memory,
}

impl FromStr for DataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Web application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct WebConfig {
    pub backend: DataBackend,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Root directory of the local object storage
    pub upload_dir: PathBuf,
    pub log_json: bool,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebConfig")
            .field("backend", &self.backend)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("upload_dir", &self.upload_dir)
            .field("log_json", &self.log_json)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = parse_env("CIVIC_DATA_BACKEND", "postgres")?;
        let database_url = match backend {
            DataBackend::Postgres => Some(get_database_url("CIVIC_DATABASE_URL")?),
            DataBackend::Memory => get_optional_database_url("CIVIC_DATABASE_URL"),
        };
        let host = parse_env("CIVIC_HOST", "127.0.0.1")?;
        let port = parse_env("CIVIC_PORT", "3000")?;
        let base_url = normalize_base_url("CIVIC_BASE_URL", &get_required_env("CIVIC_BASE_URL")?)?;
        let upload_dir = PathBuf::from(get_env_or_default("CIVIC_UPLOAD_DIR", "data/uploads"));
        let log_json = get_optional_env("CIVIC_LOG_JSON").is_some_and(|v| is_truthy(&v));

        Ok(Self {
            backend,
            database_url,
            host,
            port,
            base_url,
            upload_dir,
            log_json,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Configuration for in-process use (tests, demos): memory backend,
    /// plain-http base URL, no error tracking.
    #[must_use]
    pub fn local(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: DataBackend::Memory,
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            upload_dir: upload_dir.into(),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    get_optional_database_url(primary_key)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn normalize_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_data_backend_parse() {
        assert_eq!("memory".parse::<DataBackend>().unwrap(), DataBackend::Memory);
        assert_eq!(
            "PostgreSQL".parse::<DataBackend>().unwrap(),
            DataBackend::Postgres
        );
        assert!("sqlite".parse::<DataBackend>().is_err());
    }

    #[test]
    fn test_normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("K", "https://pulse.example.org/").unwrap(),
            "https://pulse.example.org"
        );
        assert_eq!(
            normalize_base_url("K", "http://localhost:3000").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_garbage() {
        assert!(matches!(
            normalize_base_url("K", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(normalize_base_url("K", "ftp://files.example.org").is_err());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("nope"));
    }

    #[test]
    fn test_local_config_is_not_secure() {
        let config = WebConfig::local("/tmp/uploads");
        assert!(!config.is_secure());
        assert_eq!(config.socket_addr().port(), 3000);
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let mut config = WebConfig::local("/tmp/uploads");
        config.database_url = Some(SecretString::from("postgres://u:hunter2@db/civic"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
