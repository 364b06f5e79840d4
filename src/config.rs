//! Configuration management for the file server
//!
//! Settings are loaded once at startup from built-in defaults, an optional
//! `config.toml` and `PI_FILE_SERVER_*` environment variables, in that order.
//! Changing any of them requires a restart.

use config::{Config, Environment, File};
use log::warn;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ServerError;

const ENV_PREFIX: &str = "PI_FILE_SERVER";

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Directory exposed to clients
    /// Environment: PI_FILE_SERVER_BASE_DIR
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Environment: PI_FILE_SERVER_HOST
    #[serde(default = "default_host")]
    pub host: String,

    /// Environment: PI_FILE_SERVER_PORT
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body in MB
    #[serde(default = "default_max_content_length_mb")]
    pub max_content_length_mb: u64,

    /// PEM certificate chain; HTTPS is enabled when set together with the key
    #[serde(default)]
    pub ssl_cert: Option<String>,

    #[serde(default)]
    pub ssl_key: Option<String>,

    /// Public hostname, only used in the startup log
    #[serde(default)]
    pub domain: Option<String>,

    /// Seconds a served bulk-download archive is kept before removal
    #[serde(default = "default_archive_cleanup_delay_secs")]
    pub archive_cleanup_delay_secs: u64,
}

fn default_base_dir() -> String {
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_content_length_mb() -> u64 {
    5 * 1024
}

fn default_archive_cleanup_delay_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            host: default_host(),
            port: default_port(),
            max_content_length_mb: default_max_content_length_mb(),
            ssl_cert: None,
            ssl_key: None,
            domain: None,
            archive_cleanup_delay_secs: default_archive_cleanup_delay_secs(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from ./config.toml (if present) with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Self::finish(settings)
    }

    /// Load configuration from an explicit file, still honouring the environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self, config::ConfigError> {
        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.base_dir.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "base_dir cannot be empty".into(),
            ));
        }

        if self.max_content_length_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_content_length_mb must be greater than 0".into(),
            ));
        }

        match (self.cert_path(), self.key_path()) {
            (Some(_), None) => Err(config::ConfigError::Message(
                "ssl_cert is set but ssl_key is missing".into(),
            )),
            (None, Some(_)) => Err(config::ConfigError::Message(
                "ssl_key is set but ssl_cert is missing".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Resolve host and port into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ServerError::InvalidAddress(address))
    }

    /// Get base directory as PathBuf
    pub fn base_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.base_dir)
    }

    /// Get maximum request body size in bytes
    pub fn max_content_length_bytes(&self) -> u64 {
        self.max_content_length_mb.saturating_mul(1024 * 1024)
    }

    pub fn archive_cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.archive_cleanup_delay_secs)
    }

    /// Certificate and key paths when HTTPS can actually be served.
    ///
    /// Returns `None` when TLS is not configured or either file is missing.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        let (cert, key) = (self.cert_path()?, self.key_path()?);
        if !cert.is_file() || !key.is_file() {
            warn!(
                "TLS certificate or key not found ({}, {}), falling back to HTTP",
                cert.display(),
                key.display()
            );
            return None;
        }
        Some((cert, key))
    }

    fn cert_path(&self) -> Option<PathBuf> {
        non_empty(&self.ssl_cert)
    }

    fn key_path(&self) -> Option<PathBuf> {
        non_empty(&self.ssl_key)
    }
}

fn non_empty(value: &Option<String>) -> Option<PathBuf> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_content_length_bytes(), 5 * 1024 * 1024 * 1024);
        assert_eq!(config.archive_cleanup_delay(), Duration::from_secs(60));
        assert!(config.tls_paths().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_upload_limit_saturates() {
        let config = ServerConfig {
            max_content_length_mb: u64::MAX / 2,
            ..ServerConfig::default()
        };
        assert_eq!(config.max_content_length_bytes(), u64::MAX);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "base_dir = \"/srv/files\"\nport = 9000\nmax_content_length_mb = 10\n",
        );

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.base_dir, "/srv/files");
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_content_length_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "base_dir = \"/srv\"\nport = 0\n");
        assert!(ServerConfig::load_from(&path).is_err());

        let path = write_config(&dir, "base_dir = \"  \"\n");
        assert!(ServerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_tls_requires_both_files() {
        let config = ServerConfig {
            ssl_cert: Some("/etc/cert.pem".into()),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            ssl_cert: Some("".into()),
            ssl_key: Some("".into()),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.tls_paths().is_none());
    }

    #[test]
    fn test_tls_paths_need_existing_files() {
        let dir = TempDir::new().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "cert").unwrap();

        let mut config = ServerConfig {
            ssl_cert: Some(cert.to_string_lossy().to_string()),
            ssl_key: Some(key.to_string_lossy().to_string()),
            ..ServerConfig::default()
        };
        assert!(config.tls_paths().is_none());

        std::fs::write(&key, "key").unwrap();
        assert_eq!(config.tls_paths(), Some((cert.clone(), key.clone())));

        config.ssl_key = None;
        assert!(config.tls_paths().is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8123,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 8123);

        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
