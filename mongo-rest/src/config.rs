//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `MONGO_REST_`, nested keys joined with `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/mongo-rest/config.toml
//! 4. System directory: /etc/mongo-rest/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "inventory"
//! port = 8080
//!
//! [mongo]
//! url = "mongodb://localhost:27017"
//! database = "inventory"
//!
//! [rest]
//! prefix = "/api/v1"
//! response_field = "data"
//! autoincrement = true
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Application name used for config directories
const APP_NAME: &str = "mongo-rest";

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "MONGO_REST_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// MongoDB connection configuration
    #[serde(default)]
    pub mongo: MongoConfig,

    /// REST router configuration
    #[serde(default)]
    pub rest: RestSettings,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum request body size in megabytes
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

/// MongoDB connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MongoConfig {
    /// Connection string
    #[serde(default = "default_mongo_url")]
    pub url: String,

    /// Database holding the exposed collections
    #[serde(default = "default_database")]
    pub database: String,

    /// Maximum retry attempts for establishing the connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retry attempts in seconds (doubles each attempt)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// REST router configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestSettings {
    /// Path prefix the collection routes are mounted under
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Field successful payloads are nested under; unwrapped when absent
    #[serde(default)]
    pub response_field: Option<String>,

    /// Assign sequential integer ids to documents created without `_id`
    #[serde(default)]
    pub autoincrement: bool,

    /// Collection holding the sequence counters
    #[serde(default = "default_counters_collection")]
    pub counters_collection: String,
}

impl ServiceConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeout_secs: default_timeout(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: default_mongo_url(),
            database: default_database(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            response_field: None,
            autoincrement: false,
            counters_collection: default_counters_collection(),
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    APP_NAME.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_mongo_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

fn default_prefix() -> String {
    "/api/v1".to_string()
}

fn default_counters_collection() -> String {
    "counters".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Every config file that exists is merged, lowest priority first, and
    /// environment variables (`MONGO_REST_` prefix) override all of them.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Reverse so that higher priority files override lower ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment.merge(Self::env_provider()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the search path. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env_provider())
            .extract()?;

        Ok(config)
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Find all possible config file paths
    ///
    /// Returns paths in priority order (highest first):
    /// 1. Current working directory
    /// 2. XDG config directory
    /// 3. System directory
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_NAME).join("config.toml"));
        paths
    }

    /// Socket address the server binds to
    pub fn listen_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.service.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.log_format, "json");
        assert_eq!(config.mongo.url, "mongodb://localhost:27017");
        assert_eq!(config.mongo.max_retries, 5);
        assert_eq!(config.rest.prefix, "/api/v1");
        assert_eq!(config.rest.response_field, None);
        assert!(!config.rest.autoincrement);
        assert_eq!(config.rest.counters_collection, "counters");
    }

    #[test]
    fn test_durations() {
        let service = ServiceConfig::default();
        assert_eq!(service.timeout(), Duration::from_secs(30));
        assert_eq!(service.body_limit_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_from_file() {
        figment::Jail::expect_with(|_jail| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                r#"
[service]
port = 9000

[mongo]
database = "inventory"

[rest]
prefix = ""
response_field = "data"
autoincrement = true
"#
            )
            .unwrap();

            let config = Config::load_from(file.path()).map_err(|e| e.to_string())?;
            assert_eq!(config.service.port, 9000);
            assert_eq!(config.service.log_level, "info");
            assert_eq!(config.mongo.database, "inventory");
            assert_eq!(config.mongo.url, "mongodb://localhost:27017");
            assert_eq!(config.rest.prefix, "");
            assert_eq!(config.rest.response_field.as_deref(), Some("data"));
            assert!(config.rest.autoincrement);
            assert_eq!(config.rest.counters_collection, "counters");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
[mongo]
database = "from-file"
"#,
            )?;
            jail.set_env("MONGO_REST_MONGO__DATABASE", "from-env");
            jail.set_env("MONGO_REST_REST__COUNTERS_COLLECTION", "sequences");

            let config = Config::load_from("custom.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.mongo.database, "from-env");
            assert_eq!(config.rest.counters_collection, "sequences");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config =
                Config::load_from("/nonexistent/mongo-rest.toml").map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_searches_working_directory() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[rest]\nresponse_field = \"test\"")?;
            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.rest.response_field.as_deref(), Some("test"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        figment::Jail::expect_with(|_jail| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[service]\nport = \"not a port\"").unwrap();

            let err = Config::load_from(file.path()).unwrap_err();
            assert!(matches!(err, crate::error::Error::Config(_)));
            Ok(())
        });
    }
}
