//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (TABLEGATE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [database]
//! host = "clickhouse.internal"
//! port = 8123
//! user = "gateway"
//! database = "analytics"
//!
//! [schema]
//! cache_ttl_secs = 30
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! TABLEGATE_DATABASE__HOST=10.0.0.5
//! TABLEGATE_HTTP__AUTH__ENABLED=true
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// ClickHouse connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `http` or `https`
    #[serde(default = "default_url_scheme")]
    pub url_scheme: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    /// HTTP interface port
    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub database: String,

    /// Total time allowed for the startup connection attempts
    #[serde(default = "default_connect_retry_budget_secs")]
    pub connect_retry_budget_secs: u64,

    /// First backoff delay; doubles per failed attempt
    #[serde(default = "default_connect_initial_backoff_ms")]
    pub connect_initial_backoff_ms: u64,

    /// Per-request timeout in milliseconds. 0 = no timeout.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Root URL of the HTTP interface, with trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/", self.url_scheme, self.host, self.port)
    }
}

/// Schema metadata settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// How long a fetched schema may be reused. 0 = fetch on every request.
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// HTTP server bind address
    #[serde(default = "default_http_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Allowed CORS origins (empty = same-origin only, unless cors_allow_all is true)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Explicitly allow all CORS origins (dev mode opt-in)
    #[serde(default)]
    pub cors_allow_all: bool,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Mount `POST /sql` even when authentication is disabled
    #[serde(default)]
    pub enable_raw_sql: bool,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// API key authentication for the HTTP API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Require `Authorization: Bearer <key>` on data endpoints
    #[serde(default)]
    pub enabled: bool,

    /// Plain API keys (hashed at startup)
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Pre-hashed API keys (lowercase SHA-256 hex)
    #[serde(default)]
    pub api_key_hashes: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Append logs to this file instead of stdout
    #[serde(default)]
    pub file: Option<String>,
}

/// Parquet loader object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// S3-compatible endpoint (MinIO etc.)
    #[serde(default = "default_loader_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default = "default_loader_region")]
    pub region: String,

    /// Permit plain-http endpoints
    #[serde(default = "default_true")]
    pub allow_http: bool,

    /// Rows per insert batch
    #[serde(default = "default_loader_batch_size")]
    pub batch_size: usize,
}

// Default value functions
fn default_url_scheme() -> String {
    "http".to_string()
}
fn default_db_host() -> String {
    "localhost".to_string()
}
fn default_db_port() -> u16 {
    8123
}
fn default_db_user() -> String {
    "default".to_string()
}
fn default_db_name() -> String {
    "default".to_string()
}
fn default_connect_retry_budget_secs() -> u64 {
    20
}
fn default_connect_initial_backoff_ms() -> u64 {
    100
}
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_max_body_bytes() -> usize {
    1_048_576 // 1 MB
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_loader_endpoint() -> String {
    "http://localhost:9002".to_string()
}
fn default_loader_region() -> String {
    "us-east-1".to_string()
}
fn default_loader_batch_size() -> usize {
    100_000
}
fn default_true() -> bool {
    true
}

const ENV_PREFIX: &str = "TABLEGATE_";

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. built-in defaults
    /// 2. config.toml (base configuration)
    /// 3. config.local.toml (local overrides, git-ignored)
    /// 4. Environment variables (TABLEGATE_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Parse configuration from a TOML string (no environment overlay)
    pub fn from_toml_str(toml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url_scheme: default_url_scheme(),
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            database: default_db_name(),
            connect_retry_budget_secs: default_connect_retry_budget_secs(),
            connect_initial_backoff_ms: default_connect_initial_backoff_ms(),
            request_timeout_ms: 0,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            host: default_http_host(),
            port: default_http_port(),
            cors_origins: Vec::new(),
            cors_allow_all: false,
            max_body_bytes: default_max_body_bytes(),
            enable_raw_sql: false,
            auth: AuthConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            endpoint: default_loader_endpoint(),
            access_key: None,
            secret_key: None,
            region: default_loader_region(),
            allow_http: true,
            batch_size: default_loader_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_config() {
        let config = Config::default();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 8123);
        assert_eq!(config.database.user, "default");
        assert_eq!(config.database.database, "default");
        assert_eq!(config.database.connect_retry_budget_secs, 20);
        assert_eq!(config.database.request_timeout_ms, 0);
    }

    #[test]
    fn test_base_url() {
        let mut db = DatabaseConfig::default();
        assert_eq!(db.base_url(), "http://localhost:8123/");
        db.url_scheme = "https".into();
        db.host = "ch.example".into();
        db.port = 8443;
        assert_eq!(db.base_url(), "https://ch.example:8443/");
    }

    #[test]
    fn test_default_schema_cache_disabled() {
        let config = Config::default();
        assert_eq!(config.schema.cache_ttl_secs, 0);
    }

    #[test]
    fn test_default_http_config() {
        let config = Config::default();
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 8000);
        assert!(config.http.cors_origins.is_empty());
        assert!(!config.http.enable_raw_sql);
        assert!(!config.http.auth.enabled);
        assert_eq!(config.http.max_body_bytes, 1_048_576);
    }

    #[test]
    fn test_default_logging_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_default_loader_config() {
        let loader = LoaderConfig::default();
        assert_eq!(loader.endpoint, "http://localhost:9002");
        assert_eq!(loader.batch_size, 100_000);
        assert!(loader.allow_http);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[http.auth]"));
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.database.port, 8123);
        assert_eq!(back.http.port, 8000);
        assert_eq!(back.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [database]
            host = "ch.internal"

            [schema]
            cache_ttl_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.database.host, "ch.internal");
        assert_eq!(config.database.port, 8123);
        assert_eq!(config.schema.cache_ttl_secs, 15);
        assert_eq!(config.http.port, 8000);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.database.database, "default");
        assert_eq!(config.loader.region, "us-east-1");
    }
}
