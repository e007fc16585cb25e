//! Exploria Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Signing key used when `JWT_SECRET` is not set. Only suitable for development.
pub const DEVELOPMENT_JWT_SECRET: &str = "development-secret-key-change-in-production";

/// Upper bound for `auth.token_ttl_days` (ten years)
pub const MAX_TOKEN_TTL_DAYS: u64 = 3650;

/// Upper bound for `auth.reset_ttl_mins` (one day)
pub const MAX_RESET_TTL_MINS: u64 = 1440;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Account storage
    pub database: DatabaseConfig,

    /// Session tokens, reset tokens and password hashing
    pub auth: AuthConfig,

    /// Outbound email delivery
    pub email: EmailConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = parse_var("API_PORT", port)?;
        }
        if let Ok(url) = std::env::var("PUBLIC_URL") {
            config.server.public_url = url.trim_end_matches('/').to_string();
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Storage
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            config.database.backend = backend.parse()?;
        }
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            config.database.surrealdb_url = url;
        }
        if let Ok(user) = std::env::var("SURREALDB_USER") {
            config.database.surrealdb_user = user;
        }
        if let Ok(pass) = std::env::var("SURREALDB_PASS") {
            config.database.surrealdb_pass = pass;
        }
        if let Ok(ns) = std::env::var("SURREALDB_NAMESPACE") {
            config.database.surrealdb_namespace = ns;
        }
        if let Ok(db) = std::env::var("SURREALDB_DATABASE") {
            config.database.surrealdb_database = db;
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.auth.jwt_issuer = issuer;
        }
        if let Ok(days) = std::env::var("JWT_EXPIRES_IN_DAYS") {
            config.auth.token_ttl_days = parse_var("JWT_EXPIRES_IN_DAYS", days)?;
        }
        if let Ok(mins) = std::env::var("RESET_TOKEN_TTL_MINS") {
            config.auth.reset_ttl_mins = parse_var("RESET_TOKEN_TTL_MINS", mins)?;
        }

        // Email
        if let Ok(provider) = std::env::var("EMAIL_PROVIDER") {
            config.email.provider = provider.parse()?;
        }
        if let Ok(from) = std::env::var("EMAIL_FROM") {
            config.email.from = from;
        }
        if let Ok(url) = std::env::var("EMAIL_API_URL") {
            config.email.api_url = Some(url);
        }
        if let Ok(key) = std::env::var("EMAIL_API_KEY") {
            config.email.api_key = Some(key);
        }
        if let Ok(secs) = std::env::var("EMAIL_TIMEOUT_SECS") {
            config.email.timeout_secs = parse_var("EMAIL_TIMEOUT_SECS", secs)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = matches!(json.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence for secrets)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.server.host != ServerConfig::default().host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != ServerConfig::default().port {
            self.server.port = env_config.server.port;
        }

        // Always use env for sensitive values
        if std::env::var("JWT_SECRET").is_ok() {
            self.auth.jwt_secret = env_config.auth.jwt_secret;
        }
        if env_config.database.surrealdb_pass != DatabaseConfig::default().surrealdb_pass {
            self.database.surrealdb_pass = env_config.database.surrealdb_pass;
        }
        if env_config.email.api_key.is_some() {
            self.email.api_key = env_config.email.api_key;
        }

        Ok(self)
    }

    /// Check settings that would make the service unsafe or unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.auth.token_ttl_days) {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRES_IN_DAYS".to_string(),
                value: self.auth.token_ttl_days.to_string(),
            });
        }
        if !(1..=MAX_RESET_TTL_MINS).contains(&self.auth.reset_ttl_mins) {
            return Err(ConfigError::InvalidValue {
                key: "RESET_TOKEN_TTL_MINS".to_string(),
                value: self.auth.reset_ttl_mins.to_string(),
            });
        }
        if self.email.provider == EmailProvider::Http && self.email.api_url.is_none() {
            return Err(ConfigError::MissingRequired("EMAIL_API_URL".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Externally reachable base URL, used to build password reset links
    pub public_url: String,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            // Empty by default for security - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Which account repository to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    SurrealDb,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "surrealdb" | "surreal" => Ok(Self::SurrealDb),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Repository backend
    pub backend: StoreBackend,

    /// SurrealDB WebSocket URL
    pub surrealdb_url: String,

    /// SurrealDB username
    pub surrealdb_user: String,

    /// SurrealDB password
    pub surrealdb_pass: String,

    /// SurrealDB namespace
    pub surrealdb_namespace: String,

    /// SurrealDB database name
    pub surrealdb_database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::SurrealDb,
            surrealdb_url: "ws://localhost:8000".to_string(),
            surrealdb_user: "root".to_string(),
            surrealdb_pass: "root".to_string(),
            surrealdb_namespace: "exploria".to_string(),
            surrealdb_database: "accounts".to_string(),
        }
    }
}

/// Credential and session settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for session tokens; rotating it invalidates every issued token
    pub jwt_secret: String,

    /// Issuer claim written into and required from session tokens
    pub jwt_issuer: String,

    /// Session token validity window in days
    pub token_ttl_days: u64,

    /// Password reset challenge validity in minutes
    pub reset_ttl_mins: u64,

    /// Minimum accepted password length
    pub min_password_len: usize,

    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,

    /// Argon2 iterations
    pub argon2_iterations: u32,

    /// Argon2 lanes
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_issuer: "exploria".to_string(),
            token_ttl_days: 90,
            reset_ttl_mins: 10,
            min_password_len: 8,
            argon2_memory_kib: 19456, // 19 MiB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("token_ttl_days", &self.token_ttl_days)
            .field("reset_ttl_mins", &self.reset_ttl_mins)
            .field("min_password_len", &self.min_password_len)
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .finish()
    }
}

/// Supported delivery providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Write messages to the log instead of sending them
    Log,
    /// POST messages to an HTTP mail API
    Http,
}

impl std::str::FromStr for EmailProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "EMAIL_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Outbound email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Delivery provider
    pub provider: EmailProvider,

    /// Sender address
    pub from: String,

    /// Mail API endpoint (http provider only)
    pub api_url: Option<String>,

    /// Mail API bearer key (http provider only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Upper bound for a single delivery attempt
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Log,
            from: "Exploria <no-reply@exploria.dev>".to_string(),
            api_url: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
