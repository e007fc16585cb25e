//! Exploria Core - Account model and configuration
//!
//! This crate defines the types shared by the store, the API server and the CLI:
//! - Account records, roles and the redacted public view
//! - Configuration management

pub mod account;
pub mod config;

pub use account::{normalize_email, Account, AccountPublic, ResetChallenge, Role, UnknownRole};
pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, EmailConfig, EmailProvider,
    LoggingConfig, ServerConfig, StoreBackend,
};
