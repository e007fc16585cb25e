//! Exploria Store - Account persistence
//!
//! Provides the `AccountRepository` abstraction over the document database
//! (SurrealDB) plus an in-memory implementation for tests and local runs.
//!
//! Repositories persist already-hashed credentials; hashing and the
//! confirmation rules live with the caller. Every mutation is a single-record
//! write, and inactive (soft-deleted) accounts are invisible to every lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exploria_core::{Account, DatabaseConfig, ResetChallenge, StoreBackend};
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod surrealdb_store;

pub use memory::InMemoryAccountRepository;
pub use surrealdb_store::SurrealAccountRepository;

/// Repository errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Account not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Profile fields an account holder may change themselves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// Already normalized
    pub email: Option<String>,
}

/// Persistence operations for account records
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account; fails with `DuplicateEmail` without writing anything
    async fn insert(&self, account: Account) -> Result<Account>;

    /// Find an active account by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Find an active account by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;

    /// Replace the stored hash and stamp the change time
    async fn update_password_hash(
        &self,
        id: &str,
        password_hash: String,
        changed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Store a reset challenge, replacing any previous one
    async fn set_reset_challenge(&self, id: &str, challenge: ResetChallenge) -> Result<()>;

    /// Remove digest and expiry together
    async fn clear_reset_challenge(&self, id: &str) -> Result<()>;

    /// Find the active account holding `digest` whose challenge is still live at `now`
    async fn find_by_reset_digest(&self, digest: &str, now: DateTime<Utc>)
        -> Result<Option<Account>>;

    /// Apply a profile update and return the updated record
    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Account>;

    /// Soft-delete: the record is retained but excluded from lookups
    async fn deactivate(&self, id: &str) -> Result<()>;

    /// All active accounts, oldest first
    async fn list_active(&self) -> Result<Vec<Account>>;
}

/// Open the repository selected by `config.backend`
///
/// SurrealDB connections have their schema initialized before being returned.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn AccountRepository>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory account store; accounts are lost on restart");
            Ok(Arc::new(InMemoryAccountRepository::new()))
        }
        StoreBackend::SurrealDb => {
            let repo = SurrealAccountRepository::new(config).await?;
            repo.init_schema().await?;
            Ok(Arc::new(repo))
        }
    }
}
