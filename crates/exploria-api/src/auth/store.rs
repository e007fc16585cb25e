//! Account store
//!
//! The only writer of credential fields. Wraps an `AccountRepository` and
//! enforces the rules around it: email normalization, minimum secret length,
//! confirmation matching, hashing before persistence and stamping
//! `password_changed_at` whenever the secret is rewritten.

use super::password::SecretHasher;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use exploria_core::{normalize_email, Account, ResetChallenge, Role};
use exploria_store::{AccountRepository, ProfileUpdate};
use std::sync::Arc;
use validator::ValidateEmail;

/// Input for account creation
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub password_confirm: String,
    pub role: Role,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AccountStore {
    repo: Arc<dyn AccountRepository>,
    hasher: SecretHasher,
    min_password_len: usize,
}

impl AccountStore {
    pub fn new(repo: Arc<dyn AccountRepository>, hasher: SecretHasher, min_password_len: usize) -> Self {
        Self {
            repo,
            hasher,
            min_password_len,
        }
    }

    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    fn check_secret(&self, password: &str, confirm: &str) -> Result<(), AppError> {
        if password.chars().count() < self.min_password_len {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }
        if password != confirm {
            return Err(AppError::SecretConfirmationMismatch);
        }
        Ok(())
    }

    /// Create an account; nothing is written on any failure
    pub async fn create(&self, new: NewAccount) -> Result<Account, AppError> {
        let email = normalize_email(&new.email);
        if !email.validate_email() {
            return Err(AppError::Validation("Please provide a valid email".to_string()));
        }
        self.check_secret(&new.password, &new.password_confirm)?;

        let password_hash = self.hasher.hash_blocking(new.password).await?;
        let name = new.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let account = Account::new(email, name, password_hash, new.role);

        Ok(self.repo.insert(account).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(self.repo.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    /// Re-hash and persist a new secret, returning the change instant
    pub async fn update_secret(
        &self,
        id: &str,
        password: String,
        password_confirm: &str,
    ) -> Result<DateTime<Utc>, AppError> {
        self.check_secret(&password, password_confirm)?;

        let password_hash = self.hasher.hash_blocking(password).await?;
        let changed_at = Utc::now();
        self.repo
            .update_password_hash(id, password_hash, changed_at)
            .await?;
        Ok(changed_at)
    }

    /// Check a plaintext secret against the account's stored hash
    pub async fn verify_secret(&self, account: &Account, password: String) -> Result<bool, AppError> {
        Ok(self
            .hasher
            .verify_blocking(password, account.password_hash.clone())
            .await?)
    }

    pub async fn set_reset_challenge(
        &self,
        id: &str,
        digest: String,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        Ok(self
            .repo
            .set_reset_challenge(id, ResetChallenge { digest, expires_at })
            .await?)
    }

    pub async fn clear_reset_challenge(&self, id: &str) -> Result<(), AppError> {
        Ok(self.repo.clear_reset_challenge(id).await?)
    }

    /// Only accounts whose challenge has not yet expired are returned
    pub async fn find_by_reset_digest(&self, digest: &str) -> Result<Option<Account>, AppError> {
        Ok(self.repo.find_by_reset_digest(digest, Utc::now()).await?)
    }

    pub async fn update_profile(
        &self,
        id: &str,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Account, AppError> {
        let email = match email {
            Some(email) => {
                let email = normalize_email(&email);
                if !email.validate_email() {
                    return Err(AppError::Validation("Please provide a valid email".to_string()));
                }
                Some(email)
            }
            None => None,
        };
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        Ok(self
            .repo
            .update_profile(id, ProfileUpdate { name, email })
            .await?)
    }

    pub async fn deactivate(&self, id: &str) -> Result<(), AppError> {
        Ok(self.repo.deactivate(id).await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_active().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exploria_core::AuthConfig;
    use exploria_store::InMemoryAccountRepository;

    fn store() -> (AccountStore, Arc<InMemoryAccountRepository>) {
        let repo = Arc::new(InMemoryAccountRepository::new());
        let hasher = SecretHasher::new(&AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            ..AuthConfig::default()
        })
        .unwrap();
        (AccountStore::new(repo.clone(), hasher, 8), repo)
    }

    fn new_account(email: &str, password: &str, confirm: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            name: Some("  Test  ".to_string()),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_create_hashes_and_normalizes() {
        let (store, _) = store();
        let account = store
            .create(new_account(" A@X.com ", "pass1234", "pass1234"))
            .await
            .unwrap();

        assert_eq!(account.email, "a@x.com");
        assert_eq!(account.name.as_deref(), Some("Test"));
        assert_ne!(account.password_hash, "pass1234");
        assert!(account.password_changed_at.is_none());
        assert!(store
            .verify_secret(&account, "pass1234".to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_create_rejections_write_nothing() {
        let (store, repo) = store();

        let mismatch = store
            .create(new_account("a@x.com", "pass1234", "pass12345"))
            .await;
        assert!(matches!(mismatch, Err(AppError::SecretConfirmationMismatch)));

        let short = store.create(new_account("a@x.com", "short", "short")).await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let bad_email = store
            .create(new_account("not-an-email", "pass1234", "pass1234"))
            .await;
        assert!(matches!(bad_email, Err(AppError::Validation(_))));

        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_email_case_insensitive() {
        let (store, repo) = store();
        store
            .create(new_account("a@x.com", "pass1234", "pass1234"))
            .await
            .unwrap();

        let dup = store
            .create(new_account("A@X.COM", "pass1234", "pass1234"))
            .await;
        assert!(matches!(dup, Err(AppError::DuplicateEmail)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_secret_stamps_change() {
        let (store, _) = store();
        let account = store
            .create(new_account("a@x.com", "pass1234", "pass1234"))
            .await
            .unwrap();

        let changed_at = store
            .update_secret(&account.id, "newpass99".to_string(), "newpass99")
            .await
            .unwrap();

        let stored = store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.password_changed_at, Some(changed_at));
        assert!(store
            .verify_secret(&stored, "newpass99".to_string())
            .await
            .unwrap());
        assert!(!store
            .verify_secret(&stored, "pass1234".to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_validates_email() {
        let (store, _) = store();
        let account = store
            .create(new_account("a@x.com", "pass1234", "pass1234"))
            .await
            .unwrap();

        let result = store
            .update_profile(&account.id, None, Some("bad".to_string()))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let updated = store
            .update_profile(&account.id, None, Some(" New@X.com".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.email, "new@x.com");
    }
}
