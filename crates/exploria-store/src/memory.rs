//! In-memory account repository
//!
//! Every operation runs under a single lock guard, which gives the same
//! single-record atomicity the database provides.

use super::{AccountRepository, ProfileUpdate, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exploria_core::{Account, ResetChallenge};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local account storage
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record lookup including inactive accounts
    pub async fn get_raw(&self, id: &str) -> Option<Account> {
        self.accounts.read().await.get(id).cloned()
    }

    /// Number of stored records, active or not
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

fn active_mut<'a>(
    accounts: &'a mut HashMap<String, Account>,
    id: &str,
) -> Result<&'a mut Account> {
    accounts
        .get_mut(id)
        .filter(|a| a.active)
        .ok_or(StoreError::NotFound)
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(&self, account: Account) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        // Uniqueness covers soft-deleted records too
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.active && a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(id).filter(|a| a.active).cloned())
    }

    async fn update_password_hash(
        &self,
        id: &str,
        password_hash: String,
        changed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = active_mut(&mut accounts, id)?;
        account.password_hash = password_hash;
        account.password_changed_at = Some(changed_at);
        Ok(())
    }

    async fn set_reset_challenge(&self, id: &str, challenge: ResetChallenge) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        active_mut(&mut accounts, id)?.reset_challenge = Some(challenge);
        Ok(())
    }

    async fn clear_reset_challenge(&self, id: &str) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        active_mut(&mut accounts, id)?.reset_challenge = None;
        Ok(())
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| {
                a.active
                    && a.reset_challenge
                        .as_ref()
                        .is_some_and(|c| c.digest == digest && c.is_live(now))
            })
            .cloned())
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        if let Some(email) = &update.email {
            if accounts.values().any(|a| a.id != id && &a.email == email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let account = active_mut(&mut accounts, id)?;
        if let Some(name) = update.name {
            account.name = Some(name);
        }
        if let Some(email) = update.email {
            account.email = email;
        }
        Ok(account.clone())
    }

    async fn deactivate(&self, id: &str) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        active_mut(&mut accounts, id)?.active = false;
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut active: Vec<Account> = accounts.values().filter(|a| a.active).cloned().collect();
        active.sort_by_key(|a| a.created_at);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exploria_core::Role;
    use std::sync::Arc;

    fn account(email: &str) -> Account {
        Account::new(email.to_string(), None, "hash".to_string(), Role::User)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.insert(account("a@x.com")).await.unwrap();

        let by_email = repo.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");

        assert!(repo.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_writes_nothing() {
        let repo = InMemoryAccountRepository::new();
        repo.insert(account("a@x.com")).await.unwrap();

        let result = repo.insert(account("a@x.com")).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_same_email() {
        let repo = Arc::new(InMemoryAccountRepository::new());
        let tasks = (0..8).map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(account("race@x.com")).await })
        });

        let results = futures::future::join_all(tasks).await;
        let created = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        assert_eq!(created, 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_password_hash_stamps_change() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.insert(account("a@x.com")).await.unwrap();
        let at = Utc::now();

        repo.update_password_hash(&created.id, "new-hash".to_string(), at)
            .await
            .unwrap();

        let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.password_changed_at, Some(at));
    }

    #[tokio::test]
    async fn test_reset_digest_respects_expiry() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.insert(account("a@x.com")).await.unwrap();
        let now = Utc::now();

        repo.set_reset_challenge(
            &created.id,
            ResetChallenge {
                digest: "d1".to_string(),
                expires_at: now + Duration::minutes(10),
            },
        )
        .await
        .unwrap();

        assert!(repo.find_by_reset_digest("d1", now).await.unwrap().is_some());
        assert!(repo.find_by_reset_digest("other", now).await.unwrap().is_none());
        // Expired challenges are never surfaced
        assert!(repo
            .find_by_reset_digest("d1", now + Duration::minutes(11))
            .await
            .unwrap()
            .is_none());

        repo.clear_reset_challenge(&created.id).await.unwrap();
        assert!(repo.find_by_reset_digest("d1", now).await.unwrap().is_none());
        let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert!(stored.reset_challenge.is_none());
    }

    #[tokio::test]
    async fn test_last_reset_challenge_wins() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.insert(account("a@x.com")).await.unwrap();
        let now = Utc::now();

        for digest in ["first", "second"] {
            repo.set_reset_challenge(
                &created.id,
                ResetChallenge {
                    digest: digest.to_string(),
                    expires_at: now + Duration::minutes(10),
                },
            )
            .await
            .unwrap();
        }

        assert!(repo.find_by_reset_digest("first", now).await.unwrap().is_none());
        assert!(repo.find_by_reset_digest("second", now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deactivated_accounts_are_hidden() {
        let repo = InMemoryAccountRepository::new();
        let created = repo.insert(account("a@x.com")).await.unwrap();
        repo.insert(account("b@x.com")).await.unwrap();

        repo.deactivate(&created.id).await.unwrap();

        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
        assert!(repo.find_by_email("a@x.com").await.unwrap().is_none());
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
        // Record retained
        assert!(!repo.get_raw(&created.id).await.unwrap().active);
        // Email stays reserved
        assert!(matches!(
            repo.insert(account("a@x.com")).await,
            Err(StoreError::DuplicateEmail)
        ));
        assert!(matches!(
            repo.deactivate(&created.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = InMemoryAccountRepository::new();
        let a = repo.insert(account("a@x.com")).await.unwrap();
        repo.insert(account("b@x.com")).await.unwrap();

        let updated = repo
            .update_profile(
                &a.id,
                ProfileUpdate {
                    name: Some("Alice".to_string()),
                    email: Some("alice@x.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Alice"));
        assert_eq!(updated.email, "alice@x.com");

        let clash = repo
            .update_profile(
                &a.id,
                ProfileUpdate {
                    name: None,
                    email: Some("b@x.com".to_string()),
                },
            )
            .await;
        assert!(matches!(clash, Err(StoreError::DuplicateEmail)));
    }
}
