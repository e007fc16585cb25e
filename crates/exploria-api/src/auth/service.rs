//! Authentication service layer
//!
//! Signup, login, the forgot/reset password protocol and authenticated
//! password changes, plus the self-service account operations that sit on the
//! same store. Every flow that ends with a usable credential returns a freshly
//! issued session token.

use super::jwt::SessionTokens;
use super::password::PasswordError;
use super::reset;
use super::store::{AccountStore, NewAccount};
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::email::{reset_message, DeliveryError, Mailer};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use exploria_core::config::MAX_RESET_TTL_MINS;
use exploria_core::{Account, AppConfig, Role};
use exploria_store::AccountRepository;
use std::sync::Arc;
use std::time::Duration;

/// Self-service signup input; the role is always `user`
#[derive(Clone)]
pub struct SignupInput {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

/// A session token together with the account it was issued for
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub token: String,
    pub account: Account,
}

/// Authentication service
pub struct AuthService {
    store: AccountStore,
    tokens: SessionTokens,
    mailer: Arc<dyn Mailer>,
    public_url: String,
    reset_ttl_mins: u64,
    delivery_timeout: Duration,
}

impl AuthService {
    pub fn new(
        config: &AppConfig,
        repository: Arc<dyn AccountRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, PasswordError> {
        let hasher = super::password::SecretHasher::new(&config.auth)?;
        Ok(Self {
            store: AccountStore::new(repository, hasher, config.auth.min_password_len),
            tokens: SessionTokens::new(&config.auth),
            mailer,
            public_url: config.server.public_url.trim_end_matches('/').to_string(),
            reset_ttl_mins: config.auth.reset_ttl_mins.min(MAX_RESET_TTL_MINS),
            delivery_timeout: Duration::from_secs(config.email.timeout_secs),
        })
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    fn issue_for(&self, account: Account) -> Result<AuthOutcome, AppError> {
        let token = self.tokens.issue(&account.id)?;
        Ok(AuthOutcome { token, account })
    }

    /// Issue a token that the staleness rule accepts even if the clock stepped back
    fn issue_after_change(
        &self,
        account: Account,
        changed_at: DateTime<Utc>,
    ) -> Result<AuthOutcome, AppError> {
        let token = self.tokens.issue_at(&account.id, Utc::now().max(changed_at))?;
        Ok(AuthOutcome { token, account })
    }

    /// Create a `user` account and sign it in
    pub async fn signup(&self, input: SignupInput, client: &ClientInfo) -> Result<AuthOutcome, AppError> {
        let email = input.email.clone();
        let created = self
            .store
            .create(NewAccount {
                email: input.email,
                name: input.name,
                password: input.password,
                password_confirm: input.password_confirm,
                role: Role::User,
            })
            .await;

        let account = match created {
            Ok(account) => account,
            Err(e) => {
                audit_log(&AuditEvent::SignupFailure {
                    email,
                    reason: e.code().to_string(),
                    client: client.clone(),
                });
                return Err(e);
            }
        };

        audit_log(&AuditEvent::SignupSuccess {
            account_id: account.id.clone(),
            email: account.email.clone(),
            client: client.clone(),
        });
        self.issue_for(account)
    }

    /// Exchange email and password for a session token
    ///
    /// An unknown email and a wrong password fail identically, and the unknown
    /// email path still pays for one hash verification.
    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
        client: &ClientInfo,
    ) -> Result<AuthOutcome, AppError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let (Some(email), Some(password)) = (non_empty(email), non_empty(password)) else {
            return Err(AppError::MissingCredentials);
        };

        let account = self.store.find_by_email(&email).await?;
        let (account, reason) = match account {
            Some(account) => {
                if self.store.verify_secret(&account, password).await? {
                    (Some(account), None)
                } else {
                    (None, Some("wrong password"))
                }
            }
            None => {
                self.store.hasher().verify_dummy(password).await;
                (None, Some("unknown email"))
            }
        };

        match (account, reason) {
            (Some(account), _) => {
                audit_log(&AuditEvent::LoginSuccess {
                    account_id: account.id.clone(),
                    email: account.email.clone(),
                    client: client.clone(),
                });
                self.issue_for(account)
            }
            (None, reason) => {
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: reason.unwrap_or("unknown").to_string(),
                    client: client.clone(),
                });
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Start the reset protocol: store a digest and email the raw token
    ///
    /// If the email cannot be delivered within the timeout the challenge is
    /// withdrawn before `DeliveryFailed` is returned.
    pub async fn forgot_password(&self, email: &str, client: &ClientInfo) -> Result<(), AppError> {
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        let token = reset::generate();
        let expires_at = Utc::now() + chrono::Duration::minutes(self.reset_ttl_mins as i64);
        self.store
            .set_reset_challenge(&account.id, token.digest.clone(), expires_at)
            .await?;

        audit_log(&AuditEvent::ResetRequested {
            account_id: account.id.clone(),
            email: account.email.clone(),
            client: client.clone(),
        });

        let reset_url = format!(
            "{}/api/v1/users/resetPassword/{}",
            self.public_url, token.raw
        );
        let message = reset_message(&account.email, &reset_url, self.reset_ttl_mins);

        let delivery = tokio::time::timeout(self.delivery_timeout, self.mailer.send(&message))
            .await
            .unwrap_or(Err(DeliveryError::Timeout));

        if let Err(e) = delivery {
            tracing::warn!(account_id = %account.id, error = %e, "Reset email delivery failed");
            audit_log(&AuditEvent::ResetDeliveryFailed {
                account_id: account.id.clone(),
                reason: e.to_string(),
            });
            self.withdraw_challenge(&account.id, &token.digest).await?;
            return Err(AppError::DeliveryFailed);
        }

        Ok(())
    }

    /// Clear the challenge only if it is still the one this request stored
    async fn withdraw_challenge(&self, account_id: &str, digest: &str) -> Result<(), AppError> {
        let still_ours = self
            .store
            .find_by_reset_digest(digest)
            .await?
            .is_some_and(|a| a.id == account_id);
        if still_ours {
            self.store.clear_reset_challenge(account_id).await?;
        }
        Ok(())
    }

    /// Redeem a raw reset token for a new password; the token is single-use
    pub async fn reset_password(
        &self,
        raw_token: &str,
        password: String,
        password_confirm: String,
    ) -> Result<AuthOutcome, AppError> {
        let account = self
            .store
            .find_by_reset_digest(&reset::digest(raw_token))
            .await?
            .ok_or(AppError::ResetTokenInvalidOrExpired)?;

        let changed_at = self
            .store
            .update_secret(&account.id, password, &password_confirm)
            .await?;
        self.store.clear_reset_challenge(&account.id).await?;

        audit_log(&AuditEvent::PasswordChanged {
            account_id: account.id.clone(),
            method: "reset".to_string(),
        });
        self.issue_after_change(account, changed_at)
    }

    /// Change the password of a signed-in account
    pub async fn update_password(
        &self,
        account_id: &str,
        current: String,
        password: String,
        password_confirm: String,
    ) -> Result<AuthOutcome, AppError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNoLongerExists)?;

        if !self.store.verify_secret(&account, current).await? {
            return Err(AppError::CurrentSecretIncorrect);
        }

        let changed_at = self
            .store
            .update_secret(&account.id, password, &password_confirm)
            .await?;

        audit_log(&AuditEvent::PasswordChanged {
            account_id: account.id.clone(),
            method: "update".to_string(),
        });
        self.issue_after_change(account, changed_at)
    }

    /// Change name and/or email of a signed-in account
    pub async fn update_profile(
        &self,
        account_id: &str,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Account, AppError> {
        self.store.update_profile(account_id, name, email).await
    }

    /// Soft-delete a signed-in account
    pub async fn deactivate(&self, account_id: &str) -> Result<(), AppError> {
        self.store.deactivate(account_id).await?;
        audit_log(&AuditEvent::AccountDeactivated {
            account_id: account_id.to_string(),
        });
        Ok(())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        self.store.list_active().await
    }
}
