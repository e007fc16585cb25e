//! SurrealDB implementation of the account repository
//!
//! Accounts live in the `account` table keyed by their UUID. Email uniqueness
//! is enforced by a unique index, so a duplicate insert is rejected by the
//! database in the same statement that would have written it.

use super::{AccountRepository, ProfileUpdate, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exploria_core::{Account, DatabaseConfig, ResetChallenge, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

const TABLE: &str = "account";

/// SurrealDB account repository
pub struct SurrealAccountRepository {
    client: Surreal<Client>,
}

impl SurrealAccountRepository {
    /// Create a new SurrealDB connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        // Remove ws:// or wss:// prefix if present (surrealdb crate adds it automatically)
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| StoreError::Database(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| StoreError::Database(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| StoreError::Database(format!("SurrealDB namespace error: {e}")))?;

        tracing::info!(
            url = %config.surrealdb_url,
            namespace = %config.surrealdb_namespace,
            database = %config.surrealdb_database,
            "Connected to SurrealDB"
        );

        Ok(Self { client })
    }

    /// Initialize schema (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .query(
                r#"
                DEFINE TABLE IF NOT EXISTS account SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS account_email ON account FIELDS email UNIQUE;
                DEFINE INDEX IF NOT EXISTS account_reset_digest ON account FIELDS reset_digest;
            "#,
            )
            .await
            .map_err(|e| StoreError::Database(format!("Schema init failed: {e}")))?
            .check()
            .map_err(|e| StoreError::Database(format!("Schema init failed: {e}")))?;

        Ok(())
    }

    /// Run an `UPDATE ... RETURN AFTER` against one active record
    async fn update_one(
        &self,
        query: &str,
        id: &str,
        bindings: Vec<(&'static str, Value)>,
    ) -> Result<Account> {
        let mut request = self.client.query(query).bind(("id", id.to_string()));
        for binding in bindings {
            request = request.bind(binding);
        }
        let mut response = request.await.map_err(map_write_error)?;

        let updated: Vec<AccountRecord> = response.take(0).map_err(map_write_error)?;
        updated
            .into_iter()
            .next()
            .map(Account::from)
            .ok_or(StoreError::NotFound)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Database(e.to_string()))
}

/// Unique-index violations come back as query errors; translate those
fn map_write_error(e: surrealdb::Error) -> StoreError {
    let message = e.to_string();
    if message.contains("account_email") && message.contains("already contains") {
        StoreError::DuplicateEmail
    } else {
        StoreError::Database(message)
    }
}

/// Account document as stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    account_id: String,
    email: String,
    name: Option<String>,
    password_hash: String,
    role: Role,
    password_changed_at: Option<DateTime<Utc>>,
    reset_digest: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<Account> for AccountRecord {
    fn from(account: Account) -> Self {
        let (reset_digest, reset_expires_at) = match account.reset_challenge {
            Some(c) => (Some(c.digest), Some(c.expires_at)),
            None => (None, None),
        };
        Self {
            account_id: account.id,
            email: account.email,
            name: account.name,
            password_hash: account.password_hash,
            role: account.role,
            password_changed_at: account.password_changed_at,
            reset_digest,
            reset_expires_at,
            active: account.active,
            created_at: account.created_at,
        }
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        // A half-populated pair is treated as no challenge at all
        let reset_challenge = match (record.reset_digest, record.reset_expires_at) {
            (Some(digest), Some(expires_at)) => Some(ResetChallenge { digest, expires_at }),
            _ => None,
        };
        Self {
            id: record.account_id,
            email: record.email,
            name: record.name,
            password_hash: record.password_hash,
            role: record.role,
            password_changed_at: record.password_changed_at,
            reset_challenge,
            active: record.active,
            created_at: record.created_at,
        }
    }
}

#[async_trait]
impl AccountRepository for SurrealAccountRepository {
    async fn insert(&self, account: Account) -> Result<Account> {
        let id = account.id.clone();
        let created: Option<AccountRecord> = self
            .client
            .create((TABLE, id))
            .content(AccountRecord::from(account))
            .await
            .map_err(map_write_error)?;

        created
            .map(Account::from)
            .ok_or_else(|| StoreError::Database("Failed to create account".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let records: Vec<AccountRecord> = self
            .client
            .query("SELECT * FROM account WHERE email = $email AND active = true LIMIT 1")
            .bind(("email", email.to_string()))
            .await
            .map_err(|e| StoreError::Database(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::Database(format!("Result extraction failed: {e}")))?;

        Ok(records.into_iter().next().map(Account::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let record: Option<AccountRecord> = self
            .client
            .select((TABLE, id.to_string()))
            .await
            .map_err(|e| StoreError::Database(format!("Failed to get account: {e}")))?;

        Ok(record.filter(|r| r.active).map(Account::from))
    }

    async fn update_password_hash(
        &self,
        id: &str,
        password_hash: String,
        changed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update_one(
            "UPDATE type::thing('account', $id) SET password_hash = $hash, \
             password_changed_at = $changed_at WHERE active = true RETURN AFTER",
            id,
            vec![
                ("hash", Value::String(password_hash)),
                ("changed_at", to_value(changed_at)?),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn set_reset_challenge(&self, id: &str, challenge: ResetChallenge) -> Result<()> {
        self.update_one(
            "UPDATE type::thing('account', $id) SET reset_digest = $digest, \
             reset_expires_at = $expires_at WHERE active = true RETURN AFTER",
            id,
            vec![
                ("digest", Value::String(challenge.digest)),
                ("expires_at", to_value(challenge.expires_at)?),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn clear_reset_challenge(&self, id: &str) -> Result<()> {
        self.update_one(
            "UPDATE type::thing('account', $id) SET reset_digest = NONE, \
             reset_expires_at = NONE WHERE active = true RETURN AFTER",
            id,
            Vec::new(),
        )
        .await
        .map(|_| ())
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let records: Vec<AccountRecord> = self
            .client
            .query("SELECT * FROM account WHERE reset_digest = $digest AND active = true")
            .bind(("digest", digest.to_string()))
            .await
            .map_err(|e| StoreError::Database(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::Database(format!("Result extraction failed: {e}")))?;

        // Expiry is compared here so lexical datetime storage never matters
        Ok(records.into_iter().map(Account::from).find(|a| {
            a.reset_challenge
                .as_ref()
                .is_some_and(|c| c.is_live(now))
        }))
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Account> {
        let mut assignments = Vec::new();
        if update.name.is_some() {
            assignments.push("name = $name");
        }
        if update.email.is_some() {
            assignments.push("email = $email");
        }
        if assignments.is_empty() {
            return self.find_by_id(id).await?.ok_or(StoreError::NotFound);
        }

        let query = format!(
            "UPDATE type::thing('account', $id) SET {} WHERE active = true RETURN AFTER",
            assignments.join(", ")
        );
        let bindings = vec![("name", to_value(update.name)?), ("email", to_value(update.email)?)];
        self.update_one(&query, id, bindings).await
    }

    async fn deactivate(&self, id: &str) -> Result<()> {
        self.update_one(
            "UPDATE type::thing('account', $id) SET active = false WHERE active = true RETURN AFTER",
            id,
            Vec::new(),
        )
        .await
        .map(|_| ())
    }

    async fn list_active(&self) -> Result<Vec<Account>> {
        let records: Vec<AccountRecord> = self
            .client
            .query("SELECT * FROM account WHERE active = true")
            .await
            .map_err(|e| StoreError::Database(format!("Query failed: {e}")))?
            .take(0)
            .map_err(|e| StoreError::Database(format!("Result extraction failed: {e}")))?;

        let mut accounts: Vec<Account> = records.into_iter().map(Account::from).collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }
}
