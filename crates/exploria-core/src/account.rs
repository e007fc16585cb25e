//! Account model
//!
//! The persisted identity record shared by the store and the API layer:
//! - `Role`: closed set of access levels
//! - `Account`: full record including credential material
//! - `AccountPublic`: redacted representation safe for responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role
///
/// - User: customers booking tours (default for signup)
/// - Guide / LeadGuide: staff running tours
/// - Admin: full access including account management
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    /// Every role, in ascending order of privilege
    pub const ALL: [Role; 4] = [Role::User, Role::Guide, Role::LeadGuide, Role::Admin];

    /// Convert role to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a role name is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" | "lead_guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Outstanding password reset request: digest of the raw token plus its expiry
///
/// Both halves are stored and cleared together, so the pair is modelled as one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetChallenge {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetChallenge {
    /// Whether the challenge can still be redeemed at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Persisted account record
#[derive(Clone)]
pub struct Account {
    /// Stable unique identifier (UUID v4)
    pub id: String,

    /// Normalized (trimmed, lower-cased) email address
    pub email: String,

    /// Display name
    pub name: Option<String>,

    /// Argon2id PHC string
    pub password_hash: String,

    pub role: Role,

    /// Last time the secret was rewritten; `None` until the first change
    pub password_changed_at: Option<DateTime<Utc>>,

    pub reset_challenge: Option<ResetChallenge>,

    /// Soft-delete flag
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh active account around an already hashed secret
    pub fn new(email: String, name: Option<String>, password_hash: String, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            name,
            password_hash,
            role,
            password_changed_at: None,
            reset_challenge: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether the secret was rewritten after a token issued at `issued_at_ms` (unix millis)
    ///
    /// Compared at millisecond precision, matching the token's `iat_ms` claim.
    pub fn changed_password_after(&self, issued_at_ms: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => issued_at_ms < changed_at.timestamp_millis(),
            None => false,
        }
    }

    /// Convert to the public representation (no credential material)
    pub fn to_public(&self) -> AccountPublic {
        AccountPublic {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password_changed_at", &self.password_changed_at)
            .field("reset_pending", &self.reset_challenge.is_some())
            .field("active", &self.active)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Public account representation (safe for API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountPublic {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Trim and lower-case an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> Account {
        Account::new(
            "test@example.com".to_string(),
            Some("Test User".to_string()),
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            Role::Guide,
        )
    }

    #[test]
    fn test_role_conversion() {
        assert_eq!(Role::LeadGuide.as_str(), "lead-guide");
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("lead_guide".parse::<Role>(), Ok(Role::LeadGuide));
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::LeadGuide).unwrap();
        assert_eq!(json, "\"lead-guide\"");
        let parsed: Role = serde_json::from_str("\"guide\"").unwrap();
        assert_eq!(parsed, Role::Guide);
    }

    #[test]
    fn test_new_account_defaults() {
        let account = account();
        assert!(account.active);
        assert!(account.password_changed_at.is_none());
        assert!(account.reset_challenge.is_none());
        assert!(uuid::Uuid::parse_str(&account.id).is_ok());
    }

    #[test]
    fn test_changed_password_after() {
        let mut account = account();
        let now = Utc::now();

        // Never changed
        assert!(!account.changed_password_after(now.timestamp_millis()));

        account.password_changed_at = Some(now);
        // Token issued before the change is stale
        assert!(account.changed_password_after(now.timestamp_millis() - 1000));
        // Token issued in the same millisecond or later is not
        assert!(!account.changed_password_after(now.timestamp_millis()));
        assert!(!account.changed_password_after(now.timestamp_millis() + 5000));
    }

    #[test]
    fn test_change_within_same_second_is_stale() {
        let mut account = account();
        let issued = DateTime::from_timestamp_millis(1_700_000_000_100).unwrap();
        let changed = DateTime::from_timestamp_millis(1_700_000_000_800).unwrap();
        account.password_changed_at = Some(changed);

        assert_eq!(issued.timestamp(), changed.timestamp());
        assert!(account.changed_password_after(issued.timestamp_millis()));
        assert!(!account.changed_password_after(changed.timestamp_millis()));
    }

    #[test]
    fn test_reset_challenge_liveness() {
        let now = Utc::now();
        let challenge = ResetChallenge {
            digest: "abc".to_string(),
            expires_at: now + Duration::minutes(10),
        };
        assert!(challenge.is_live(now));
        assert!(!challenge.is_live(now + Duration::minutes(10)));
    }

    #[test]
    fn test_public_and_debug_hide_hash() {
        let account = account();
        let json = serde_json::to_string(&account.to_public()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.to_lowercase().contains("password"));
        assert!(json.contains("\"role\":\"guide\""));

        let debug = format!("{account:?}");
        assert!(!debug.contains("argon2"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }
}
