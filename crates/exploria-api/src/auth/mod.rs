//! Credentials, sessions and authorization
//!
//! - `password`: Argon2id secret hashing
//! - `jwt`: session token issuance and verification
//! - `reset`: single-use password reset tokens
//! - `store`: the account store enforcing credential rules
//! - `service`: signup, login and password lifecycle flows
//! - `middleware`: the request authorization chain and role gates

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod service;
pub mod store;

pub use jwt::{Claims, JwtError, SessionTokens, VerifiedToken};
pub use middleware::{authorize, protect, restrict_to, CurrentAccount};
pub use password::{PasswordError, SecretHasher};
pub use service::{AuthOutcome, AuthService, SignupInput};
pub use store::{AccountStore, NewAccount};
