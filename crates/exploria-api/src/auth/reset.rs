//! Password reset tokens
//!
//! The raw token goes to the account holder exactly once; only its SHA-256
//! digest is persisted, so a leaked database row cannot be redeemed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A freshly generated reset token and the digest to store for it
pub struct ResetToken {
    pub raw: String,
    pub digest: String,
}

impl std::fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetToken")
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

/// Generate 32 random bytes, URL-safe base64 encoded
pub fn generate() -> ResetToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let digest = digest(&raw);
    ResetToken { raw, digest }
}

/// Hex SHA-256 of the raw token as presented by the client
pub fn digest(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}
