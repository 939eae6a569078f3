//! Password hashing and verification.
//!
//! Passwords are hashed with Argon2id using the crate's default cost parameters and a
//! fresh random salt per call. The result is a PHC string that embeds the algorithm,
//! the parameters and the salt, so it verifies on its own.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct CredentialError(argon2::password_hash::Error);

/// A stored password hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wraps a hash loaded from storage. The value is not checked here;
    /// a malformed digest simply never verifies.
    #[must_use]
    pub fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}

pub fn hash_password(password: &str) -> Result<PasswordDigest, CredentialError> {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(CredentialError)?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(CredentialError)?;

    Ok(PasswordDigest(hash.to_string()))
}

/// Returns `false` for a missing or unparsable digest as well as for a wrong password.
#[must_use]
pub fn verify_password(password: &str, digest: Option<&PasswordDigest>) -> bool {
    let Some(digest) = digest else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(digest.as_str()) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
