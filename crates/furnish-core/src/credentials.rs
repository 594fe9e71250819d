//! # Credentials
//!
//! Password digests for catalog users.
//!
//! A digest is a BLAKE3 key derivation over the password, salted with the
//! username under a fixed context string. Verification compares digests in
//! constant time.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// BLAKE3 derive-key context. Changing it invalidates every stored digest.
const DERIVE_CONTEXT: &str = "furnish 2026-01-01 user password v1";

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted password length, in characters.
pub const MAX_PASSWORD_LEN: usize = 128;

/// A stored password digest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash([u8; 32]);

impl PasswordHash {
    /// Derive the digest for `password` belonging to `username`.
    #[must_use]
    pub fn derive(username: &str, password: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(DERIVE_CONTEXT);
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update(&(username.len() as u64).to_le_bytes());
        hasher.update(username.as_bytes());
        hasher.update(password.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Check `password` against this digest in constant time.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let candidate = Self::derive(username, password);
        self.0.ct_eq(&candidate.0).into()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_original_password() {
        let hash = PasswordHash::derive("alice", "correct horse");
        assert!(hash.verify("alice", "correct horse"));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = PasswordHash::derive("alice", "correct horse");
        assert!(!hash.verify("alice", "correct horsE"));
        assert!(!hash.verify("alice", ""));
    }

    #[test]
    fn test_username_salts_digest() {
        let a = PasswordHash::derive("alice", "same password");
        let b = PasswordHash::derive("bob", "same password");
        assert_ne!(a, b);
        assert!(!a.verify("bob", "same password"));
    }

    #[test]
    fn test_length_prefix_separates_boundaries() {
        assert_ne!(PasswordHash::derive("ab", "c"), PasswordHash::derive("a", "bc"));
    }

    #[test]
    fn test_debug_hides_digest() {
        let hash = PasswordHash::derive("alice", "secret123");
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }
}
