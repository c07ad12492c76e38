//! Driver token verification.
//!
//! The configured token is kept only as a SHA-256 digest; presented tokens
//! are hashed and compared digest to digest.

use sha2::{Digest, Sha256};
use std::fmt;

/// Server-side credential that gates status writes.
#[derive(Clone)]
pub struct DriverCredential {
    digest: [u8; 32],
}

impl DriverCredential {
    pub fn new(token: &str) -> Self {
        Self {
            digest: Sha256::digest(token.as_bytes()).into(),
        }
    }

    /// Returns true when `presented` hashes to the configured digest.
    pub fn verify(&self, presented: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for DriverCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DriverCredential(..)")
    }
}
