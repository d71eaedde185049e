//! One-way hashing of credential secrets with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...`), so the salt and
//! the cost parameters travel with each hash and verification never depends
//! on the current configuration.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

use tokio::task;

/// Secret hashing failed. Fatal to issuance.
#[derive(Debug, thiserror::Error)]
#[error("secret hashing failed: {0}")]
pub struct HashError(String);

/// Argon2id hasher with fixed cost parameters.
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,

    /// Hash of a throwaway secret, made with `params`. Verified against on a
    /// key lookup miss so that path costs the same as a real verify.
    decoy_hash: Arc<str>,
}

impl SecretHasher {
    /// Builds a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the parameters are outside Argon2's limits.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError(format!("invalid Argon2 params: {e}")))?;

        let mut hasher = Self {
            params,
            decoy_hash: Arc::from(""),
        };
        hasher.decoy_hash = Arc::from(hasher.hash("decoy")?);
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Checks `secret` against a stored PHC string.
    ///
    /// A malformed or empty hash yields `false`, never an error.
    pub fn verify(&self, secret: &str, hashed_secret: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hashed_secret) else {
            return false;
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_async(&self, secret: String) -> Result<String, HashError> {
        let hasher = self.clone();
        task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| HashError(format!("hashing task failed: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    ///
    /// Argon2 is CPU-bound and would stall the async runtime if run inline.
    pub async fn verify_async(
        &self,
        secret: String,
        hashed_secret: String,
    ) -> Result<bool, task::JoinError> {
        let hasher = self.clone();
        task::spawn_blocking(move || hasher.verify(&secret, &hashed_secret)).await
    }

    /// Runs a full verify of `secret` against the decoy hash and discards the
    /// result. Used when there is no stored hash to check.
    pub async fn verify_decoy(&self, secret: String) {
        let _ = self.verify_async(secret, self.decoy_hash.to_string()).await;
    }
}
