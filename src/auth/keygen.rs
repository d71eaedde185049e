//! Random identifiers for public keys and secrets.

use rand::{TryRngCore, rngs::OsRng};

/// Bytes of entropy in a public key (48 hex chars).
pub const API_KEY_BYTES: usize = 24;

/// Bytes of entropy in a secret (64 hex chars).
pub const SECRET_BYTES: usize = 32;

/// The operating system's random source failed.
#[derive(Debug, thiserror::Error)]
#[error("secure random source unavailable: {0}")]
pub struct KeyGenError(String);

/// Draws `byte_len` bytes from the OS CSPRNG and hex-encodes them.
///
/// Every call is an independent draw. There is no fallback generator: if the
/// OS source fails, the error propagates.
pub fn generate(byte_len: usize) -> Result<String, KeyGenError> {
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| KeyGenError(e.to_string()))?;
    Ok(hex::encode(bytes))
}
