//! Credential validation and scoped authorization.
//!
//! # Pipeline
//!
//! ```text
//! headers ─▶ validator ─▶ permissions ─▶ tenant ─▶ AuthContext
//!              │  │
//!              │  └─ hasher (Argon2id verify)
//!              └──── CredentialStore::find_one_by_field
//! ```
//!
//! Every stage either passes the request on or ends it with an [`AuthError`].
//! Denials that come from credential material (unknown key, wrong secret,
//! inactive key) are folded into one response so callers cannot discover which
//! keys exist. Denials after authentication (permission, tenant) are reported
//! precisely.

pub mod hasher;
pub mod keygen;
pub mod permissions;
pub mod pipeline;
pub mod tenant;
pub mod validator;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Literal prefix of every public key.
pub const KEY_PREFIX: &str = "ak_";

/// Literal prefix of every secret handed to clients. Not part of the hash input.
pub const SECRET_PREFIX: &str = "as_";

/// Result of successful credential validation, before any route policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub credential_id: Uuid,
    pub user_id: Option<String>,
    pub permissions: Vec<String>,
}

/// Why a request was denied.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// `X-API-Key` or `X-API-Secret` missing or blank.
    #[error("X-API-Key and X-API-Secret headers are required")]
    MissingCredentials,

    /// No credential (or more than one) has this public key.
    #[error("Invalid credentials or inactive key")]
    InvalidKey,

    /// Wrong secret, or a credential that is not active.
    #[error("Invalid credentials or inactive key")]
    InvalidCredentials,

    #[error("Insufficient permissions: requires {required}")]
    InsufficientPermissions { required: String },

    /// The credential has no owning user, so tenant scope cannot be checked.
    #[error("API key not associated with a user")]
    UnboundCredential,

    #[error("Could not retrieve user data")]
    IdentityLookupFailed,

    #[error("Subdomain '{tenant}' not allowed")]
    TenantNotAllowed { tenant: String },

    #[error("Subdomain not found in X-Client-Subdomain header or Host")]
    MissingTenant,

    /// The credential store could not answer. Retrying the request may succeed.
    #[error("Credential store temporarily unavailable")]
    TransientFailure,

    #[error("Internal authentication error")]
    Internal,
}

impl AuthError {
    /// Stable machine-readable reason for logs (never folded).
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidKey => "invalid_key",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InsufficientPermissions { .. } => "insufficient_permissions",
            AuthError::UnboundCredential => "unbound_credential",
            AuthError::IdentityLookupFailed => "identity_lookup_failed",
            AuthError::TenantNotAllowed { .. } => "tenant_not_allowed",
            AuthError::MissingTenant => "missing_tenant",
            AuthError::TransientFailure => "transient_failure",
            AuthError::Internal => "internal_error",
        }
    }
}

/// Short SHA-256 fingerprint of a public key, safe to put in logs.
pub fn fingerprint(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        assert_eq!(fingerprint("ak_1"), fingerprint("ak_1"));
        assert_ne!(fingerprint("ak_1"), fingerprint("ak_2"));
        assert_eq!(fingerprint("ak_1").len(), 12);
    }

    #[test]
    fn credential_denials_share_a_message() {
        assert_eq!(
            AuthError::InvalidKey.to_string(),
            AuthError::InvalidCredentials.to_string()
        );
        assert_ne!(AuthError::InvalidKey.reason(), AuthError::InvalidCredentials.reason());
    }
}
