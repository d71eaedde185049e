//! Store error types and result alias.
//!
//! Every store implementation maps its backend errors to [`StoreError`] so the
//! validation pipeline can tell "no such credential" apart from "the store is
//! unavailable right now".

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by [`CredentialStore`](super::CredentialStore) and
/// [`UserDirectory`](super::UserDirectory) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document matched the lookup.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of document that was looked up.
        entity: &'static str,
        /// Value that was looked up.
        key: String,
    },

    /// A lookup that must match at most one document matched several.
    ///
    /// This is a store integrity violation, never a normal outcome.
    #[error("{count} documents matched {field}")]
    Ambiguous {
        /// Field used for the lookup.
        field: &'static str,
        /// Number of matches observed (may be a lower bound).
        count: usize,
    },

    /// The write collided with existing state (duplicate id or failed precondition).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persisted document could not be decoded into its typed form.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure (connection, query, pool timeout).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Shorthand for a credential lookup miss.
    pub fn credential_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: "credential",
            key: key.to_string(),
        }
    }

    /// Shorthand for a user lookup miss.
    pub fn user_not_found(key: impl ToString) -> Self {
        Self::NotFound {
            entity: "user",
            key: key.to_string(),
        }
    }

    /// Whether this error means the document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
