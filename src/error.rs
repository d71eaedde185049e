//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::{AuthError, hasher::HashError, keygen::KeyGenError},
    store::StoreError,
};

/// Application-wide error type.
///
/// Each variant maps to one HTTP status and one stable `code` string.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authorization pipeline denial. See [`AuthError`] for the mapping.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The random source failed while issuing a key.
    #[error(transparent)]
    KeyGeneration(#[from] KeyGenError),

    /// Secret hashing failed while issuing a key.
    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error("API key not found")]
    KeyNotFound,

    #[error("User not found")]
    UserNotFound,

    /// The key already belongs to a user.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("API key is already assigned to a user")]
    KeyAlreadyAssigned,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Maps a pipeline denial to (status, code).
///
/// `InvalidKey` and `InvalidCredentials` share a code so a caller cannot tell
/// an unknown key from a wrong secret or an inactive key.
fn auth_status(err: &AuthError) -> (StatusCode, &'static str) {
    match err {
        AuthError::MissingCredentials => (StatusCode::BAD_REQUEST, "missing_credentials"),
        AuthError::InvalidKey | AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "invalid_credentials")
        }
        AuthError::InsufficientPermissions { .. } => {
            (StatusCode::FORBIDDEN, "insufficient_permissions")
        }
        AuthError::UnboundCredential => (StatusCode::FORBIDDEN, "unbound_credential"),
        AuthError::IdentityLookupFailed => (StatusCode::FORBIDDEN, "identity_lookup_failed"),
        AuthError::TenantNotAllowed { .. } => (StatusCode::FORBIDDEN, "tenant_not_allowed"),
        AuthError::MissingTenant => (StatusCode::BAD_REQUEST, "missing_tenant"),
        AuthError::TransientFailure => {
            (StatusCode::SERVICE_UNAVAILABLE, "temporarily_unavailable")
        }
        AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Store, hashing and key generation failures are logged and reported as a
/// generic `internal_error` without details.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(err) => {
                let (status, code) = auth_status(err);
                (status, code, err.to_string())
            }
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::KeyAlreadyAssigned => {
                (StatusCode::CONFLICT, "key_already_assigned", self.to_string())
            }
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Store(_) | AppError::KeyGeneration(_) | AppError::Hashing(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
