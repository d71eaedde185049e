//! Key service - issuance, assignment and status changes for credentials.
//!
//! # Issuance Guarantees
//!
//! Nothing is written until both random draws and the secret hash have
//! succeeded, so a failed issuance never leaves a partial record behind. The
//! plaintext secret is returned once and is not recoverable afterwards.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        KEY_PREFIX, SECRET_PREFIX, fingerprint,
        hasher::SecretHasher,
        keygen::{self, API_KEY_BYTES, SECRET_BYTES},
        permissions,
    },
    error::AppError,
    models::{
        api_key::{CreateApiKeyRequest, CredentialRecord, KeyStatus, Usage},
        user::UserRecord,
    },
    store::{
        CredentialStore, FieldUpdate, LookupField, Precondition, StoreError, UserDirectory,
    },
};

/// A freshly issued credential together with its one-time plaintext secret.
#[derive(Debug)]
pub struct IssuedKey {
    pub record: CredentialRecord,

    /// `as_`-prefixed secret, exactly as the client must present it.
    pub secret: String,
}

async fn lookup_user(directory: &dyn UserDirectory, user_id: &str) -> Result<UserRecord, AppError> {
    directory.get_user(user_id).await.map_err(|e| match e {
        StoreError::NotFound { .. } => AppError::UserNotFound,
        other => AppError::Store(other),
    })
}

/// Issue a new key.
///
/// # Process
///
/// 1. Validate the request and, when a user is named, load it
/// 2. Draw the public key (24 bytes) and the secret (32 bytes)
/// 3. Hash the secret with Argon2id
/// 4. Store the record under a new UUID
///
/// # Errors
///
/// - `InvalidRequest`: empty name
/// - `UserNotFound`: `user_id` names no user
/// - `KeyGeneration` / `Hashing`: issuance aborted, nothing stored
/// - `Store`: the insert failed
pub async fn issue_key(
    store: &dyn CredentialStore,
    directory: &dyn UserDirectory,
    hasher: &SecretHasher,
    request: CreateApiKeyRequest,
) -> Result<IssuedKey, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("name is required".to_string()));
    }

    let user = match request.user_id.as_deref().filter(|u| !u.is_empty()) {
        Some(user_id) => Some(lookup_user(directory, user_id).await?),
        None => None,
    };

    let api_key = format!("{KEY_PREFIX}{}", keygen::generate(API_KEY_BYTES)?);
    let secret = keygen::generate(SECRET_BYTES)?;
    let hashed_secret = hasher.hash_async(secret.clone()).await?;

    let now = Utc::now();
    let record = CredentialRecord {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        environment: request.environment,
        project_id: user.as_ref().and_then(|u| u.project_id.clone()),
        api_key,
        hashed_secret,
        user_id: user.as_ref().map(|u| u.id.clone()),
        user_email: user.as_ref().map(|u| u.email.clone()),
        assigned_at: user.as_ref().map(|_| now),
        status: KeyStatus::Active,
        permissions: permissions::normalize(request.permissions),
        rate_limits: request.rate_limits.unwrap_or_default(),
        usage: Usage::default(),
        created_at: now,
        updated_at: now,
    };

    store.create_with_id(&record).await?;

    info!(
        credential_id = %record.id,
        key_fp = %fingerprint(&record.api_key),
        user_id = record.user_id.as_deref().unwrap_or("-"),
        "api key issued"
    );

    Ok(IssuedKey {
        record,
        secret: format!("{SECRET_PREFIX}{secret}"),
    })
}

/// Bind an unowned key to a user.
///
/// The key takes the user's id, email and project, and moves to the
/// `assigned` status. The write is conditional on the key still having no
/// user, so two concurrent assignments cannot both succeed.
///
/// # Errors
///
/// - `UserNotFound`: unknown user
/// - `InvalidRequest`: the user has no project
/// - `KeyNotFound`: unknown key
/// - `KeyAlreadyAssigned`: the key already has a user (left unchanged)
///
/// Returns the project id the key was bound to.
pub async fn assign_key(
    store: &dyn CredentialStore,
    directory: &dyn UserDirectory,
    user_id: &str,
    api_key: &str,
) -> Result<String, AppError> {
    let user = lookup_user(directory, user_id).await?;

    let project_id = user
        .project_id
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::InvalidRequest("User profile does not have a valid project_id".to_string())
        })?;

    let record = store
        .find_one_by_field(LookupField::ApiKey, api_key)
        .await
        .map_err(|e| match e {
            StoreError::NotFound { .. } | StoreError::Ambiguous { .. } => AppError::KeyNotFound,
            other => AppError::Store(other),
        })?;

    if record.user_id.is_some() {
        return Err(AppError::KeyAlreadyAssigned);
    }

    let now = Utc::now();
    let updates = [
        FieldUpdate::UserId(user.id.clone()),
        FieldUpdate::UserEmail(user.email.clone()),
        FieldUpdate::ProjectId(project_id.clone()),
        FieldUpdate::Status(KeyStatus::Assigned),
        FieldUpdate::AssignedAt(now),
        FieldUpdate::UpdatedAt(now),
    ];

    store
        .update_fields(record.id, &updates, Precondition::UserUnassigned)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::KeyAlreadyAssigned,
            StoreError::NotFound { .. } => AppError::KeyNotFound,
            other => AppError::Store(other),
        })?;

    info!(credential_id = %record.id, user_id, project_id = %project_id, "api key assigned");

    Ok(project_id)
}

/// Change a key's status (activate, deactivate).
pub async fn set_status(
    store: &dyn CredentialStore,
    id: Uuid,
    status: KeyStatus,
) -> Result<CredentialRecord, AppError> {
    let not_found = |e: StoreError| match e {
        StoreError::NotFound { .. } => AppError::KeyNotFound,
        other => AppError::Store(other),
    };

    store
        .update_fields(
            id,
            &[FieldUpdate::Status(status), FieldUpdate::UpdatedAt(Utc::now())],
            Precondition::None,
        )
        .await
        .map_err(not_found)?;

    info!(credential_id = %id, %status, "api key status changed");

    store.get_by_id(id).await.map_err(not_found)
}
