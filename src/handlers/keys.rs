//! API key management HTTP handlers.
//!
//! - POST /api/v1/keys - Issue a new key/secret pair (reserved grants need an authorized caller)
//! - POST /api/v1/users/{uid}/assign-key - Bind an unowned key to a user
//! - PATCH /api/v1/keys/{id}/status - Activate or deactivate a key (requires `admin:keys`)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    auth::{AuthError, permissions, pipeline::PresentedCredentials},
    error::AppError,
    middleware::auth::AuthContext,
    models::api_key::{
        ApiKeyResponse, AssignApiKeyRequest, AssignApiKeyResponse, CreateApiKeyRequest,
        CreateApiKeyResponse, UpdateStatusRequest,
    },
    services::key_service,
};

/// Issue a new API key.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Mobile app key",
///   "user_id": "oSXtytzfgmMuhYMQKRwhEm5tFIs2",
///   "environment": "production",
///   "permissions": ["read:documents", "read:admin"]
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the key record plus `api_secret`, shown only this once
/// - **400**: missing name, or a reserved permission requested without credentials
/// - **401 / 403**: the caller's credentials cannot grant a requested reserved permission
/// - **404**: `user_id` names no user
///
/// Reserved permissions (`super:admin`, `admin:keys`) are only granted when the
/// request carries `X-API-Key` / `X-API-Secret` of a key that holds each of them.
///
/// ```json
/// {
///   "success": true,
///   "message": "API Key created successfully",
///   "warning": "Save the API Secret securely. It will not be shown again!",
///   "data": { "id": "...", "api_key": "ak_...", "status": "active", ... },
///   "api_secret": "as_..."
/// }
/// ```
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), AppError> {
    let reserved = permissions::reserved_in(&request.permissions);
    if !reserved.is_empty() {
        authorize_grant(&state, &headers, &reserved).await?;
    }

    let issued = key_service::issue_key(
        state.store.as_ref(),
        state.directory.as_ref(),
        &state.hasher,
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            success: true,
            message: "API Key created successfully".to_string(),
            warning: "Save the API Secret securely. It will not be shown again!".to_string(),
            data: issued.record.into(),
            api_secret: issued.secret,
        }),
    ))
}

/// Checks that the calling credential holds every reserved permission it is
/// trying to grant.
async fn authorize_grant(
    state: &AppState,
    headers: &HeaderMap,
    reserved: &[&str],
) -> Result<(), AuthError> {
    let outcome = async {
        let credentials = PresentedCredentials::from_headers(headers, None)?;
        let grantor = state.authenticator.authenticate(credentials).await?;
        for permission in reserved {
            permissions::require(&grantor.permissions, permission)?;
        }
        Ok::<_, AuthError>(grantor)
    }
    .await;

    match outcome {
        Ok(grantor) => {
            info!(
                grantor = %grantor.credential_id,
                ?reserved,
                "reserved permissions granted"
            );
            state.usage.record(grantor.credential_id);
            Ok(())
        }
        Err(denial) => {
            warn!(reason = denial.reason(), ?reserved, "reserved grant denied");
            Err(denial)
        }
    }
}

/// Assign an unowned key to user `uid`.
///
/// # Response
///
/// - **200 OK**: key bound to the user and their project
/// - **400**: the user has no project
/// - **404**: unknown user or key
/// - **409**: the key already belongs to a user
pub async fn assign_key(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<AssignApiKeyRequest>,
) -> Result<Json<AssignApiKeyResponse>, AppError> {
    let project_id = key_service::assign_key(
        state.store.as_ref(),
        state.directory.as_ref(),
        &uid,
        &request.api_key,
    )
    .await?;

    Ok(Json(AssignApiKeyResponse {
        success: true,
        message: "API Key assigned successfully".to_string(),
        api_key: request.api_key,
        user_id: uid,
        project_id,
    }))
}

/// Change the status of key `id`.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    info!(
        target_key = %id,
        by_credential = %auth.credential_id,
        status = %request.status,
        "status change requested"
    );

    let record = key_service::set_status(state.store.as_ref(), id, request.status).await?;

    Ok(Json(record.into()))
}
