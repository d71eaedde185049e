//! Protected admin area.

use axum::{Extension, Json};
use serde::Serialize;

use crate::middleware::auth::AuthContext;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub message: String,
    pub user_id: Option<String>,
    pub subdomain: Option<String>,
    pub permissions: Vec<String>,
}

/// `GET /api/v1/admin/dashboard`, requires `read:admin`.
///
/// Echoes the identity bound by the auth middleware.
pub async fn dashboard(Extension(auth): Extension<AuthContext>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        message: "Welcome to the protected admin area!".to_string(),
        user_id: auth.user_id,
        subdomain: auth.tenant,
        permissions: auth.permissions,
    })
}
