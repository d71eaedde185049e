//! Liveness check that also pings the credential store.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{app::AppState, error::AppError};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub credential_store: &'static str,
    pub checked_at: DateTime<Utc>,
}

/// `GET /health`
///
/// 200 with `{"status":"ok","credential_store":"reachable",...}` when the store
/// answers a ping, otherwise the standard 500 error body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        credential_store: "reachable",
        checked_at: Utc::now(),
    }))
}
