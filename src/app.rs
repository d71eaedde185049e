//! Shared application state and the HTTP router.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    auth::{
        hasher::SecretHasher,
        permissions::KEY_ADMIN_PERMISSION,
        pipeline::{Authenticator, RoutePolicy},
        tenant::TenantScope,
        validator::CredentialValidator,
    },
    handlers,
    middleware::auth::{AuthGuard, auth_middleware},
    services::usage_recorder::UsageRecorder,
    store::{CredentialStore, UserDirectory},
};

/// Permission required by the admin dashboard.
pub const READ_ADMIN: &str = "read:admin";

/// Permission required to change key status.
pub const MANAGE_KEYS: &str = KEY_ADMIN_PERMISSION;

/// State shared by every handler and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub directory: Arc<dyn UserDirectory>,
    pub hasher: SecretHasher,
    pub authenticator: Authenticator,
    pub usage: UsageRecorder,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        directory: Arc<dyn UserDirectory>,
        hasher: SecretHasher,
        usage: UsageRecorder,
    ) -> Self {
        let validator = CredentialValidator::new(store.clone(), hasher.clone());
        let authenticator = Authenticator::new(validator, directory.clone());
        Self {
            store,
            directory,
            hasher,
            authenticator,
            usage,
        }
    }
}

/// Per-deployment routing switches.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    /// Tenant scoping for `/api/v1/admin/*`.
    pub admin_tenant_scope: TenantScope,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            admin_tenant_scope: TenantScope::Required,
        }
    }
}

/// Builds the HTTP router.
///
/// # Routes
///
/// | Method | Path | Guard |
/// |---|---|---|
/// | GET | `/health` | none |
/// | POST | `/api/v1/keys` | none; granting `super:admin` or `admin:keys` requires holding it |
/// | POST | `/api/v1/users/{uid}/assign-key` | none |
/// | PATCH | `/api/v1/keys/{id}/status` | `admin:keys`, unscoped |
/// | GET | `/api/v1/admin/dashboard` | `read:admin`, tenant per options |
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let guard = |permission: &str, scope: TenantScope| {
        axum_middleware::from_fn_with_state(
            AuthGuard::new(state.clone(), RoutePolicy::new(permission, scope)),
            auth_middleware,
        )
    };

    let admin_routes = Router::new()
        .route("/api/v1/admin/dashboard", get(handlers::admin::dashboard))
        .route_layer(guard(READ_ADMIN, options.admin_tenant_scope));

    let key_admin_routes = Router::new()
        .route(
            "/api/v1/keys/{id}/status",
            patch(handlers::keys::update_status),
        )
        .route_layer(guard(MANAGE_KEYS, TenantScope::Unscoped));

    Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/keys", post(handlers::keys::create_key))
        .route(
            "/api/v1/users/{uid}/assign-key",
            post(handlers::keys::assign_key),
        )
        // Guarded routes
        .merge(admin_routes)
        .merge(key_admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
