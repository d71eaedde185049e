//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Read `X-API-Key` / `X-API-Secret` (and the tenant headers)
//! 2. Run the authorization pipeline against the route's [`RoutePolicy`]
//! 3. Queue a usage record for the credential
//! 4. Inject [`AuthContext`] into the request, or reject it

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    app::AppState,
    auth::pipeline::{PresentedCredentials, RoutePolicy},
    error::AppError,
};

pub use crate::auth::pipeline::AuthContext;

/// Middleware state: shared app state plus the policy of the guarded routes.
#[derive(Clone)]
pub struct AuthGuard {
    state: AppState,
    policy: Arc<RoutePolicy>,
}

impl AuthGuard {
    pub fn new(state: AppState, policy: RoutePolicy) -> Self {
        Self {
            state,
            policy: Arc::new(policy),
        }
    }
}

/// API key authentication middleware function.
///
/// # Headers
///
/// ```text
/// X-API-Key: ak_3f9c...
/// X-API-Secret: as_81d0...
/// X-Client-Subdomain: acme        (optional, otherwise taken from Host)
/// ```
///
/// # Returns
///
/// - `Ok(Response)` from the next handler when every stage passes
/// - `Err(AppError::Auth(_))` with the denial otherwise
pub async fn auth_middleware(
    State(guard): State<AuthGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Split so the borrowed headers stay Send across the pipeline's awaits
    let (mut parts, body) = request.into_parts();

    let outcome = {
        let fallback_host = parts.uri.host();
        match PresentedCredentials::from_headers(&parts.headers, fallback_host) {
            Ok(credentials) => {
                guard
                    .state
                    .authenticator
                    .authorize(credentials, &guard.policy)
                    .await
            }
            Err(denial) => Err(denial),
        }
    };

    let context = outcome.map_err(|denial| {
        warn!(
            path = %parts.uri.path(),
            reason = denial.reason(),
            required = %guard.policy.permission,
            "request denied"
        );
        AppError::Auth(denial)
    })?;

    debug!(
        credential_id = %context.credential_id,
        tenant = context.tenant.as_deref().unwrap_or("-"),
        "request authorized"
    );

    guard.state.usage.record(context.credential_id);

    // Handlers extract this with Extension<AuthContext>
    parts.extensions.insert(context);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
