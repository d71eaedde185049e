//! The full authorization pipeline for one request.
//!
//! validate credentials → check permission → (optionally) scope tenant.
//! The first failing stage ends the request; nothing is retried here.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use uuid::Uuid;

use super::{
    AuthError, Identity, permissions,
    tenant::{self, TENANT_HEADER, TenantScope},
    validator::CredentialValidator,
};
use crate::store::UserDirectory;

/// Header carrying the public key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the `as_`-prefixed secret.
pub const API_SECRET_HEADER: &str = "x-api-secret";

/// What a protected route demands of the caller.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub permission: String,
    pub tenant_scope: TenantScope,
}

impl RoutePolicy {
    pub fn new(permission: impl Into<String>, tenant_scope: TenantScope) -> Self {
        Self {
            permission: permission.into(),
            tenant_scope,
        }
    }
}

/// Raw credential material taken from one request.
#[derive(Debug, Clone, Copy)]
pub struct PresentedCredentials<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a str,
    pub tenant_header: Option<&'a str>,
    pub host: Option<&'a str>,
}

impl<'a> PresentedCredentials<'a> {
    /// Reads credentials from request headers.
    ///
    /// `fallback_host` is used when there is no `Host` header (HTTP/2 carries
    /// the authority in the URI instead).
    ///
    /// Missing, empty or non-UTF-8 credential headers are
    /// [`AuthError::MissingCredentials`].
    pub fn from_headers(
        headers: &'a HeaderMap,
        fallback_host: Option<&'a str>,
    ) -> Result<Self, AuthError> {
        let non_empty = move |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let api_key = non_empty(API_KEY_HEADER).ok_or(AuthError::MissingCredentials)?;
        let api_secret = non_empty(API_SECRET_HEADER).ok_or(AuthError::MissingCredentials)?;

        let tenant_header = headers.get(TENANT_HEADER).and_then(|v| v.to_str().ok());
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or(fallback_host);

        Ok(Self {
            api_key,
            api_secret,
            tenant_header,
            host,
        })
    }
}

/// Identity bound to an authorized request.
///
/// Inserted into request extensions by the auth middleware and extracted by
/// handlers with `Extension<AuthContext>`. Lives only as long as the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub credential_id: Uuid,
    pub user_id: Option<String>,
    pub permissions: Vec<String>,

    /// Resolved tenant. `None` on routes with [`TenantScope::Unscoped`].
    pub tenant: Option<String>,
}

/// Runs the three authorization stages.
#[derive(Clone)]
pub struct Authenticator {
    validator: CredentialValidator,
    directory: Arc<dyn UserDirectory>,
}

impl Authenticator {
    pub fn new(validator: CredentialValidator, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            validator,
            directory,
        }
    }

    /// Validates credentials only, with no route policy. Used where the
    /// required permissions depend on the request body.
    pub async fn authenticate(
        &self,
        credentials: PresentedCredentials<'_>,
    ) -> Result<Identity, AuthError> {
        self.validator
            .validate(credentials.api_key, credentials.api_secret)
            .await
    }

    pub async fn authorize(
        &self,
        credentials: PresentedCredentials<'_>,
        policy: &RoutePolicy,
    ) -> Result<AuthContext, AuthError> {
        let identity = self.authenticate(credentials).await?;

        permissions::require(&identity.permissions, &policy.permission)?;

        let tenant = match policy.tenant_scope {
            TenantScope::Required => {
                let tenant = tenant::resolve_tenant(credentials.tenant_header, credentials.host)?;
                tenant::authorize_tenant(self.directory.as_ref(), &identity, &tenant).await?;
                Some(tenant)
            }
            TenantScope::Unscoped => None,
        };

        Ok(AuthContext {
            credential_id: identity.credential_id,
            user_id: identity.user_id,
            permissions: identity.permissions,
            tenant,
        })
    }
}
