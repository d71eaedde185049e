//! Tenant (subdomain) resolution and scoping.
//!
//! The tenant a request targets comes from the `X-Client-Subdomain` header when
//! present, otherwise from the first label of the `Host` header. The resolved
//! tenant must appear in the owning user's authorized subdomain list.

use tracing::warn;

use super::{AuthError, Identity};
use crate::store::UserDirectory;

/// Header that explicitly names the tenant, overriding the host.
pub const TENANT_HEADER: &str = "x-client-subdomain";

/// Whether a protected route enforces tenant scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// The request must name a tenant the credential's user is allowed in.
    Required,
    /// Tenant is neither resolved nor checked.
    Unscoped,
}

/// Resolves the requested tenant.
///
/// 1. A non-empty explicit header wins.
/// 2. Otherwise the first label of `host` when it has at least two labels
///    (`acme.example.com`, `acme.localhost:8081`).
/// 3. Otherwise [`AuthError::MissingTenant`].
pub fn resolve_tenant(explicit: Option<&str>, host: Option<&str>) -> Result<String, AuthError> {
    if let Some(tenant) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(tenant.to_string());
    }

    host.map(str::trim)
        .and_then(|host| {
            let mut labels = host.split('.');
            let first = labels.next()?;
            // A single label such as "localhost" names no tenant
            labels.next()?;
            Some(first)
        })
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingTenant)
}

/// Checks that the identity's user may act in `tenant`.
///
/// Each failure has its own reason so audits can tell an unassigned key from a
/// directory outage from a plain tenant mismatch.
pub async fn authorize_tenant(
    directory: &dyn UserDirectory,
    identity: &Identity,
    tenant: &str,
) -> Result<(), AuthError> {
    let user_id = identity
        .user_id
        .as_deref()
        .ok_or(AuthError::UnboundCredential)?;

    let user = directory.get_user(user_id).await.map_err(|e| {
        warn!(user_id, error = %e, "identity lookup failed");
        AuthError::IdentityLookupFailed
    })?;

    if !user.allows_subdomain(tenant) {
        return Err(AuthError::TenantNotAllowed {
            tenant: tenant.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{models::user::UserRecord, store::memory::MemoryUserDirectory};

    #[test]
    fn header_wins_over_host() {
        let tenant = resolve_tenant(Some("acme"), Some("foo.example.com")).unwrap();
        assert_eq!(tenant, "acme");
    }

    #[test]
    fn falls_back_to_first_host_label() {
        assert_eq!(resolve_tenant(Some(""), Some("acme.example.com")).unwrap(), "acme");
        assert_eq!(resolve_tenant(None, Some("acme.localhost")).unwrap(), "acme");
        assert_eq!(resolve_tenant(Some("  "), Some("acme.localhost:8081")).unwrap(), "acme");
    }

    #[test]
    fn single_label_host_is_missing_tenant() {
        assert!(matches!(
            resolve_tenant(Some(""), Some("localhost")),
            Err(AuthError::MissingTenant)
        ));
        assert!(matches!(
            resolve_tenant(None, Some("localhost:8081")),
            Err(AuthError::MissingTenant)
        ));
    }

    #[test]
    fn nothing_to_resolve_is_missing_tenant() {
        assert!(matches!(resolve_tenant(None, None), Err(AuthError::MissingTenant)));
        assert!(matches!(
            resolve_tenant(None, Some(".example.com")),
            Err(AuthError::MissingTenant)
        ));
    }

    fn identity(user_id: Option<&str>) -> Identity {
        Identity {
            credential_id: Uuid::new_v4(),
            user_id: user_id.map(str::to_string),
            permissions: vec![],
        }
    }

    fn directory() -> MemoryUserDirectory {
        let directory = MemoryUserDirectory::new();
        directory.insert(UserRecord {
            id: "u1".into(),
            email: "u1@example.com".into(),
            project_id: Some("p1".into()),
            subdomains: vec!["Acme".into(), "globex".into()],
        });
        directory
    }

    #[tokio::test]
    async fn allowed_tenant_matches_case_insensitively() {
        let directory = directory();
        authorize_tenant(&directory, &identity(Some("u1")), "acme")
            .await
            .unwrap();
        authorize_tenant(&directory, &identity(Some("u1")), "GLOBEX")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn each_failure_has_its_own_reason() {
        let directory = directory();

        assert!(matches!(
            authorize_tenant(&directory, &identity(None), "acme").await,
            Err(AuthError::UnboundCredential)
        ));
        assert!(matches!(
            authorize_tenant(&directory, &identity(Some("ghost")), "acme").await,
            Err(AuthError::IdentityLookupFailed)
        ));
        assert!(matches!(
            authorize_tenant(&directory, &identity(Some("u1")), "initech").await,
            Err(AuthError::TenantNotAllowed { .. })
        ));
    }
}
