//! Permission evaluation.
//!
//! A credential carries a flat set of capability strings. A route requires
//! exactly one. Matching is exact: no hierarchy, no globbing. The single
//! exception is [`SUPERUSER_PERMISSION`], which satisfies any requirement.

use super::AuthError;

/// Wildcard capability that satisfies every permission check.
pub const SUPERUSER_PERMISSION: &str = "super:admin";

/// Capability to change the status of any key.
pub const KEY_ADMIN_PERMISSION: &str = "admin:keys";

/// Permissions only a caller already holding them may grant.
pub const RESERVED_PERMISSIONS: [&str; 2] = [SUPERUSER_PERMISSION, KEY_ADMIN_PERMISSION];

/// Whether `permissions` grants `required`.
pub fn authorize(permissions: &[String], required: &str) -> bool {
    permissions
        .iter()
        .any(|p| p == SUPERUSER_PERMISSION || p == required)
}

/// [`authorize`] as a pipeline step.
pub fn require(permissions: &[String], required: &str) -> Result<(), AuthError> {
    if authorize(permissions, required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions {
            required: required.to_string(),
        })
    }
}

/// The reserved permissions that appear in `permissions`.
pub fn reserved_in(permissions: &[String]) -> Vec<&'static str> {
    RESERVED_PERMISSIONS
        .into_iter()
        .filter(|reserved| permissions.iter().any(|p| p.trim() == *reserved))
        .collect()
}

/// Trims, sorts and deduplicates a permission list so it behaves as a set.
pub fn normalize(permissions: Vec<String>) -> Vec<String> {
    let mut permissions: Vec<String> = permissions
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    permissions.sort();
    permissions.dedup();
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn wildcard_grants_anything() {
        assert!(authorize(&perms(&["super:admin"]), "anything"));
        assert!(authorize(&perms(&["read:x", "super:admin"]), "write:y"));
    }

    #[test]
    fn exact_match_only() {
        assert!(authorize(&perms(&["read:x"]), "read:x"));
        assert!(!authorize(&perms(&["read:x"]), "read:y"));
        assert!(!authorize(&perms(&["read:*"]), "read:x"));
        assert!(!authorize(&perms(&["read"]), "read:x"));
        assert!(!authorize(&perms(&["READ:X"]), "read:x"));
    }

    #[test]
    fn empty_set_denies() {
        assert!(!authorize(&[], "read:x"));
    }

    #[test]
    fn require_reports_missing_permission() {
        let err = require(&perms(&["read:docs"]), "read:admin").unwrap_err();
        assert!(matches!(
            err,
            AuthError::InsufficientPermissions { ref required } if required == "read:admin"
        ));
    }

    #[test]
    fn reserved_in_finds_privileged_grants() {
        assert!(reserved_in(&perms(&["read:docs"])).is_empty());
        assert_eq!(reserved_in(&perms(&["read:docs", "admin:keys"])), vec!["admin:keys"]);
        assert_eq!(
            reserved_in(&perms(&[" admin:keys", "super:admin", "super:admin"])),
            vec!["super:admin", "admin:keys"]
        );
    }

    #[test]
    fn normalize_dedups_and_drops_blanks() {
        let normalized = normalize(perms(&["b", "a", " b ", " ", ""]));
        assert_eq!(normalized, perms(&["a", "b"]));
    }
}
