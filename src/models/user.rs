//! User record as provided by the identity directory.

/// A user known to the identity directory.
///
/// `subdomains` is the list of tenants this user's credentials may act in.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub project_id: Option<String>,
    pub subdomains: Vec<String>,
}

impl UserRecord {
    /// Case-insensitive membership test against the authorized tenant list.
    ///
    /// Folds full Unicode case, so `MÜNCHEN` matches `münchen`.
    pub fn allows_subdomain(&self, tenant: &str) -> bool {
        let tenant = tenant.to_lowercase();
        self.subdomains.iter().any(|s| s.to_lowercase() == tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(subdomains: &[&str]) -> UserRecord {
        UserRecord {
            id: "u1".into(),
            email: "u1@example.com".into(),
            project_id: None,
            subdomains: subdomains.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn ascii_case_is_ignored() {
        let user = user(&["Acme"]);
        assert!(user.allows_subdomain("acme"));
        assert!(user.allows_subdomain("ACME"));
        assert!(!user.allows_subdomain("acme2"));
    }

    #[test]
    fn non_ascii_case_is_ignored() {
        let user = user(&["münchen", "Ωmega"]);
        assert!(user.allows_subdomain("MÜNCHEN"));
        assert!(user.allows_subdomain("ωMEGA"));
        assert!(!user.allows_subdomain("munchen"));
    }

    #[test]
    fn empty_list_allows_nothing() {
        assert!(!user(&[]).allows_subdomain("acme"));
    }
}
