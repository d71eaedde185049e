//! API key (credential record) model and its request/response types.
//!
//! A credential is a public `api_key` plus an Argon2 hash of its secret. The
//! plaintext secret is only ever returned by the issuance endpoint; the hash is
//! never serialized into any response type defined here.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a credential.
///
/// Only [`KeyStatus::Active`] credentials pass validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Inactive,
    Assigned,
}

impl KeyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
            KeyStatus::Assigned => "assigned",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(KeyStatus::Active),
            "inactive" => Ok(KeyStatus::Inactive),
            "assigned" => Ok(KeyStatus::Assigned),
            other => Err(format!("unknown key status '{other}'")),
        }
    }
}

/// Declared request limits. Stored with the key, not enforced by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: i32,

    /// Zero means no hourly limit was declared.
    #[serde(default)]
    pub requests_per_hour: i32,
}

fn default_requests_per_minute() -> i32 {
    60
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_hour: 0,
        }
    }
}

/// Usage counters, mutated only by the usage recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    /// Total successful authorizations. Never decreases.
    pub total_requests: i64,

    pub last_used_at: Option<DateTime<Utc>>,
}

/// A persisted credential.
///
/// # Database Table
///
/// Maps to one row of the `api_keys` table (see `store::postgres`), keyed by
/// `id` with a unique index on `api_key`.
///
/// Not `Serialize`: responses go through
/// [`ApiKeyResponse`], which has no field for the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    /// Generated at issuance, immutable.
    pub id: Uuid,

    pub name: String,
    pub description: String,
    pub environment: String,
    pub project_id: Option<String>,

    /// Public identifier presented in the `X-API-Key` header (`ak_` + hex).
    pub api_key: String,

    /// Argon2id PHC string of the secret (without its `as_` prefix).
    pub hashed_secret: String,

    /// Owning user. Set at most once.
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,

    pub status: KeyStatus,

    /// Capability strings, deduplicated. May contain `super:admin`.
    pub permissions: Vec<String>,

    pub rate_limits: RateLimits,
    pub usage: Usage,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for issuing a new key.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Mobile app key",
///   "description": "Read-only key for the iOS app",
///   "user_id": "oSXtytzfgmMuhYMQKRwhEm5tFIs2",
///   "environment": "production",
///   "permissions": ["read:documents", "read:admin"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Optional owner. When present the user must exist in the directory.
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default, alias = "rateLimits")]
    pub rate_limits: Option<RateLimits>,
}

/// Credential as returned to clients. Never carries the secret hash.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: Option<String>,
    pub api_key: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub status: KeyStatus,
    pub environment: String,
    pub permissions: Vec<String>,
    pub rate_limits: RateLimits,
    pub total_requests: i64,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CredentialRecord> for ApiKeyResponse {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            project_id: record.project_id,
            api_key: record.api_key,
            user_id: record.user_id,
            user_email: record.user_email,
            status: record.status,
            environment: record.environment,
            permissions: record.permissions,
            rate_limits: record.rate_limits,
            total_requests: record.usage.total_requests,
            assigned_at: record.assigned_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response body for a newly issued key.
///
/// This is the only place the plaintext secret ever appears.
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub success: bool,
    pub message: String,
    pub warning: String,
    pub data: ApiKeyResponse,
    pub api_secret: String,
}

/// Request body for `POST /api/v1/users/{uid}/assign-key`.
#[derive(Debug, Deserialize)]
pub struct AssignApiKeyRequest {
    #[serde(alias = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct AssignApiKeyResponse {
    pub success: bool,
    pub message: String,
    pub api_key: String,
    pub user_id: String,
    pub project_id: String,
}

/// Request body for `PATCH /api/v1/keys/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: KeyStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_its_own_rendering() {
        for status in [KeyStatus::Active, KeyStatus::Inactive, KeyStatus::Assigned] {
            assert_eq!(status.as_str().parse::<KeyStatus>(), Ok(status));
        }
        assert!("revoked".parse::<KeyStatus>().is_err());
    }

    #[test]
    fn create_request_accepts_camel_case_user_id() {
        let request: CreateApiKeyRequest =
            serde_json::from_str(r#"{"name":"k","userId":"u1"}"#).unwrap();
        assert_eq!(request.user_id.as_deref(), Some("u1"));
        assert!(request.permissions.is_empty());
        assert!(request.rate_limits.is_none());
    }

    #[test]
    fn response_never_contains_hash() {
        let now = Utc::now();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            name: "k".into(),
            description: String::new(),
            environment: String::new(),
            project_id: None,
            api_key: "ak_00".into(),
            hashed_secret: "$argon2id$v=19$secret-hash".into(),
            user_id: None,
            user_email: None,
            assigned_at: None,
            status: KeyStatus::Active,
            permissions: vec![],
            rate_limits: RateLimits::default(),
            usage: Usage::default(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&ApiKeyResponse::from(record)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("hashed_secret"));
    }
}
