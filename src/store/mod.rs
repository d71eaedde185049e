//! Credential store and identity directory adapters.
//!
//! The validation pipeline only talks to storage through the two traits in
//! this module:
//!
//! - [`CredentialStore`]: the `api_keys` document collection
//! - [`UserDirectory`]: the external identity provider (user records and their
//!   authorized tenants)
//!
//! Each operation is atomic at the single-document level. No multi-document
//! transaction is assumed anywhere.
//!
//! Two implementations ship with the service: [`postgres`] for production and
//! [`memory`] for tests and local development.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    api_key::{CredentialRecord, KeyStatus},
    user::UserRecord,
};

pub use error::{StoreError, StoreResult};

/// Fields a credential can be looked up by with an equality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    /// The public key presented on the wire. Unique.
    ApiKey,
}

impl LookupField {
    pub fn as_str(self) -> &'static str {
        match self {
            LookupField::ApiKey => "api_key",
        }
    }
}

/// A single field write for [`CredentialStore::update_fields`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    UserId(String),
    UserEmail(String),
    ProjectId(String),
    Status(KeyStatus),
    AssignedAt(DateTime<Utc>),
    UpdatedAt(DateTime<Utc>),
    LastUsedAt(DateTime<Utc>),
}

/// Condition checked atomically with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    #[default]
    None,
    /// The update applies only while `user_id` is still unset.
    UserUnassigned,
}

/// Counters that support atomic increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    TotalRequests,
}

/// Persistence for credential records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds the single record whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if nothing matches
    /// - [`StoreError::Ambiguous`] if more than one record matches
    async fn find_one_by_field(
        &self,
        field: LookupField,
        value: &str,
    ) -> StoreResult<CredentialRecord>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<CredentialRecord>;

    /// Inserts a new record under its own `id`.
    ///
    /// Returns [`StoreError::Conflict`] if the id or the public key already exists.
    async fn create_with_id(&self, record: &CredentialRecord) -> StoreResult<()>;

    /// Applies `updates` to one record, atomically with `precondition`.
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::Conflict`] when the precondition does not hold.
    async fn update_fields(
        &self,
        id: Uuid,
        updates: &[FieldUpdate],
        precondition: Precondition,
    ) -> StoreResult<()>;

    /// Atomically adds one to `counter`.
    async fn increment_counter(&self, id: Uuid, counter: Counter) -> StoreResult<()>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Lookup of user records in the external identity provider.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns [`StoreError::NotFound`] for an unknown user.
    async fn get_user(&self, user_id: &str) -> StoreResult<UserRecord>;
}
