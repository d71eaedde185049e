//! In-memory store and directory implementations.
//!
//! [`MemoryCredentialStore`] and [`MemoryUserDirectory`] back the test suite and
//! local development. Both are cheaply cloneable; clones share the same data.
//! All operations take a [`parking_lot::RwLock`] for their whole duration, which
//! gives the same single-document atomicity the PostgreSQL store provides.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    Counter, CredentialStore, FieldUpdate, LookupField, Precondition, StoreError, StoreResult,
    UserDirectory,
};
use crate::models::{api_key::CredentialRecord, user::UserRecord};

/// Credential records held in a `HashMap` keyed by id.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<Uuid, CredentialRecord>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn apply_update(record: &mut CredentialRecord, update: &FieldUpdate) {
    match update {
        FieldUpdate::UserId(user_id) => record.user_id = Some(user_id.clone()),
        FieldUpdate::UserEmail(email) => record.user_email = Some(email.clone()),
        FieldUpdate::ProjectId(project_id) => record.project_id = Some(project_id.clone()),
        FieldUpdate::Status(status) => record.status = *status,
        FieldUpdate::AssignedAt(at) => record.assigned_at = Some(*at),
        FieldUpdate::UpdatedAt(at) => record.updated_at = *at,
        FieldUpdate::LastUsedAt(at) => record.usage.last_used_at = Some(*at),
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_one_by_field(
        &self,
        field: LookupField,
        value: &str,
    ) -> StoreResult<CredentialRecord> {
        let records = self.records.read();
        let mut matches = records.values().filter(|r| match field {
            LookupField::ApiKey => r.api_key == value,
        });

        let first = matches
            .next()
            .ok_or_else(|| StoreError::credential_not_found(value))?;
        let extra = matches.count();
        if extra > 0 {
            return Err(StoreError::Ambiguous {
                field: field.as_str(),
                count: extra + 1,
            });
        }

        Ok(first.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<CredentialRecord> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::credential_not_found(id))
    }

    async fn create_with_id(&self, record: &CredentialRecord) -> StoreResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StoreError::Conflict(format!("id {} already exists", record.id)));
        }
        if records.values().any(|r| r.api_key == record.api_key) {
            return Err(StoreError::Conflict("api_key already exists".to_string()));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_fields(
        &self,
        id: Uuid,
        updates: &[FieldUpdate],
        precondition: Precondition,
    ) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::credential_not_found(id))?;

        if precondition == Precondition::UserUnassigned && record.user_id.is_some() {
            return Err(StoreError::Conflict("credential already has a user".to_string()));
        }

        for update in updates {
            apply_update(record, update);
        }
        Ok(())
    }

    async fn increment_counter(&self, id: Uuid, counter: Counter) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::credential_not_found(id))?;

        match counter {
            Counter::TotalRequests => record.usage.total_requests += 1,
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// User records keyed by user id.
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserRecord) {
        self.users.write().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_user(&self, user_id: &str) -> StoreResult<UserRecord> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::user_not_found(user_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::api_key::{KeyStatus, RateLimits, Usage};

    fn record(api_key: &str) -> CredentialRecord {
        let now = Utc::now();
        CredentialRecord {
            id: Uuid::new_v4(),
            name: "test".into(),
            description: String::new(),
            environment: "test".into(),
            project_id: None,
            api_key: api_key.into(),
            hashed_secret: "hash".into(),
            user_id: None,
            user_email: None,
            assigned_at: None,
            status: KeyStatus::Active,
            permissions: vec![],
            rate_limits: RateLimits::default(),
            usage: Usage::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn find_by_api_key_returns_match_or_not_found() {
        let store = MemoryCredentialStore::new();
        let rec = record("ak_1");
        store.create_with_id(&rec).await.unwrap();

        let found = store.find_one_by_field(LookupField::ApiKey, "ak_1").await.unwrap();
        assert_eq!(found.id, rec.id);

        let err = store
            .find_one_by_field(LookupField::ApiKey, "ak_missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id_and_key() {
        let store = MemoryCredentialStore::new();
        let rec = record("ak_1");
        store.create_with_id(&rec).await.unwrap();

        assert!(matches!(
            store.create_with_id(&rec).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.create_with_id(&record("ak_1")).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn precondition_blocks_second_assignment() {
        let store = MemoryCredentialStore::new();
        let rec = record("ak_1");
        store.create_with_id(&rec).await.unwrap();

        store
            .update_fields(
                rec.id,
                &[FieldUpdate::UserId("alice".into())],
                Precondition::UserUnassigned,
            )
            .await
            .unwrap();

        let err = store
            .update_fields(
                rec.id,
                &[FieldUpdate::UserId("mallory".into())],
                Precondition::UserUnassigned,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = store.get_by_id(rec.id).await.unwrap();
        assert_eq!(stored.user_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn increment_unknown_id_is_not_found() {
        let store = MemoryCredentialStore::new();
        let err = store
            .increment_counter(Uuid::new_v4(), Counter::TotalRequests)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
