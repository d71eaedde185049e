//! PostgreSQL implementations of the store traits.
//!
//! Credentials live in the `api_keys` table, one row per key, keyed by `id`
//! with a unique index on `api_key`. Users live in the `users` table. Both
//! tables are created by the migrations in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    Counter, CredentialStore, FieldUpdate, LookupField, Precondition, StoreError, StoreResult,
    UserDirectory,
};
use crate::{
    db::DbPool,
    models::{
        api_key::{CredentialRecord, RateLimits, Usage},
        user::UserRecord,
    },
};

const CREDENTIAL_COLUMNS: &str = "id, name, description, environment, project_id, api_key, \
     hashed_secret, user_id, user_email, assigned_at, status, permissions, \
     requests_per_minute, requests_per_hour, total_requests, last_used_at, \
     created_at, updated_at";

/// Flat row shape of the `api_keys` table.
///
/// Converted into the typed [`CredentialRecord`] with `TryFrom`, which is where
/// an unknown `status` string is caught.
#[derive(Debug, FromRow)]
struct CredentialRow {
    id: Uuid,
    name: String,
    description: String,
    environment: String,
    project_id: Option<String>,
    api_key: String,
    hashed_secret: String,
    user_id: Option<String>,
    user_email: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    status: String,
    permissions: Vec<String>,
    requests_per_minute: i32,
    requests_per_hour: i32,
    total_requests: i64,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for CredentialRecord {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("credential {}: {e}", row.id)))?;

        Ok(CredentialRecord {
            id: row.id,
            name: row.name,
            description: row.description,
            environment: row.environment,
            project_id: row.project_id,
            api_key: row.api_key,
            hashed_secret: row.hashed_secret,
            user_id: row.user_id,
            user_email: row.user_email,
            assigned_at: row.assigned_at,
            status,
            permissions: row.permissions,
            rate_limits: RateLimits {
                requests_per_minute: row.requests_per_minute,
                requests_per_hour: row.requests_per_hour,
            },
            usage: Usage {
                total_requests: row.total_requests,
                last_used_at: row.last_used_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Maps a unique-constraint violation to [`StoreError::Conflict`].
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

/// Credential store backed by the `api_keys` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM api_keys WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_one_by_field(
        &self,
        field: LookupField,
        value: &str,
    ) -> StoreResult<CredentialRecord> {
        // LIMIT 2 is enough to detect a duplicate without scanning further
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM api_keys WHERE {} = $1 LIMIT 2",
            field.as_str()
        );
        let mut rows = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        match rows.len() {
            0 => Err(StoreError::credential_not_found(value)),
            1 => rows.remove(0).try_into(),
            count => Err(StoreError::Ambiguous {
                field: field.as_str(),
                count,
            }),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<CredentialRecord> {
        let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM api_keys WHERE id = $1");
        sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::credential_not_found(id))?
            .try_into()
    }

    async fn create_with_id(&self, record: &CredentialRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (
                id, name, description, environment, project_id, api_key,
                hashed_secret, user_id, user_email, assigned_at, status, permissions,
                requests_per_minute, requests_per_hour, total_requests, last_used_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.environment)
        .bind(&record.project_id)
        .bind(&record.api_key)
        .bind(&record.hashed_secret)
        .bind(&record.user_id)
        .bind(&record.user_email)
        .bind(record.assigned_at)
        .bind(record.status.as_str())
        .bind(&record.permissions)
        .bind(record.rate_limits.requests_per_minute)
        .bind(record.rate_limits.requests_per_hour)
        .bind(record.usage.total_requests)
        .bind(record.usage.last_used_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn update_fields(
        &self,
        id: Uuid,
        updates: &[FieldUpdate],
        precondition: Precondition,
    ) -> StoreResult<()> {
        if updates.is_empty() {
            return if self.exists(id).await? {
                Ok(())
            } else {
                Err(StoreError::credential_not_found(id))
            };
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE api_keys SET ");
        let mut set = builder.separated(", ");
        for update in updates {
            match update {
                FieldUpdate::UserId(v) => set.push("user_id = ").push_bind_unseparated(v.clone()),
                FieldUpdate::UserEmail(v) => {
                    set.push("user_email = ").push_bind_unseparated(v.clone())
                }
                FieldUpdate::ProjectId(v) => {
                    set.push("project_id = ").push_bind_unseparated(v.clone())
                }
                FieldUpdate::Status(v) => set.push("status = ").push_bind_unseparated(v.as_str()),
                FieldUpdate::AssignedAt(v) => set.push("assigned_at = ").push_bind_unseparated(*v),
                FieldUpdate::UpdatedAt(v) => set.push("updated_at = ").push_bind_unseparated(*v),
                FieldUpdate::LastUsedAt(v) => {
                    set.push("last_used_at = ").push_bind_unseparated(*v)
                }
            };
        }

        builder.push(" WHERE id = ").push_bind(id);
        if precondition == Precondition::UserUnassigned {
            builder.push(" AND user_id IS NULL");
        }

        let affected = builder.build().execute(&self.pool).await?.rows_affected();
        if affected > 0 {
            return Ok(());
        }

        // Nothing matched: either the row is gone or the precondition failed
        if self.exists(id).await? {
            Err(StoreError::Conflict(
                "credential already has a user".to_string(),
            ))
        } else {
            Err(StoreError::credential_not_found(id))
        }
    }

    async fn increment_counter(&self, id: Uuid, counter: Counter) -> StoreResult<()> {
        let sql = match counter {
            Counter::TotalRequests => {
                "UPDATE api_keys SET total_requests = total_requests + 1 WHERE id = $1"
            }
        };

        let affected = sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(StoreError::credential_not_found(id));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Identity directory backed by the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, user_id: &str) -> StoreResult<UserRecord> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, project_id, subdomains FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::user_not_found(user_id))
    }
}
