//! PostgreSQL pool and schema setup for the credential and user tables.

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

pub type DbPool = Pool<Postgres>;

/// Opens the pool shared by [`PgCredentialStore`](crate::store::postgres::PgCredentialStore)
/// and [`PgUserDirectory`](crate::store::postgres::PgUserDirectory).
///
/// Store calls get no deadline of their own; a call that cannot get a
/// connection fails with the pool's acquire timeout and surfaces to callers as
/// a transient failure.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Creates or upgrades `api_keys` and `users`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
