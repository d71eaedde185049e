//! Application configuration management.
//!
//! Configuration is read from environment variables (after an optional `.env`
//! file) and deserialized into [`Config`] with the `envy` crate.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT`: HTTP port, defaults to 8081
/// - `DATABASE_MAX_CONNECTIONS`: pool size, defaults to 5
/// - `USAGE_QUEUE_CAPACITY`: pending usage records before new ones are dropped, defaults to 1024
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: secret
///   hashing cost, defaults to the Argon2id recommended parameters (19456, 2, 1)
/// - `ADMIN_TENANT_SCOPED`: whether admin routes require a permitted tenant, defaults to true
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_usage_queue_capacity")]
    pub usage_queue_capacity: usize,

    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    #[serde(default = "default_true")]
    pub admin_tenant_scoped: bool,
}

fn default_port() -> u16 {
    8081
}

fn default_max_connections() -> u32 {
    5
}

fn default_usage_queue_capacity() -> usize {
    1024
}

fn default_argon2_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_argon2_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_argon2_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its field type.
    pub fn from_env() -> Result<Self, envy::Error> {
        // A missing .env file is fine
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}
