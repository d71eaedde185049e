//! API Key Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Parse the command line and load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Either issue a privileged key and exit, or:
//! 4. Start the usage recorder worker
//! 5. Build HTTP router with routes and middleware
//! 6. Serve until the process is stopped

use std::{sync::Arc, time::Duration};

use api_key_service::{
    app::{self, AppState, RouterOptions},
    auth::{hasher::SecretHasher, tenant::TenantScope},
    cli::{Cli, Commands},
    config::{self, Config},
    db,
    models::api_key::CreateApiKeyRequest,
    services::{key_service, usage_recorder::UsageRecorder},
    store::{
        CredentialStore, UserDirectory,
        postgres::{PgCredentialStore, PgUserDirectory},
    },
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let hasher = SecretHasher::with_params(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
    )?;

    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));
    let directory: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, store, directory, hasher).await,
        Commands::IssueAdminKey {
            name,
            user_id,
            permissions,
        } => {
            let request = CreateApiKeyRequest {
                name,
                description: "Issued from the command line".to_string(),
                user_id,
                environment: String::new(),
                permissions,
                rate_limits: None,
            };
            let issued =
                key_service::issue_key(store.as_ref(), directory.as_ref(), &hasher, request)
                    .await?;

            println!("id:         {}", issued.record.id);
            println!("api_key:    {}", issued.record.api_key);
            println!("api_secret: {}", issued.secret);
            println!("permissions: {}", issued.record.permissions.join(", "));
            Ok(())
        }
    }
}

async fn serve(
    config: &Config,
    store: Arc<dyn CredentialStore>,
    directory: Arc<dyn UserDirectory>,
    hasher: SecretHasher,
) -> anyhow::Result<()> {
    let (usage, usage_worker) = UsageRecorder::spawn(store.clone(), config.usage_queue_capacity);

    let options = RouterOptions {
        admin_tenant_scope: if config.admin_tenant_scoped {
            TenantScope::Required
        } else {
            TenantScope::Unscoped
        },
    };
    let app = app::router(AppState::new(store, directory, hasher, usage), options);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // The router held the last recorder handles; give the worker a moment to drain
    if tokio::time::timeout(Duration::from_secs(5), usage_worker)
        .await
        .is_err()
    {
        tracing::warn!("Usage recorder did not drain before shutdown");
    }

    Ok(())
}
