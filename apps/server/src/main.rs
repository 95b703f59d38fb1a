//! # Fiado POS Server
//!
//! Entry point: loads configuration, opens the database, and serves the
//! JSON API until a shutdown signal arrives.

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use fiado_core::{Role, User};
use fiado_db::{Database, DbConfig};
use fiado_server::auth::hash_password;
use fiado_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Fiado POS server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        "Configuration loaded"
    );

    // Open the database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    seed_initial_admin(&db).await?;

    let addr = format!("0.0.0.0:{}", config.http_port);
    let state = AppState::new(db, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Creates the first admin account when the user table is empty, so a
/// fresh installation can log in at all.
async fn seed_initial_admin(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    if !db.users().list().await?.is_empty() {
        return Ok(());
    }

    let password = match std::env::var("ADMIN_INITIAL_PASSWORD") {
        Ok(p) => p,
        Err(_) => {
            warn!("ADMIN_INITIAL_PASSWORD not set, using default; change it immediately");
            "admin12345".to_string()
        }
    };

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        display_name: "Administrator".to_string(),
        password_hash: hash_password(&password)?,
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    db.users().insert(&admin).await?;
    info!("Created initial admin account 'admin'");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
