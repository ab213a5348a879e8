use chrono::Utc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use medibook::api::server::start_server;
use medibook::api::types::{hash_password, ApiContext};
use medibook::config;
use medibook::db;
use medibook::db::repository;
use medibook::models::enums::Role;
use medibook::models::User;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::db_path();
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Cannot create data directory {}: {e}", parent.display());
            std::process::exit(1);
        }
    }

    // Open once at startup: runs migrations and fails fast on a bad file
    let conn = match db::open_database(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Cannot open database {}: {e}", db_path.display());
            std::process::exit(1);
        }
    };
    tracing::info!(path = %db_path.display(), "Database ready");

    if let Err(e) = seed_admin(&conn) {
        tracing::error!("Admin seeding failed: {e}");
        std::process::exit(1);
    }
    drop(conn);

    let ctx = ApiContext::new(db_path);
    let mut server = match start_server(ctx, config::bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
}

/// Create the admin account from `MEDIBOOK_ADMIN_EMAIL`/`_PASSWORD`
/// when configured and not already present.
fn seed_admin(conn: &rusqlite::Connection) -> Result<(), String> {
    let Some((email, password)) = config::admin_seed() else {
        return Ok(());
    };

    if repository::user::get_user_by_email(conn, &email)
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Ok(());
    }

    let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".to_string(),
        email,
        password_hash: hash_password(&password).map_err(|e| e.to_string())?,
        role: Role::Admin,
        created_at: Utc::now(),
    };
    repository::user::insert_user(conn, &admin).map_err(|e| e.to_string())?;
    tracing::info!(email = %admin.email, "Admin account seeded");
    Ok(())
}
