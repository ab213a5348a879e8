use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Medibook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bind address used when `MEDIBOOK_ADDR` is unset.
const DEFAULT_ADDR: &str = "127.0.0.1:5000";

/// SPA origin allowed by CORS when `MEDIBOOK_CORS_ORIGIN` is unset.
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Get the application data directory
/// ~/Medibook/ on all platforms (user-visible, holds the database file)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Medibook")
}

/// Database file path. `MEDIBOOK_DB` overrides the default location.
pub fn db_path() -> PathBuf {
    match std::env::var("MEDIBOOK_DB") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("medibook.db"),
    }
}

/// Address the HTTP server binds to. `MEDIBOOK_ADDR` overrides the default.
pub fn bind_addr() -> SocketAddr {
    let raw = std::env::var("MEDIBOOK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(addr = %raw, "Invalid MEDIBOOK_ADDR, using default");
        DEFAULT_ADDR.parse().expect("default bind address is valid")
    })
}

/// Browser origin the CORS layer allows.
pub fn cors_origin() -> String {
    std::env::var("MEDIBOOK_CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string())
}

/// Admin seed credentials, if configured.
///
/// `MEDIBOOK_ADMIN_EMAIL` + `MEDIBOOK_ADMIN_PASSWORD` create an admin
/// account at startup when no user with that email exists yet.
pub fn admin_seed() -> Option<(String, String)> {
    let email = std::env::var("MEDIBOOK_ADMIN_EMAIL").ok()?;
    let password = std::env::var("MEDIBOOK_ADMIN_PASSWORD").ok()?;
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some((email, password))
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medibook=info,tower_http=warn"
}
