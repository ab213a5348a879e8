//! Shared types for the API layer: request context, authenticated
//! user context, and the bearer-token session store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::booking::Actor;
use crate::db::{self, DatabaseError};
use crate::models::enums::Role;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
///
/// Holds the database location (connections are opened per request)
/// and the in-memory session store. No other state survives between
/// requests.
#[derive(Clone)]
pub struct ApiContext {
    db_path: Arc<PathBuf>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path: Arc::new(db_path),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
        }
    }

    /// Open a database connection for this request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }

    /// Look up the session for a bearer token.
    pub fn session_for(&self, token: &str) -> Result<Option<AuthContext>, ApiError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        Ok(sessions.validate(token))
    }

    /// Issue a fresh bearer token for an authenticated user.
    pub fn issue_token(&self, auth: AuthContext) -> Result<String, ApiError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        Ok(sessions.issue(auth))
    }
}

// ═══════════════════════════════════════════════════════════
// Auth context — injected by the auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated user context, injected into request extensions
/// by the auth middleware after successful token validation.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthContext {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role.clone(),
        }
    }

    /// Reject with Forbidden unless the caller has the given role.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Requires {} role",
                role.as_str()
            )))
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Session store — bearer tokens, stored hashed
// ═══════════════════════════════════════════════════════════

/// In-memory session store: SHA-256 token hash → authenticated user.
///
/// Tokens are opaque and never persisted; a restart logs everyone out.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], AuthContext>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Issue a fresh bearer token for a user. Only the hash is kept.
    pub fn issue(&mut self, auth: AuthContext) -> String {
        let token = generate_token();
        self.sessions.insert(hash_token(&token), auth);
        token
    }

    pub fn validate(&self, token: &str) -> Option<AuthContext> {
        self.sessions.get(&hash_token(token)).cloned()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// Password hashing — PBKDF2, PHC string format
// ═══════════════════════════════════════════════════════════

/// PBKDF2 rounds for interactive logins; recorded in the PHC string.
const PBKDF2_ROUNDS: u32 = 10_000;

pub fn hash_password(password: &str) -> Result<String, pbkdf2::password_hash::Error> {
    use pbkdf2::password_hash::rand_core::OsRng;
    use pbkdf2::password_hash::{PasswordHasher, SaltString};
    use pbkdf2::{Params, Pbkdf2};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Pbkdf2.hash_password_customized(
        password.as_bytes(),
        None,
        None,
        Params {
            rounds: PBKDF2_ROUNDS,
            output_length: 32,
        },
        &salt,
    )?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    use pbkdf2::password_hash::{PasswordHash, PasswordVerifier};
    use pbkdf2::Pbkdf2;

    PasswordHash::new(stored)
        .map(|parsed| Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}
