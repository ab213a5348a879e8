pub mod repository;
pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Malformed JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("An active booking already holds this doctor/date/time slot")]
    SlotOccupied,

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether `err` is a UNIQUE violation on the given index.
    pub(crate) fn is_unique_violation(err: &rusqlite::Error, index: &str) -> bool {
        match err {
            rusqlite::Error::SqliteFailure(e, Some(msg)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(index)
            }
            _ => false,
        }
    }
}
