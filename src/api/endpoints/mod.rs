//! API endpoint handlers.
//!
//! Handlers stay thin: parse and authorize, then call into the booking
//! core or the repositories.

pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;

use uuid::Uuid;

use crate::api::error::ApiError;

/// Parse a path id, rejecting malformed values with a 400 instead of
/// letting them fall through to a not-found lookup.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} id")))
}
