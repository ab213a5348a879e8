//! Booking core — slot availability resolution and the appointment
//! lifecycle state machine.
//!
//! Everything here operates on a borrowed `Connection`; HTTP concerns
//! (status codes, auth extraction) stay in the `api` layer.

pub mod availability;
pub mod lifecycle;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, Role};

/// Authenticated actor attempting a booking operation.
///
/// Role is explicit and travels with the id into every lifecycle
/// operation; permission checks are a table over (operation, role,
/// ownership), never duck-typed.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Not allowed to {action} this appointment")]
    Forbidden { action: &'static str },

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Cannot {} an appointment that is {}", .action, .from.as_str())]
    InvalidTransition {
        action: &'static str,
        from: AppointmentStatus,
    },

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for BookingError {
    fn from(err: DatabaseError) -> Self {
        match err {
            // The storage-level uniqueness guarantee reports as a conflict
            DatabaseError::SlotOccupied => BookingError::SlotTaken,
            other => BookingError::Database(other),
        }
    }
}

/// Parse an inbound date value to the canonical date-only key.
///
/// Accepts plain `YYYY-MM-DD` or an RFC 3339 datetime; the time of day
/// and offset are dropped, so every caller lands on the same conflict
/// key regardless of which form the client sent.
pub fn parse_date(input: &str) -> Result<NaiveDate, BookingError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Ok(dt.date_naive());
    }
    Err(BookingError::Validation(format!("Invalid date: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_date_parses() {
        let date = parse_date("2025-03-03").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    }

    #[test]
    fn rfc3339_datetime_normalizes_to_date() {
        let date = parse_date("2025-03-03T14:30:00Z").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    }

    #[test]
    fn both_forms_land_on_the_same_key() {
        assert_eq!(
            parse_date("2025-03-03").unwrap(),
            parse_date("2025-03-03T23:59:59+05:30").unwrap()
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_date("next tuesday"),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            parse_date("03/03/2025"),
            Err(BookingError::Validation(_))
        ));
    }
}
