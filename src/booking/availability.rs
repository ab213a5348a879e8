//! Slot availability — which of a doctor's catalog slots are still
//! bookable on a given date.

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::DayOfWeek;

use super::BookingError;

/// Result of a slot availability query for one doctor on one date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub available: bool,
    pub available_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Compute the bookable slots for a doctor on a date.
///
/// Read-only. Unapproved doctors are invisible to booking, so they
/// resolve to `DoctorNotFound` just like absent ones.
pub fn resolve(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
) -> Result<SlotAvailability, BookingError> {
    let doctor = repository::doctor::get_doctor(conn, doctor_id).map_err(|e| match e {
        DatabaseError::NotFound { .. } => BookingError::DoctorNotFound,
        other => other.into(),
    })?;
    if !doctor.approved {
        return Err(BookingError::DoctorNotFound);
    }

    let day = DayOfWeek::from_date(date);
    if !doctor.is_available_on(&day) {
        return Ok(SlotAvailability {
            available: false,
            available_slots: Vec::new(),
            message: Some(format!("Doctor is not available on {}", day.as_str())),
        });
    }

    let booked: HashSet<String> = repository::appointment::booked_slots(conn, doctor_id, date)?
        .into_iter()
        .collect();

    Ok(SlotAvailability {
        available: true,
        available_slots: free_slots(&doctor.available_time_slots, &booked),
        message: None,
    })
}

/// Catalog minus booked set, catalog order preserved.
fn free_slots(catalog: &[String], booked: &HashSet<String>) -> Vec<String> {
    catalog
        .iter()
        .filter(|slot| !booked.contains(*slot))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::{seed_doctor, seed_user};
    use crate::models::enums::{AppointmentStatus, Role};
    use crate::models::Appointment;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn book_slot(
        conn: &Connection,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: &str,
        status: AppointmentStatus,
    ) {
        repository::appointment::insert_appointment(
            conn,
            &Appointment {
                id: Uuid::new_v4(),
                patient_id,
                doctor_id,
                date,
                time_slot: slot.to_string(),
                reason: "checkup".to_string(),
                notes: None,
                status,
                created_at: Utc::now(),
            },
        )
        .unwrap();
    }

    #[test]
    fn unavailable_weekday_yields_empty_list_with_message() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday, DayOfWeek::Wednesday],
            &["09:00", "10:00"],
            true,
        );

        let result = resolve(&conn, &doctor.id, tuesday()).unwrap();
        assert!(!result.available);
        assert!(result.available_slots.is_empty());
        assert_eq!(
            result.message.as_deref(),
            Some("Doctor is not available on Tuesday")
        );
    }

    #[test]
    fn full_catalog_when_nothing_is_booked() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday],
            &["09:00", "10:00", "11:00"],
            true,
        );

        let result = resolve(&conn, &doctor.id, monday()).unwrap();
        assert!(result.available);
        assert_eq!(result.available_slots, vec!["09:00", "10:00", "11:00"]);
        assert!(result.message.is_none());
    }

    #[test]
    fn booked_slots_are_subtracted_in_catalog_order() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "p@example.com");
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday],
            &["09:00", "10:00", "11:00", "14:00"],
            true,
        );

        book_slot(&conn, patient.id, doctor.id, monday(), "10:00", AppointmentStatus::Pending);
        book_slot(&conn, patient.id, doctor.id, monday(), "14:00", AppointmentStatus::Confirmed);

        let result = resolve(&conn, &doctor.id, monday()).unwrap();
        assert_eq!(result.available_slots, vec!["09:00", "11:00"]);
    }

    #[test]
    fn inactive_bookings_do_not_hide_slots() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "p@example.com");
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday],
            &["09:00", "10:00"],
            true,
        );

        book_slot(&conn, patient.id, doctor.id, monday(), "09:00", AppointmentStatus::Cancelled);
        book_slot(&conn, patient.id, doctor.id, monday(), "10:00", AppointmentStatus::Completed);

        let result = resolve(&conn, &doctor.id, monday()).unwrap();
        assert_eq!(result.available_slots, vec!["09:00", "10:00"]);
    }

    #[test]
    fn bookings_on_another_date_do_not_interfere() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "p@example.com");
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday],
            &["09:00"],
            true,
        );

        let next_monday = monday().checked_add_days(chrono::Days::new(7)).unwrap();
        book_slot(&conn, patient.id, doctor.id, next_monday, "09:00", AppointmentStatus::Pending);

        let result = resolve(&conn, &doctor.id, monday()).unwrap();
        assert_eq!(result.available_slots, vec!["09:00"]);
    }

    #[test]
    fn unknown_doctor_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = resolve(&conn, &Uuid::new_v4(), monday()).unwrap_err();
        assert!(matches!(err, BookingError::DoctorNotFound));
    }

    #[test]
    fn unapproved_doctor_is_invisible() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], false);

        let err = resolve(&conn, &doctor.id, monday()).unwrap_err();
        assert!(matches!(err, BookingError::DoctorNotFound));
    }

    #[test]
    fn free_slots_preserves_catalog_order() {
        let catalog: Vec<String> = ["14:00", "09:00", "11:00"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let booked: HashSet<String> = ["09:00".to_string()].into_iter().collect();
        assert_eq!(free_slots(&catalog, &booked), vec!["14:00", "11:00"]);
    }
}
