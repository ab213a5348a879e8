//! Appointment lifecycle — creation and status transitions.
//!
//! State machine: pending → confirmed → completed, with cancellation
//! reachable from pending or confirmed. Completed and cancelled are
//! terminal. Who may trigger what is an explicit permission table:
//!
//! | transition | patient (owner) | doctor (assigned) | admin |
//! |------------|-----------------|-------------------|-------|
//! | cancel     | yes             | no                | yes   |
//! | confirm    | no              | yes               | yes   |
//! | complete   | no              | yes               | yes   |

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, DayOfWeek, Role};
use crate::models::{Appointment, Doctor};

use super::{Actor, BookingError};

/// A status-changing operation on an existing appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Complete,
    Cancel,
}

impl Transition {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }

    fn target(&self) -> AppointmentStatus {
        match self {
            Self::Confirm => AppointmentStatus::Confirmed,
            Self::Complete => AppointmentStatus::Completed,
            Self::Cancel => AppointmentStatus::Cancelled,
        }
    }

    /// Statuses the transition may legally start from.
    fn allowed_from(&self, from: &AppointmentStatus) -> bool {
        matches!(
            (self, from),
            (Self::Confirm, AppointmentStatus::Pending)
                | (Self::Complete, AppointmentStatus::Confirmed)
                | (Self::Cancel, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
        )
    }
}

/// Permission table for lifecycle transitions.
fn permitted(transition: Transition, actor: &Actor, appt: &Appointment, doctor: &Doctor) -> bool {
    match (&actor.role, transition) {
        (Role::Admin, _) => true,
        (Role::Patient, Transition::Cancel) => actor.id == appt.patient_id,
        (Role::Doctor, Transition::Confirm | Transition::Complete) => actor.id == doctor.user_id,
        _ => false,
    }
}

/// Whether the actor may read the full appointment record.
pub fn may_view(actor: &Actor, appt: &Appointment, doctor: &Doctor) -> bool {
    match &actor.role {
        Role::Admin => true,
        Role::Patient => actor.id == appt.patient_id,
        Role::Doctor => actor.id == doctor.user_id,
    }
}

/// Validated input for a new booking.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub reason: String,
    pub notes: Option<String>,
}

/// Book an appointment for a patient.
///
/// Re-validates the doctor's weekday/catalog availability and the slot's
/// freedom at write time. The pre-check gives precise errors; the partial
/// unique index makes the insert itself the authoritative conflict check,
/// so a concurrent booker loses with `SlotTaken` rather than silently
/// double-booking.
pub fn book(
    conn: &Connection,
    patient_id: &Uuid,
    request: &BookingRequest,
) -> Result<Appointment, BookingError> {
    if request.time_slot.trim().is_empty() {
        return Err(BookingError::Validation("timeSlot is required".into()));
    }
    if request.reason.trim().is_empty() {
        return Err(BookingError::Validation("reason is required".into()));
    }

    let doctor = approved_doctor(conn, &request.doctor_id)?;

    let day = DayOfWeek::from_date(request.date);
    if !doctor.is_available_on(&day) {
        return Err(BookingError::Validation(format!(
            "Doctor is not available on {}",
            day.as_str()
        )));
    }
    if !doctor.has_slot(&request.time_slot) {
        return Err(BookingError::Validation(format!(
            "\"{}\" is not one of the doctor's time slots",
            request.time_slot
        )));
    }

    let booked = repository::appointment::booked_slots(conn, &doctor.id, request.date)?;
    if booked.iter().any(|slot| slot == &request.time_slot) {
        return Err(BookingError::SlotTaken);
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        doctor_id: doctor.id,
        date: request.date,
        time_slot: request.time_slot.clone(),
        reason: request.reason.clone(),
        notes: request.notes.clone(),
        status: AppointmentStatus::Pending,
        created_at: Utc::now(),
    };
    repository::appointment::insert_appointment(conn, &appointment)?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %doctor.id,
        date = %appointment.date,
        slot = %appointment.time_slot,
        "Appointment booked"
    );
    Ok(appointment)
}

pub fn cancel(conn: &Connection, id: &Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
    apply(conn, id, actor, Transition::Cancel)
}

pub fn confirm(conn: &Connection, id: &Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
    apply(conn, id, actor, Transition::Confirm)
}

pub fn complete(conn: &Connection, id: &Uuid, actor: &Actor) -> Result<Appointment, BookingError> {
    apply(conn, id, actor, Transition::Complete)
}

/// Apply a lifecycle transition: ownership first, then legality, then
/// the single status write. Appointments are never deleted.
fn apply(
    conn: &Connection,
    id: &Uuid,
    actor: &Actor,
    transition: Transition,
) -> Result<Appointment, BookingError> {
    let mut appointment =
        repository::appointment::get_appointment(conn, id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => BookingError::AppointmentNotFound,
            other => other.into(),
        })?;
    let doctor = repository::doctor::get_doctor(conn, &appointment.doctor_id)
        .map_err(BookingError::from)?;

    if !permitted(transition, actor, &appointment, &doctor) {
        return Err(BookingError::Forbidden {
            action: transition.verb(),
        });
    }
    if !transition.allowed_from(&appointment.status) {
        return Err(BookingError::InvalidTransition {
            action: transition.verb(),
            from: appointment.status,
        });
    }

    appointment.status = transition.target();
    repository::appointment::update_status(conn, id, &appointment.status)?;

    tracing::info!(
        appointment_id = %appointment.id,
        status = appointment.status.as_str(),
        "Appointment status changed"
    );
    Ok(appointment)
}

fn approved_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Doctor, BookingError> {
    let doctor = repository::doctor::get_doctor(conn, doctor_id).map_err(|e| match e {
        DatabaseError::NotFound { .. } => BookingError::DoctorNotFound,
        other => other.into(),
    })?;
    if !doctor.approved {
        return Err(BookingError::DoctorNotFound);
    }
    Ok(doctor)
}
