//! Appointment endpoints.
//!
//! - `GET  /api/appointments/slots/:doctor_id/:date` — bookable slots
//! - `POST /api/appointments/book` — patient books a slot
//! - `GET  /api/appointments/patient` — caller's appointments (patient)
//! - `GET  /api/appointments/doctor` — caller's appointments (doctor)
//! - `GET  /api/appointments/:id` — full record for a party/admin
//! - `PUT  /api/appointments/{cancel,confirm,complete}/:id` — lifecycle

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::booking::{availability, lifecycle, parse_date};
use crate::db::repository;
use crate::db::repository::appointment::{
    AppointmentDetail, DoctorAppointment, PatientAppointment,
};
use crate::models::enums::Role;
use crate::models::Appointment;

/// `GET /api/appointments/slots/:doctor_id/:date` — bookable slots for
/// a doctor on a date. Public: patients browse before logging in.
pub async fn slots(
    State(ctx): State<ApiContext>,
    Path((doctor_id, date)): Path<(String, String)>,
) -> Result<Json<availability::SlotAvailability>, ApiError> {
    let doctor_id = parse_id(&doctor_id, "doctor")?;
    let date = parse_date(&date)?;

    let conn = ctx.open_db()?;
    let result = availability::resolve(&conn, &doctor_id, date)?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub message: String,
    pub appointment: Appointment,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /api/appointments/book` — book an appointment (patient).
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    auth.require_role(Role::Patient)?;

    let (doctor_id, date, time_slot, reason) = match (
        &request.doctor_id,
        &request.date,
        &request.time_slot,
        &request.reason,
    ) {
        (Some(d), Some(dt), Some(t), Some(r)) => (d, dt, t, r),
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide all required fields".into(),
            ))
        }
    };

    let booking = lifecycle::BookingRequest {
        doctor_id: parse_id(doctor_id, "doctor")?,
        date: parse_date(date)?,
        time_slot: time_slot.clone(),
        reason: reason.clone(),
        notes: request.notes.clone(),
    };

    let conn = ctx.open_db()?;
    let appointment = lifecycle::book(&conn, &auth.user_id, &booking)?;

    Ok((
        StatusCode::CREATED,
        Json(BookResponse {
            message: "Appointment booked successfully".into(),
            appointment,
        }),
    ))
}

/// `GET /api/appointments/patient` — caller's appointments, doctor
/// fields joined in, ordered by date.
pub async fn patient_list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PatientAppointment>>, ApiError> {
    auth.require_role(Role::Patient)?;

    let conn = ctx.open_db()?;
    let appointments = repository::appointment::list_for_patient(&conn, &auth.user_id)?;
    Ok(Json(appointments))
}

/// `GET /api/appointments/doctor` — caller's appointments, patient
/// fields joined in, ordered by date.
pub async fn doctor_list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<DoctorAppointment>>, ApiError> {
    auth.require_role(Role::Doctor)?;

    let conn = ctx.open_db()?;
    let doctor = repository::doctor::get_doctor_by_user(&conn, &auth.user_id)
        .map_err(|_| ApiError::NotFound("Doctor profile not found".into()))?;
    let appointments = repository::appointment::list_for_doctor(&conn, &doctor.id)?;
    Ok(Json(appointments))
}

/// `GET /api/appointments/:id` — the full joined record, visible only
/// to the appointment's parties and admins.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentDetail>, ApiError> {
    let appointment_id = parse_id(&id, "appointment")?;
    let conn = ctx.open_db()?;

    let appointment = repository::appointment::get_appointment(&conn, &appointment_id)
        .map_err(|_| ApiError::NotFound("Appointment not found".into()))?;
    let doctor = repository::doctor::get_doctor(&conn, &appointment.doctor_id)?;

    if !lifecycle::may_view(&auth.actor(), &appointment, &doctor) {
        return Err(ApiError::Forbidden("Not a party to this appointment".into()));
    }

    let detail = repository::appointment::get_appointment_detail(&conn, &appointment_id)?;
    Ok(Json(detail))
}

/// `PUT /api/appointments/cancel/:id` — owning patient or admin.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let appointment_id = parse_id(&id, "appointment")?;
    let conn = ctx.open_db()?;
    lifecycle::cancel(&conn, &appointment_id, &auth.actor())?;
    Ok(Json(MessageResponse {
        message: "Appointment cancelled successfully".into(),
    }))
}

/// `PUT /api/appointments/confirm/:id` — assigned doctor or admin.
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let appointment_id = parse_id(&id, "appointment")?;
    let conn = ctx.open_db()?;
    lifecycle::confirm(&conn, &appointment_id, &auth.actor())?;
    Ok(Json(MessageResponse {
        message: "Appointment confirmed successfully".into(),
    }))
}

/// `PUT /api/appointments/complete/:id` — assigned doctor or admin.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let appointment_id = parse_id(&id, "appointment")?;
    let conn = ctx.open_db()?;
    lifecycle::complete(&conn, &appointment_id, &auth.actor())?;
    Ok(Json(MessageResponse {
        message: "Appointment marked as completed".into(),
    }))
}
