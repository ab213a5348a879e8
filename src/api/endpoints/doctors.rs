//! Doctor directory endpoints.
//!
//! Public browsing plus doctor profile management, patient reviews and
//! the admin approval gate:
//! - `GET  /api/doctors` — approved doctors
//! - `GET  /api/doctors/:id` — doctor with reviews
//! - `PUT  /api/doctors/profile` — doctor updates own profile
//! - `POST /api/doctors/:id/reviews` — patient adds a review
//! - `GET  /api/doctors/admin/all` — admin: all doctors
//! - `PUT  /api/doctors/admin/approve/:id` — admin: approve

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::db::repository::doctor::DoctorWithUser;
use crate::models::enums::{DayOfWeek, Role};
use crate::models::Review;

/// A doctor as shown to browsing patients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub experience: u32,
    pub qualifications: Vec<String>,
    pub bio: String,
    pub consultation_fee: f64,
    pub available_days: Vec<DayOfWeek>,
    pub available_time_slots: Vec<String>,
    pub approved: bool,
    pub rating: f64,
    pub profile_image: String,
}

impl From<DoctorWithUser> for DoctorInfo {
    fn from(joined: DoctorWithUser) -> Self {
        Self {
            id: joined.doctor.id,
            name: joined.name,
            email: joined.email,
            specialization: joined.doctor.specialization,
            experience: joined.doctor.experience,
            qualifications: joined.doctor.qualifications,
            bio: joined.doctor.bio,
            consultation_fee: joined.doctor.consultation_fee,
            available_days: joined.doctor.available_days,
            available_time_slots: joined.doctor.available_time_slots,
            approved: joined.doctor.approved,
            rating: joined.rating,
            profile_image: joined.doctor.profile_image,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInfo {
    pub patient_name: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DoctorDetail {
    #[serde(flatten)]
    pub info: DoctorInfo,
    pub reviews: Vec<ReviewInfo>,
}

/// `GET /api/doctors` — list approved doctors.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<DoctorInfo>>, ApiError> {
    let conn = ctx.open_db()?;
    let doctors = repository::doctor::list_approved(&conn)?;
    Ok(Json(doctors.into_iter().map(DoctorInfo::from).collect()))
}

/// `GET /api/doctors/:id` — doctor profile with reviews.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DoctorDetail>, ApiError> {
    let doctor_id = parse_id(&id, "doctor")?;
    let conn = ctx.open_db()?;

    let joined = repository::doctor::get_doctor_with_user(&conn, &doctor_id)
        .map_err(|_| ApiError::NotFound("Doctor not found".into()))?;
    let reviews = repository::doctor::reviews_for_doctor(&conn, &doctor_id)?
        .into_iter()
        .map(|r| ReviewInfo {
            patient_name: r.patient_name,
            rating: r.review.rating,
            comment: r.review.comment,
            created_at: r.review.created_at,
        })
        .collect();

    Ok(Json(DoctorDetail {
        info: DoctorInfo::from(joined),
        reviews,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub specialization: Option<String>,
    pub experience: Option<u32>,
    pub qualifications: Option<Vec<String>>,
    pub bio: Option<String>,
    pub consultation_fee: Option<f64>,
    pub available_days: Option<Vec<String>>,
    pub available_time_slots: Option<Vec<String>>,
    pub profile_image: Option<String>,
}

/// `PUT /api/doctors/profile` — doctor updates own profile.
///
/// Absent fields keep their current values. Weekday names and the fee
/// are validated before anything is written.
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<DoctorInfo>, ApiError> {
    auth.require_role(Role::Doctor)?;

    let conn = ctx.open_db()?;
    let mut doctor = repository::doctor::get_doctor_by_user(&conn, &auth.user_id)
        .map_err(|_| ApiError::NotFound("Doctor profile not found".into()))?;

    if let Some(days) = &request.available_days {
        let parsed: Result<Vec<DayOfWeek>, _> =
            days.iter().map(|d| DayOfWeek::from_str(d)).collect();
        doctor.available_days =
            parsed.map_err(|_| ApiError::BadRequest("Invalid weekday name".into()))?;
    }
    if let Some(fee) = request.consultation_fee {
        if fee < 0.0 {
            return Err(ApiError::BadRequest(
                "Consultation fee cannot be negative".into(),
            ));
        }
        doctor.consultation_fee = fee;
    }
    if let Some(specialization) = request.specialization {
        doctor.specialization = specialization;
    }
    if let Some(experience) = request.experience {
        doctor.experience = experience;
    }
    if let Some(qualifications) = request.qualifications {
        doctor.qualifications = qualifications;
    }
    if let Some(bio) = request.bio {
        doctor.bio = bio;
    }
    if let Some(slots) = request.available_time_slots {
        doctor.available_time_slots = slots;
    }
    if let Some(image) = request.profile_image {
        doctor.profile_image = image;
    }

    repository::doctor::update_doctor(&conn, &doctor)?;

    let joined = repository::doctor::get_doctor_with_user(&conn, &doctor.id)?;
    Ok(Json(DoctorInfo::from(joined)))
}

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /api/doctors/:id/reviews` — patient reviews a doctor.
///
/// One review per (doctor, patient); the doctor's rating is always the
/// mean over the full review set, so it is simply re-read after insert.
pub async fn add_review(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    auth.require_role(Role::Patient)?;

    let doctor_id = parse_id(&id, "doctor")?;
    let rating = match request.rating {
        Some(r) if (1..=5).contains(&r) => r as u8,
        Some(_) => {
            return Err(ApiError::BadRequest("Rating must be between 1 and 5".into()));
        }
        None => return Err(ApiError::BadRequest("Rating is required".into())),
    };

    let conn = ctx.open_db()?;
    repository::doctor::get_doctor(&conn, &doctor_id)
        .map_err(|_| ApiError::NotFound("Doctor not found".into()))?;

    if repository::doctor::has_reviewed(&conn, &doctor_id, &auth.user_id)? {
        return Err(ApiError::BadRequest(
            "You have already reviewed this doctor".into(),
        ));
    }

    repository::doctor::insert_review(
        &conn,
        &Review {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id: auth.user_id,
            rating,
            comment: request.comment,
            created_at: Utc::now(),
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Review added successfully".into(),
        }),
    ))
}

/// `GET /api/doctors/admin/all` — all doctors, including unapproved.
pub async fn admin_all(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<DoctorInfo>>, ApiError> {
    auth.require_role(Role::Admin)?;

    let conn = ctx.open_db()?;
    let doctors = repository::doctor::list_all(&conn)?;
    Ok(Json(doctors.into_iter().map(DoctorInfo::from).collect()))
}

/// `PUT /api/doctors/admin/approve/:id` — approve a doctor.
pub async fn admin_approve(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.require_role(Role::Admin)?;

    let doctor_id = parse_id(&id, "doctor")?;
    let conn = ctx.open_db()?;
    repository::doctor::set_approved(&conn, &doctor_id, true)
        .map_err(|_| ApiError::NotFound("Doctor not found".into()))?;

    tracing::info!(doctor_id = %doctor_id, "Doctor approved");
    Ok(Json(MessageResponse {
        message: "Doctor approved successfully".into(),
    }))
}
