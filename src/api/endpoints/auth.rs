//! Authentication endpoints.
//!
//! `POST /api/auth/register` — create a patient or doctor account
//! `POST /api/auth/login` — exchange credentials for a bearer token
//!
//! Tokens are opaque session tokens held in memory; registering as a
//! doctor also creates an unapproved, empty doctor profile to be
//! filled in via `PUT /api/doctors/profile`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{hash_password, verify_password, ApiContext, AuthContext};
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::{Doctor, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of a user account.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// `POST /api/auth/register` — create an account.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (name, email, password) = match (&request.name, &request.email, &request.password) {
        (Some(n), Some(e), Some(p)) if !n.is_empty() && !e.is_empty() && !p.is_empty() => {
            (n.clone(), e.clone(), p.clone())
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide all required fields".into(),
            ))
        }
    };

    // Self-registration is for patients and doctors; admins are seeded.
    let role = match request.role.as_deref() {
        None | Some("patient") => Role::Patient,
        Some("doctor") => Role::Doctor,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Invalid role: {other}")));
        }
    };

    let conn = ctx.open_db()?;
    if repository::user::get_user_by_email(&conn, &email)?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&password)
            .map_err(|e| ApiError::Internal(format!("password hash: {e}")))?,
        role: role.clone(),
        created_at: Utc::now(),
    };
    repository::user::insert_user(&conn, &user)?;

    if role == Role::Doctor {
        let profile = Doctor {
            id: Uuid::new_v4(),
            user_id: user.id,
            specialization: "General".to_string(),
            experience: 0,
            qualifications: Vec::new(),
            bio: String::new(),
            consultation_fee: 0.0,
            available_days: Vec::new(),
            available_time_slots: Vec::new(),
            approved: false,
            profile_image: String::new(),
        };
        repository::doctor::insert_doctor(&conn, &profile)?;
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    let token = ctx.issue_token(AuthContext {
        user_id: user.id,
        name: user.name.clone(),
        role: user.role.clone(),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserInfo::from(&user),
        }),
    ))
}

/// `POST /api/auth/login` — exchange credentials for a bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, password) = match (&request.email, &request.password) {
        (Some(e), Some(p)) => (e.clone(), p.clone()),
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide all required fields".into(),
            ))
        }
    };

    let conn = ctx.open_db()?;
    let user = repository::user::get_user_by_email(&conn, &email)?
        .ok_or_else(|| ApiError::BadRequest("Invalid email or password".into()))?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::BadRequest("Invalid email or password".into()));
    }

    let token = ctx.issue_token(AuthContext {
        user_id: user.id,
        name: user.name.clone(),
        role: user.role.clone(),
    })?;

    Ok(Json(AuthResponse {
        token,
        user: UserInfo::from(&user),
    }))
}
