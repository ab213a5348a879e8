use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Doctor, Review};

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, specialization, experience, qualifications, bio,
         consultation_fee, available_days, available_time_slots, approved, profile_image)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.specialization,
            doctor.experience,
            serde_json::to_string(&doctor.qualifications)?,
            doctor.bio,
            doctor.consultation_fee,
            serde_json::to_string(&doctor.available_days)?,
            serde_json::to_string(&doctor.available_time_slots)?,
            doctor.approved as i32,
            doctor.profile_image,
        ],
    )?;
    Ok(())
}

/// Update the doctor-editable profile fields. Approval is not touched here.
pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let n = conn.execute(
        "UPDATE doctors SET specialization = ?2, experience = ?3, qualifications = ?4,
         bio = ?5, consultation_fee = ?6, available_days = ?7, available_time_slots = ?8,
         profile_image = ?9
         WHERE id = ?1",
        params![
            doctor.id.to_string(),
            doctor.specialization,
            doctor.experience,
            serde_json::to_string(&doctor.qualifications)?,
            doctor.bio,
            doctor.consultation_fee,
            serde_json::to_string(&doctor.available_days)?,
            serde_json::to_string(&doctor.available_time_slots)?,
            doctor.profile_image,
        ],
    )?;
    if n == 0 {
        return Err(DatabaseError::not_found("Doctor", doctor.id));
    }
    Ok(())
}

pub fn set_approved(conn: &Connection, id: &Uuid, approved: bool) -> Result<(), DatabaseError> {
    let n = conn.execute(
        "UPDATE doctors SET approved = ?2 WHERE id = ?1",
        params![id.to_string(), approved as i32],
    )?;
    if n == 0 {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{DOCTOR_SELECT} WHERE id = ?1"))?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(doctor_row(row)));
    match result {
        Ok(row) => doctor_from_row(row?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatabaseError::not_found("Doctor", id)),
        Err(e) => Err(e.into()),
    }
}

pub fn get_doctor_by_user(conn: &Connection, user_id: &Uuid) -> Result<Doctor, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{DOCTOR_SELECT} WHERE user_id = ?1"))?;

    let result = stmt.query_row(params![user_id.to_string()], |row| Ok(doctor_row(row)));
    match result {
        Ok(row) => doctor_from_row(row?),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("Doctor profile for user", user_id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Doctor joined with the owning user's name/email and the derived rating.
///
/// The rating is never stored: it is the mean of the review rows at read
/// time, 0 when the doctor has no reviews yet.
#[derive(Debug, Clone)]
pub struct DoctorWithUser {
    pub doctor: Doctor,
    pub name: String,
    pub email: String,
    pub rating: f64,
}

pub fn list_approved(conn: &Connection) -> Result<Vec<DoctorWithUser>, DatabaseError> {
    list_where(conn, "WHERE d.approved = 1")
}

/// All doctors including unapproved ones, for the admin panel.
pub fn list_all(conn: &Connection) -> Result<Vec<DoctorWithUser>, DatabaseError> {
    list_where(conn, "")
}

pub fn get_doctor_with_user(conn: &Connection, id: &Uuid) -> Result<DoctorWithUser, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{JOINED_SELECT} WHERE d.id = ?1"))?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(joined_row(row)));
    match result {
        Ok(row) => joined_from_row(row?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatabaseError::not_found("Doctor", id)),
        Err(e) => Err(e.into()),
    }
}

fn list_where(conn: &Connection, filter: &str) -> Result<Vec<DoctorWithUser>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{JOINED_SELECT} {filter} ORDER BY u.name"))?;

    let rows = stmt.query_map([], |row| Ok(joined_row(row)))?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(joined_from_row(row??)?);
    }
    Ok(doctors)
}

// ── Reviews ─────────────────────────────────────────────────

pub fn insert_review(conn: &Connection, review: &Review) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reviews (id, doctor_id, patient_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            review.id.to_string(),
            review.doctor_id.to_string(),
            review.patient_id.to_string(),
            review.rating,
            review.comment,
            review.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        if DatabaseError::is_unique_violation(&e, "idx_reviews_doctor_patient") {
            DatabaseError::ConstraintViolation("patient has already reviewed this doctor".into())
        } else {
            e.into()
        }
    })?;
    Ok(())
}

pub fn has_reviewed(
    conn: &Connection,
    doctor_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE doctor_id = ?1 AND patient_id = ?2",
        params![doctor_id.to_string(), patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Mean review rating, `None` when the doctor has no reviews.
pub fn doctor_rating(conn: &Connection, doctor_id: &Uuid) -> Result<Option<f64>, DatabaseError> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(rating) FROM reviews WHERE doctor_id = ?1",
        params![doctor_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(avg)
}

/// A review joined with the reviewer's display name.
#[derive(Debug, Clone)]
pub struct ReviewWithPatient {
    pub review: Review,
    pub patient_name: String,
}

pub fn reviews_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<ReviewWithPatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.doctor_id, r.patient_id, r.rating, r.comment, r.created_at, u.name
         FROM reviews r
         JOIN users u ON u.id = r.patient_id
         WHERE r.doctor_id = ?1
         ORDER BY r.created_at DESC",
    )?;

    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut reviews = Vec::new();
    for row in rows {
        let (id, doctor_id, patient_id, rating, comment, created_at, patient_name) = row?;
        reviews.push(ReviewWithPatient {
            review: Review {
                id: Uuid::parse_str(&id).unwrap_or_default(),
                doctor_id: Uuid::parse_str(&doctor_id).unwrap_or_default(),
                patient_id: Uuid::parse_str(&patient_id).unwrap_or_default(),
                rating: rating.clamp(1, 5) as u8,
                comment,
                created_at: parse_timestamp(&created_at),
            },
            patient_name,
        });
    }
    Ok(reviews)
}

// ── Row mapping ─────────────────────────────────────────────

const DOCTOR_SELECT: &str = "SELECT id, user_id, specialization, experience, qualifications, bio,
         consultation_fee, available_days, available_time_slots, approved, profile_image
         FROM doctors";

const JOINED_SELECT: &str = "SELECT d.id, d.user_id, d.specialization, d.experience, d.qualifications, d.bio,
         d.consultation_fee, d.available_days, d.available_time_slots, d.approved, d.profile_image,
         u.name, u.email,
         (SELECT AVG(r.rating) FROM reviews r WHERE r.doctor_id = d.id)
         FROM doctors d
         JOIN users u ON u.id = d.user_id";

struct DoctorRow {
    id: String,
    user_id: String,
    specialization: String,
    experience: i64,
    qualifications: String,
    bio: String,
    consultation_fee: f64,
    available_days: String,
    available_time_slots: String,
    approved: i64,
    profile_image: String,
}

fn doctor_row(row: &rusqlite::Row<'_>) -> Result<DoctorRow, rusqlite::Error> {
    Ok(DoctorRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        specialization: row.get(2)?,
        experience: row.get(3)?,
        qualifications: row.get(4)?,
        bio: row.get(5)?,
        consultation_fee: row.get(6)?,
        available_days: row.get(7)?,
        available_time_slots: row.get(8)?,
        approved: row.get(9)?,
        profile_image: row.get(10)?,
    })
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
        specialization: row.specialization,
        experience: row.experience.max(0) as u32,
        qualifications: serde_json::from_str(&row.qualifications)?,
        bio: row.bio,
        consultation_fee: row.consultation_fee,
        available_days: serde_json::from_str(&row.available_days)?,
        available_time_slots: serde_json::from_str(&row.available_time_slots)?,
        approved: row.approved != 0,
        profile_image: row.profile_image,
    })
}

fn joined_row(
    row: &rusqlite::Row<'_>,
) -> Result<(DoctorRow, String, String, Option<f64>), rusqlite::Error> {
    Ok((doctor_row(row)?, row.get(11)?, row.get(12)?, row.get(13)?))
}

fn joined_from_row(
    (row, name, email, rating): (DoctorRow, String, String, Option<f64>),
) -> Result<DoctorWithUser, DatabaseError> {
    Ok(DoctorWithUser {
        doctor: doctor_from_row(row)?,
        name,
        email,
        rating: rating.unwrap_or(0.0),
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::{seed_doctor, seed_user};
    use crate::models::enums::{DayOfWeek, Role};

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(
            &conn,
            "doc@example.com",
            &[DayOfWeek::Monday, DayOfWeek::Wednesday],
            &["09:00", "10:00"],
            true,
        );

        let loaded = get_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(loaded.specialization, "Cardiology");
        assert_eq!(loaded.available_days, doctor.available_days);
        assert_eq!(loaded.available_time_slots, vec!["09:00", "10:00"]);
        assert!(loaded.approved);
    }

    #[test]
    fn list_approved_hides_unapproved() {
        let conn = open_memory_database().unwrap();
        seed_doctor(&conn, "approved@example.com", &[DayOfWeek::Monday], &["09:00"], true);
        seed_doctor(&conn, "hidden@example.com", &[DayOfWeek::Monday], &["09:00"], false);

        let listed = list_approved(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].email, "approved@example.com");

        let all = list_all(&conn).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn approve_unknown_doctor_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = set_approved(&conn, &Uuid::new_v4(), true).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn update_profile_persists_fields() {
        let conn = open_memory_database().unwrap();
        let mut doctor = seed_doctor(&conn, "doc@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        doctor.specialization = "Dermatology".into();
        doctor.available_time_slots = vec!["14:00".into(), "15:00".into()];
        update_doctor(&conn, &doctor).unwrap();

        let loaded = get_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(loaded.specialization, "Dermatology");
        assert_eq!(loaded.available_time_slots, vec!["14:00", "15:00"]);
    }

    fn review(doctor_id: Uuid, patient_id: Uuid, rating: u8) -> Review {
        Review {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            rating,
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rating_is_mean_of_reviews() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(&conn, "doc@example.com", &[DayOfWeek::Monday], &["09:00"], true);
        let p1 = seed_user(&conn, Role::Patient, "p1@example.com");
        let p2 = seed_user(&conn, Role::Patient, "p2@example.com");

        assert_eq!(doctor_rating(&conn, &doctor.id).unwrap(), None);

        insert_review(&conn, &review(doctor.id, p1.id, 4)).unwrap();
        insert_review(&conn, &review(doctor.id, p2.id, 5)).unwrap();

        assert_eq!(doctor_rating(&conn, &doctor.id).unwrap(), Some(4.5));
        let joined = get_doctor_with_user(&conn, &doctor.id).unwrap();
        assert_eq!(joined.rating, 4.5);
    }

    #[test]
    fn second_review_by_same_patient_rejected() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(&conn, "doc@example.com", &[DayOfWeek::Monday], &["09:00"], true);
        let patient = seed_user(&conn, Role::Patient, "p@example.com");

        insert_review(&conn, &review(doctor.id, patient.id, 5)).unwrap();
        assert!(has_reviewed(&conn, &doctor.id, &patient.id).unwrap());

        let err = insert_review(&conn, &review(doctor.id, patient.id, 1)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        // The first rating stands
        assert_eq!(doctor_rating(&conn, &doctor.id).unwrap(), Some(5.0));
    }

    #[test]
    fn reviews_carry_reviewer_name() {
        let conn = open_memory_database().unwrap();
        let doctor = seed_doctor(&conn, "doc@example.com", &[DayOfWeek::Monday], &["09:00"], true);
        let patient = seed_user(&conn, Role::Patient, "amina@example.com");

        insert_review(&conn, &review(doctor.id, patient.id, 3)).unwrap();

        let reviews = reviews_for_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].patient_name, "amina");
        assert_eq!(reviews[0].review.rating, 3);
    }
}
