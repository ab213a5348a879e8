use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

use super::doctor::parse_timestamp;

/// Insert a new appointment.
///
/// The partial unique index over active rows turns a lost
/// check-then-insert race into `SlotOccupied` instead of a double booking.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, time_slot, reason, notes,
         status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.date.to_string(),
            appt.time_slot,
            appt.reason,
            appt.notes,
            appt.status.as_str(),
            appt.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        if DatabaseError::is_unique_violation(&e, "idx_appointments_active_slot") {
            DatabaseError::SlotOccupied
        } else {
            e.into()
        }
    })?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, date, time_slot, reason, notes, status, created_at
         FROM appointments WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
        ))
    });

    match result {
        Ok((id, patient_id, doctor_id, date, time_slot, reason, notes, status, created_at)) => {
            Ok(Appointment {
                id: Uuid::parse_str(&id).unwrap_or_default(),
                patient_id: Uuid::parse_str(&patient_id).unwrap_or_default(),
                doctor_id: Uuid::parse_str(&doctor_id).unwrap_or_default(),
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
                time_slot,
                reason,
                notes,
                status: AppointmentStatus::from_str(&status)?,
                created_at: parse_timestamp(&created_at),
            })
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("Appointment", id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Time slots held by active appointments for a doctor on a date.
pub fn booked_slots(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT time_slot FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND status IN ('pending', 'confirmed')",
    )?;

    let rows = stmt.query_map(params![doctor_id.to_string(), date.to_string()], |row| {
        row.get(0)
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    status: &AppointmentStatus,
) -> Result<(), DatabaseError> {
    let n = conn.execute(
        "UPDATE appointments SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if n == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

// ── Joined listings ─────────────────────────────────────────

/// A patient's appointment with the doctor's details joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    pub id: Uuid,
    pub doctor_name: String,
    pub doctor_email: String,
    pub doctor_specialization: String,
    pub doctor_image: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

pub fn list_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, u.name, u.email, d.specialization, d.profile_image,
                a.date, a.time_slot, a.reason, a.notes, a.status, a.created_at
         FROM appointments a
         JOIN doctors d ON d.id = a.doctor_id
         JOIN users u ON u.id = d.user_id
         WHERE a.patient_id = ?1
         ORDER BY a.date, a.time_slot",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
        ))
    })?;

    let mut appointments = Vec::new();
    for row in rows {
        let (id, name, email, specialization, image, date, time_slot, reason, notes, status, created_at) =
            row?;
        appointments.push(PatientAppointment {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            doctor_name: name,
            doctor_email: email,
            doctor_specialization: specialization,
            doctor_image: image,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
            time_slot,
            reason,
            notes,
            status: AppointmentStatus::from_str(&status)?,
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(appointments)
}

/// A doctor's appointment with the patient's details joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointment {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

pub fn list_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<DoctorAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, u.name, u.email, a.date, a.time_slot, a.reason, a.notes, a.status, a.created_at
         FROM appointments a
         JOIN users u ON u.id = a.patient_id
         WHERE a.doctor_id = ?1
         ORDER BY a.date, a.time_slot",
    )?;

    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, String>(8)?,
        ))
    })?;

    let mut appointments = Vec::new();
    for row in rows {
        let (id, name, email, date, time_slot, reason, notes, status, created_at) = row?;
        appointments.push(DoctorAppointment {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            patient_name: name,
            patient_email: email,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
            time_slot,
            reason,
            notes,
            status: AppointmentStatus::from_str(&status)?,
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(appointments)
}

/// Fully joined record for the single-appointment view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub doctor_email: String,
    pub doctor_specialization: String,
    pub doctor_image: String,
    pub consultation_fee: f64,
    pub date: NaiveDate,
    pub time_slot: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

pub fn get_appointment_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<AppointmentDetail, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, pu.name, pu.email, du.name, du.email, d.specialization, d.profile_image,
                d.consultation_fee, a.date, a.time_slot, a.reason, a.notes, a.status, a.created_at
         FROM appointments a
         JOIN users pu ON pu.id = a.patient_id
         JOIN doctors d ON d.id = a.doctor_id
         JOIN users du ON du.id = d.user_id
         WHERE a.id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, f64>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
            row.get::<_, Option<String>>(11)?,
            row.get::<_, String>(12)?,
            row.get::<_, String>(13)?,
        ))
    });

    match result {
        Ok((
            id,
            patient_name,
            patient_email,
            doctor_name,
            doctor_email,
            specialization,
            image,
            fee,
            date,
            time_slot,
            reason,
            notes,
            status,
            created_at,
        )) => Ok(AppointmentDetail {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            patient_name,
            patient_email,
            doctor_name,
            doctor_email,
            doctor_specialization: specialization,
            doctor_image: image,
            consultation_fee: fee,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
            time_slot,
            reason,
            notes,
            status: AppointmentStatus::from_str(&status)?,
            created_at: parse_timestamp(&created_at),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("Appointment", id))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::{seed_doctor, seed_user};
    use crate::models::enums::{DayOfWeek, Role};

    fn appointment(
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: &str,
        status: AppointmentStatus,
    ) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            date,
            time_slot: slot.to_string(),
            reason: "checkup".to_string(),
            notes: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "p@example.com");
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        let appt = appointment(patient.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending);
        insert_appointment(&conn, &appt).unwrap();

        let loaded = get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(loaded.date, monday());
        assert_eq!(loaded.time_slot, "09:00");
        assert_eq!(loaded.status, AppointmentStatus::Pending);
        assert_eq!(loaded.patient_id, patient.id);
    }

    #[test]
    fn second_active_booking_for_same_slot_is_rejected() {
        let conn = open_memory_database().unwrap();
        let p1 = seed_user(&conn, Role::Patient, "p1@example.com");
        let p2 = seed_user(&conn, Role::Patient, "p2@example.com");
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        insert_appointment(
            &conn,
            &appointment(p1.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap();

        // The constraint fires even without any application-level pre-check
        let err = insert_appointment(
            &conn,
            &appointment(p2.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::SlotOccupied));
    }

    #[test]
    fn cancelled_booking_frees_the_slot() {
        let conn = open_memory_database().unwrap();
        let p1 = seed_user(&conn, Role::Patient, "p1@example.com");
        let p2 = seed_user(&conn, Role::Patient, "p2@example.com");
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        let first = appointment(p1.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending);
        insert_appointment(&conn, &first).unwrap();
        update_status(&conn, &first.id, &AppointmentStatus::Cancelled).unwrap();

        insert_appointment(
            &conn,
            &appointment(p2.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap();
    }

    #[test]
    fn completed_booking_does_not_occupy_the_slot() {
        let conn = open_memory_database().unwrap();
        let p1 = seed_user(&conn, Role::Patient, "p1@example.com");
        let p2 = seed_user(&conn, Role::Patient, "p2@example.com");
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        insert_appointment(
            &conn,
            &appointment(p1.id, doctor.id, monday(), "09:00", AppointmentStatus::Completed),
        )
        .unwrap();
        insert_appointment(
            &conn,
            &appointment(p2.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap();
    }

    #[test]
    fn booked_slots_sees_only_active_rows() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "p@example.com");
        let doctor = seed_doctor(
            &conn,
            "d@example.com",
            &[DayOfWeek::Monday],
            &["09:00", "10:00", "11:00"],
            true,
        );

        insert_appointment(
            &conn,
            &appointment(patient.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap();
        insert_appointment(
            &conn,
            &appointment(patient.id, doctor.id, monday(), "10:00", AppointmentStatus::Cancelled),
        )
        .unwrap();
        insert_appointment(
            &conn,
            &appointment(patient.id, doctor.id, monday(), "11:00", AppointmentStatus::Confirmed),
        )
        .unwrap();

        let mut booked = booked_slots(&conn, &doctor.id, monday()).unwrap();
        booked.sort();
        assert_eq!(booked, vec!["09:00", "11:00"]);

        // Different date, nothing booked
        let other = monday().succ_opt().unwrap();
        assert!(booked_slots(&conn, &doctor.id, other).unwrap().is_empty());
    }

    #[test]
    fn listings_join_and_order_by_date() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "amina@example.com");
        let doctor = seed_doctor(&conn, "d@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        let later = monday().checked_add_days(chrono::Days::new(7)).unwrap();
        insert_appointment(
            &conn,
            &appointment(patient.id, doctor.id, later, "09:00", AppointmentStatus::Pending),
        )
        .unwrap();
        insert_appointment(
            &conn,
            &appointment(patient.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending),
        )
        .unwrap();

        let mine = list_for_patient(&conn, &patient.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].date, monday());
        assert_eq!(mine[1].date, later);
        assert_eq!(mine[0].doctor_specialization, "Cardiology");

        let theirs = list_for_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(theirs.len(), 2);
        assert_eq!(theirs[0].patient_name, "amina");
    }

    #[test]
    fn detail_joins_both_parties() {
        let conn = open_memory_database().unwrap();
        let patient = seed_user(&conn, Role::Patient, "amina@example.com");
        let doctor = seed_doctor(&conn, "doc@example.com", &[DayOfWeek::Monday], &["09:00"], true);

        let appt = appointment(patient.id, doctor.id, monday(), "09:00", AppointmentStatus::Pending);
        insert_appointment(&conn, &appt).unwrap();

        let detail = get_appointment_detail(&conn, &appt.id).unwrap();
        assert_eq!(detail.patient_email, "amina@example.com");
        assert_eq!(detail.doctor_email, "doc@example.com");
        assert_eq!(detail.consultation_fee, 150.0);
        assert_eq!(detail.date, monday());
    }

    #[test]
    fn update_status_unknown_id_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_status(&conn, &Uuid::new_v4(), &AppointmentStatus::Cancelled).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
