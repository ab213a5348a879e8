use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DayOfWeek;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    pub experience: u32,
    pub qualifications: Vec<String>,
    pub bio: String,
    pub consultation_fee: f64,
    /// Named weekdays on which the doctor accepts bookings.
    pub available_days: Vec<DayOfWeek>,
    /// Fixed catalog of slot labels (e.g. "09:00"), order significant.
    pub available_time_slots: Vec<String>,
    /// Unapproved doctors are invisible to booking.
    pub approved: bool,
    pub profile_image: String,
}

impl Doctor {
    pub fn is_available_on(&self, day: &DayOfWeek) -> bool {
        self.available_days.contains(day)
    }

    pub fn has_slot(&self, slot: &str) -> bool {
        self.available_time_slots.iter().any(|s| s == slot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    /// 1–5, validated at the API boundary and by a table constraint.
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
