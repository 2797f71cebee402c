use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pre-donation health screening outcome recorded by blood-bank staff.
/// Bags reference the screening their donation was collected under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScreening {
    pub id: i64,
    pub donor_id: String,
    pub bank_id: i64,
    pub staff_id: String,
    pub screening_date: DateTime<Utc>,
    pub weight: Option<f64>,
    pub blood_pressure: Option<String>,
    pub hemoglobin_level: Option<f64>,
    pub temperature: Option<f64>,
    pub deferral_reason: Option<String>,
    pub is_eligible_on_day: bool,
}

/// Input for recording a screening (id and date assigned on insert).
#[derive(Debug, Clone, Deserialize)]
pub struct NewHealthScreening {
    pub donor_id: String,
    pub bank_id: i64,
    pub staff_id: String,
    pub weight: Option<f64>,
    pub blood_pressure: Option<String>,
    pub hemoglobin_level: Option<f64>,
    pub temperature: Option<f64>,
    pub deferral_reason: Option<String>,
    pub is_eligible_on_day: bool,
}
