use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{BloodType, Priority, RequestStatus};

/// A hospital's request for blood units on behalf of a patient.
///
/// Created in `Pending`; advanced by blood-bank staff through the
/// allocation/crossmatch/dispatch workflow, or closed by the hospital
/// (cancel, confirm-received).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: i64,
    pub hospital_id: i64,
    pub staff_id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub blood_type: BloodType,
    pub units_requested: u32,
    pub priority: Priority,
    pub required_by: DateTime<Utc>,
    pub clinical_notes: Option<String>,
    /// Free-form flags from the ordering hospital (irradiated, CMV-negative, ...).
    pub special_requirements: Option<serde_json::Value>,
    pub status: RequestStatus,
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a request (id, status and timestamps are assigned on insert).
#[derive(Debug, Clone, Deserialize)]
pub struct NewBloodRequest {
    pub hospital_id: i64,
    pub staff_id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub blood_type: BloodType,
    pub units_requested: u32,
    pub priority: Priority,
    pub required_by: DateTime<Utc>,
    pub clinical_notes: Option<String>,
    pub special_requirements: Option<serde_json::Value>,
}
