use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{BagStatus, BloodType};

/// A single donated blood unit with its own lifecycle status.
///
/// Registered in "Pending Testing" after collection; enters the allocatable
/// pool once testing clears it to `Available`. Only `Available` bags may be
/// selected for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodBag {
    pub id: String,
    pub donor_id: String,
    pub health_screening_id: i64,
    pub bank_id: i64,
    pub blood_type: BloodType,
    pub component_type: String,
    pub collection_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: BagStatus,
}

/// Input for registering a collected bag.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBloodBag {
    pub id: String,
    pub donor_id: String,
    pub health_screening_id: i64,
    pub bank_id: i64,
    pub blood_type: BloodType,
    pub component_type: Option<String>,
    pub collection_date: NaiveDate,
    pub expiry_date: NaiveDate,
}
