use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Role;

/// Donor or staff member. Hospital staff carry a hospital affiliation,
/// blood-bank staff a bank affiliation; donors carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub contact_phone: Option<String>,
    pub hospital_id: Option<i64>,
    pub bank_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
