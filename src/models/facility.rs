use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodBank {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_phone: Option<String>,
    pub operating_hours: Option<String>,
}
