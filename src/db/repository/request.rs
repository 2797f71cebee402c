use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::{BloodType, Priority, RequestStatus};
use crate::models::{BloodRequest, NewBloodRequest};

const REQUEST_COLUMNS: &str =
    "id, hospital_id, staff_id, patient_name, patient_id, blood_type, units_requested,
     priority, required_by, clinical_notes, special_requirements, status, status_reason,
     created_at, updated_at";

/// Priority rank for staff-facing listings: Emergency > Urgent > Routine,
/// then earliest-created first within a tier.
const PRIORITY_ORDER: &str =
    "CASE priority
        WHEN 'Emergency' THEN 1
        WHEN 'Urgent' THEN 2
        WHEN 'Routine' THEN 3
        ELSE 4
     END, created_at ASC";

pub fn insert_request(
    conn: &Connection,
    req: &NewBloodRequest,
    now: DateTime<Utc>,
) -> Result<BloodRequest, DatabaseError> {
    conn.execute(
        "INSERT INTO blood_requests (hospital_id, staff_id, patient_name, patient_id,
         blood_type, units_requested, priority, required_by, clinical_notes,
         special_requirements, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'Pending', ?11, ?11)",
        params![
            req.hospital_id,
            req.staff_id,
            req.patient_name,
            req.patient_id,
            req.blood_type.as_str(),
            req.units_requested,
            req.priority.as_str(),
            req.required_by,
            req.clinical_notes,
            req.special_requirements.as_ref().map(|v| v.to_string()),
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_request(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "BloodRequest".into(),
        id: id.to_string(),
    })
}

pub fn get_request(conn: &Connection, id: i64) -> Result<Option<BloodRequest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM blood_requests WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], request_row);
    match result {
        Ok(row) => Ok(Some(request_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All requests in staff-listing order, optionally scoped to one hospital.
pub fn list_requests(
    conn: &Connection,
    hospital_id: Option<i64>,
) -> Result<Vec<BloodRequest>, DatabaseError> {
    let (sql, filter) = match hospital_id {
        Some(id) => (
            format!(
                "SELECT {REQUEST_COLUMNS} FROM blood_requests
                 WHERE hospital_id = ?1 ORDER BY {PRIORITY_ORDER}"
            ),
            Some(id),
        ),
        None => (
            format!("SELECT {REQUEST_COLUMNS} FROM blood_requests ORDER BY {PRIORITY_ORDER}"),
            None,
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut requests = Vec::new();
    match filter {
        Some(id) => {
            let rows = stmt.query_map(params![id], request_row)?;
            for row in rows {
                requests.push(request_from_row(row?)?);
            }
        }
        None => {
            let rows = stmt.query_map([], request_row)?;
            for row in rows {
                requests.push(request_from_row(row?)?);
            }
        }
    }
    Ok(requests)
}

/// Set the request status (and optional reason), bumping updated_at.
pub fn update_request_status(
    conn: &Connection,
    id: i64,
    status: RequestStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE blood_requests SET status = ?1, status_reason = ?2, updated_at = ?3 WHERE id = ?4",
        params![status.as_str(), reason, now, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "BloodRequest".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for BloodRequest mapping
struct RequestRow {
    id: i64,
    hospital_id: i64,
    staff_id: String,
    patient_name: String,
    patient_id: String,
    blood_type: String,
    units_requested: u32,
    priority: String,
    required_by: DateTime<Utc>,
    clinical_notes: Option<String>,
    special_requirements: Option<String>,
    status: String,
    status_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        hospital_id: row.get(1)?,
        staff_id: row.get(2)?,
        patient_name: row.get(3)?,
        patient_id: row.get(4)?,
        blood_type: row.get(5)?,
        units_requested: row.get(6)?,
        priority: row.get(7)?,
        required_by: row.get(8)?,
        clinical_notes: row.get(9)?,
        special_requirements: row.get(10)?,
        status: row.get(11)?,
        status_reason: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn request_from_row(row: RequestRow) -> Result<BloodRequest, DatabaseError> {
    Ok(BloodRequest {
        id: row.id,
        hospital_id: row.hospital_id,
        staff_id: row.staff_id,
        patient_name: row.patient_name,
        patient_id: row.patient_id,
        blood_type: BloodType::from_str(&row.blood_type)?,
        units_requested: row.units_requested,
        priority: Priority::from_str(&row.priority)?,
        required_by: row.required_by,
        clinical_notes: row.clinical_notes,
        special_requirements: row
            .special_requirements
            .and_then(|s| serde_json::from_str(&s).ok()),
        status: RequestStatus::from_str(&row.status)?,
        status_reason: row.status_reason,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
