//! Blood-request intake and staff-facing views.
//!
//! Creation with input validation, the priority-ordered listing used by
//! blood-bank staff, and the request counters shown on dashboards. Status
//! transitions live in the workflow module.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{BloodRequest, NewBloodRequest};
use crate::workflow::WorkflowError;

/// Request counters for a dashboard header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStats {
    pub pending: u32,
    pub approved: u32,
    pub total: u32,
}

/// Create a request in `Pending` after validating the input.
pub fn create_request(
    conn: &Connection,
    input: &NewBloodRequest,
) -> Result<BloodRequest, WorkflowError> {
    if input.units_requested < 1 {
        return Err(WorkflowError::Validation(
            "units_requested must be at least 1".into(),
        ));
    }
    if input.patient_name.trim().is_empty() || input.patient_id.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "patient name and patient id are required".into(),
        ));
    }

    let request = repository::insert_request(conn, input, chrono::Utc::now())?;
    tracing::info!(
        request_id = request.id,
        blood_type = request.blood_type.as_str(),
        units = request.units_requested,
        priority = request.priority.as_str(),
        "blood request created"
    );
    Ok(request)
}

/// Requests in staff-listing order (priority rank, then earliest created),
/// optionally scoped to one hospital.
pub fn list_requests(
    conn: &Connection,
    hospital_id: Option<i64>,
) -> Result<Vec<BloodRequest>, DatabaseError> {
    repository::list_requests(conn, hospital_id)
}

/// Pending / approved / total counters. "Approved" counts requests that
/// made it past crossmatch: Allocated, Issued or Fulfilled.
pub fn request_stats(
    conn: &Connection,
    hospital_id: Option<i64>,
) -> Result<RequestStats, DatabaseError> {
    let sql_all = "SELECT status, COUNT(*) FROM blood_requests GROUP BY status";
    let sql_hospital =
        "SELECT status, COUNT(*) FROM blood_requests WHERE hospital_id = ?1 GROUP BY status";

    let counts: Vec<(String, u32)> = match hospital_id {
        Some(id) => {
            let mut stmt = conn.prepare(sql_hospital)?;
            let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<_, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(sql_all)?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<_, _>>()?
        }
    };

    let mut stats = RequestStats {
        pending: 0,
        approved: 0,
        total: 0,
    };
    for (status, count) in counts {
        stats.total += count;
        match status.as_str() {
            "Pending" => stats.pending += count,
            "Allocated" | "Issued" | "Fulfilled" => stats.approved += count,
            _ => {}
        }
    }

    Ok(stats)
}
