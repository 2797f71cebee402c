use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::LinkState;
use crate::models::BagAllocation;

const ALLOCATION_COLUMNS: &str =
    "id, request_id, bag_id, state, crossmatch_result, created_at, updated_at";

/// Create a Reserved link between a request and a bag.
///
/// The partial unique index on active links makes this fail if the bag is
/// already bound to another request.
pub fn insert_allocation(
    conn: &Connection,
    request_id: i64,
    bag_id: &str,
    now: DateTime<Utc>,
) -> Result<BagAllocation, DatabaseError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO bag_allocations (id, request_id, bag_id, state, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'Reserved', ?4, ?4)",
        params![id.to_string(), request_id, bag_id, now],
    )?;

    Ok(BagAllocation {
        id,
        request_id,
        bag_id: bag_id.into(),
        state: LinkState::Reserved,
        crossmatch_result: None,
        created_at: now,
        updated_at: now,
    })
}

/// The active link between this request and this bag, if any.
pub fn find_active_allocation(
    conn: &Connection,
    request_id: i64,
    bag_id: &str,
) -> Result<Option<BagAllocation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALLOCATION_COLUMNS} FROM bag_allocations
         WHERE request_id = ?1 AND bag_id = ?2
           AND state IN ('Reserved', 'Crossmatched', 'Issued')"
    ))?;

    let result = stmt.query_row(params![request_id, bag_id], allocation_row);
    match result {
        Ok(row) => Ok(Some(allocation_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All links still binding bags to this request.
pub fn active_allocations_for_request(
    conn: &Connection,
    request_id: i64,
) -> Result<Vec<BagAllocation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALLOCATION_COLUMNS} FROM bag_allocations
         WHERE request_id = ?1 AND state IN ('Reserved', 'Crossmatched', 'Issued')
         ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![request_id], allocation_row)?;
    let mut allocations = Vec::new();
    for row in rows {
        allocations.push(allocation_from_row(row?)?);
    }
    Ok(allocations)
}

/// Full link history for a request, oldest first.
pub fn allocations_for_request(
    conn: &Connection,
    request_id: i64,
) -> Result<Vec<BagAllocation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALLOCATION_COLUMNS} FROM bag_allocations
         WHERE request_id = ?1 ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![request_id], allocation_row)?;
    let mut allocations = Vec::new();
    for row in rows {
        allocations.push(allocation_from_row(row?)?);
    }
    Ok(allocations)
}

pub fn update_allocation_state(
    conn: &Connection,
    id: Uuid,
    state: LinkState,
    crossmatch_result: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE bag_allocations
         SET state = ?1, crossmatch_result = COALESCE(?2, crossmatch_result), updated_at = ?3
         WHERE id = ?4",
        params![state.as_str(), crossmatch_result, now, id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "BagAllocation".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for BagAllocation mapping
struct AllocationRow {
    id: String,
    request_id: i64,
    bag_id: String,
    state: String,
    crossmatch_result: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn allocation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AllocationRow> {
    Ok(AllocationRow {
        id: row.get(0)?,
        request_id: row.get(1)?,
        bag_id: row.get(2)?,
        state: row.get(3)?,
        crossmatch_result: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn allocation_from_row(row: AllocationRow) -> Result<BagAllocation, DatabaseError> {
    Ok(BagAllocation {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        request_id: row.request_id,
        bag_id: row.bag_id,
        state: LinkState::from_str(&row.state)?,
        crossmatch_result: row.crossmatch_result,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
