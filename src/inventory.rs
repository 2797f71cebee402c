//! Blood-bag inventory: registration, test clearance, the allocatable pool,
//! stock statistics and the expiry sweep.
//!
//! A bag enters in "Pending Testing" and only joins the allocatable pool
//! once testing clears it. The pool view and the FEFO selection both apply
//! the expiry guard in SQL, so stored status alone never puts a lapsed unit
//! back into circulation.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{BagStatus, BloodType, Role};
use crate::models::{BloodBag, HealthScreening, NewBloodBag, NewHealthScreening};
use crate::workflow::WorkflowError;

/// One cell of the stock overview: how many bags of a type sit in a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryStat {
    pub blood_type: BloodType,
    pub status: BagStatus,
    pub count: u32,
}

/// Register a collected bag. It starts in "Pending Testing" and cannot be
/// allocated until testing clears it.
pub fn register_bag(conn: &Connection, input: &NewBloodBag) -> Result<BloodBag, WorkflowError> {
    if input.id.trim().is_empty() {
        return Err(WorkflowError::Validation("bag id is required".into()));
    }
    if input.expiry_date <= input.collection_date {
        return Err(WorkflowError::Validation(
            "expiry date must be after collection date".into(),
        ));
    }

    repository::insert_bag(conn, input)?;
    tracing::info!(
        bag_id = %input.id,
        blood_type = input.blood_type.as_str(),
        expiry = %input.expiry_date,
        "blood bag registered"
    );

    repository::get_bag(conn, &input.id)?.ok_or(WorkflowError::NotFound {
        entity: "BloodBag",
        id: input.id.clone(),
    })
}

/// Record the testing outcome for a quarantined bag: cleared bags become
/// `Available`, failed bags are discarded.
pub fn record_test_outcome(
    conn: &Connection,
    bag_id: &str,
    passed: bool,
) -> Result<BloodBag, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;

    let bag = repository::get_bag(&tx, bag_id)?.ok_or(WorkflowError::NotFound {
        entity: "BloodBag",
        id: bag_id.into(),
    })?;
    if bag.status != BagStatus::PendingTesting {
        return Err(WorkflowError::InvalidState {
            entity: "BloodBag",
            id: bag_id.into(),
            actual: bag.status.as_str().into(),
            required: "Pending Testing",
        });
    }

    let cleared = if passed { BagStatus::Available } else { BagStatus::Discarded };
    repository::update_bag_status(&tx, bag_id, cleared)?;
    tracing::info!(bag_id, status = cleared.as_str(), "testing outcome recorded");

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(BloodBag { status: cleared, ..bag })
}

/// The allocatable pool in FEFO order: `Available`, in date, optionally one
/// blood type.
pub fn available_inventory(
    conn: &Connection,
    blood_type: Option<BloodType>,
) -> Result<Vec<BloodBag>, DatabaseError> {
    let today = Utc::now().date_naive();
    match blood_type {
        Some(bt) => repository::available_bags(conn, bt, today, None),
        None => repository::available_bags_any_type(conn, today),
    }
}

/// Stock counts grouped by blood type and status, optionally for one bank.
pub fn inventory_stats(
    conn: &Connection,
    bank_id: Option<i64>,
) -> Result<Vec<InventoryStat>, DatabaseError> {
    let sql_all = "SELECT blood_type, status, COUNT(*) FROM blood_bags
                   GROUP BY blood_type, status ORDER BY blood_type, status";
    let sql_bank = "SELECT blood_type, status, COUNT(*) FROM blood_bags WHERE bank_id = ?1
                    GROUP BY blood_type, status ORDER BY blood_type, status";

    let rows: Vec<(String, String, u32)> = match bank_id {
        Some(id) => {
            let mut stmt = conn.prepare(sql_bank)?;
            let rows =
                stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<Result<_, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(sql_all)?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<Result<_, _>>()?
        }
    };

    let mut stats = Vec::with_capacity(rows.len());
    for (blood_type, status, count) in rows {
        stats.push(InventoryStat {
            blood_type: BloodType::from_str(&blood_type)?,
            status: BagStatus::from_str(&status)?,
            count,
        });
    }
    Ok(stats)
}

/// Discard `Available` bags past their expiry date. Returns how many were
/// swept. Reserved or crossmatched units are left to their request's flow.
pub fn discard_expired(conn: &Connection) -> Result<u32, DatabaseError> {
    let today = Utc::now().date_naive();
    let swept = conn.execute(
        "UPDATE blood_bags SET status = 'Discarded'
         WHERE status = 'Available' AND expiry_date < ?1",
        params![today],
    )?;
    if swept > 0 {
        tracing::info!(swept, "expired bags discarded");
    }
    Ok(swept as u32)
}

/// Record a donor's pre-donation screening.
pub fn record_screening(
    conn: &Connection,
    input: &NewHealthScreening,
) -> Result<HealthScreening, WorkflowError> {
    let donor = repository::get_user(conn, &input.donor_id)?.ok_or(WorkflowError::NotFound {
        entity: "User",
        id: input.donor_id.clone(),
    })?;
    if donor.role != Role::Donor {
        return Err(WorkflowError::Validation(format!(
            "user {} is not a donor",
            input.donor_id
        )));
    }
    if !input.is_eligible_on_day && input.deferral_reason.is_none() {
        return Err(WorkflowError::Validation(
            "a deferral reason is required when the donor is not eligible".into(),
        ));
    }

    let screening = repository::insert_screening(conn, input, Utc::now())?;
    tracing::info!(
        screening_id = screening.id,
        donor_id = %screening.donor_id,
        eligible = screening.is_eligible_on_day,
        "health screening recorded"
    );
    Ok(screening)
}

/// Screening history, most recent first, optionally for one donor.
pub fn screening_history(
    conn: &Connection,
    donor_id: Option<&str>,
) -> Result<Vec<HealthScreening>, DatabaseError> {
    repository::list_screenings(conn, donor_id)
}
