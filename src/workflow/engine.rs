//! Allocation engine: moves a `Pending` request to crossmatch-ready,
//! partially fulfilled, or escalated, based on current inventory.
//!
//! Selection is FEFO — units closest to expiry go out first to minimize
//! wastage. Selection and reservation happen inside one immediate
//! transaction: each chosen bag is re-validated as still `Available` at the
//! moment it is flipped to `Reserved`, and any miss aborts the whole
//! operation so two requests can never hold the same unit.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::error::WorkflowError;
use super::types::WorkflowOutcome;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{BagStatus, RequestStatus};

/// Process a pending request against available inventory.
///
/// Outcome by suitable-unit count S versus requested N:
/// - S == 0: request escalates to donor sourcing, nothing reserved
/// - S >= N: first N units reserved, request awaits crossmatch
/// - 0 < S < N: all S reserved, request partially fulfilled with the
///   shortfall reported as remaining units
///
/// Only `Pending` requests may be processed; a second call finds the request
/// advanced and fails, which is what prevents double-reservation by replay.
pub fn process_request(
    conn: &Connection,
    request_id: i64,
) -> Result<WorkflowOutcome, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;

    let outcome = allocate(&tx, request_id, Utc::now())?;

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(outcome)
}

fn allocate(
    tx: &Transaction<'_>,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<WorkflowOutcome, WorkflowError> {
    let request = repository::get_request(tx, request_id)?.ok_or(WorkflowError::NotFound {
        entity: "BloodRequest",
        id: request_id.to_string(),
    })?;

    if request.status != RequestStatus::Pending {
        return Err(WorkflowError::InvalidState {
            entity: "BloodRequest",
            id: request_id.to_string(),
            actual: request.status.as_str().into(),
            required: "Pending",
        });
    }

    let requested = request.units_requested;
    let candidates = repository::available_bags(
        tx,
        request.blood_type,
        now.date_naive(),
        Some(requested),
    )?;

    if candidates.is_empty() {
        repository::update_request_status(
            tx,
            request_id,
            RequestStatus::EscalatedToDonors,
            Some("No compatible units in inventory"),
            now,
        )?;
        tracing::info!(request_id, blood_type = request.blood_type.as_str(), "no available units; escalated to donor sourcing");
        return Ok(WorkflowOutcome::with_units(
            "No compatible units available; request escalated to donor sourcing",
            RequestStatus::EscalatedToDonors,
            0,
            requested,
            Vec::new(),
        ));
    }

    let mut allocated = Vec::with_capacity(candidates.len());
    for bag in &candidates {
        let reserved =
            repository::transition_bag_status(tx, &bag.id, BagStatus::Available, BagStatus::Reserved)?;
        if !reserved {
            // Another allocation took the bag between selection and reserve.
            // Returning drops the transaction and rolls everything back.
            return Err(WorkflowError::Conflict {
                bag_id: bag.id.clone(),
            });
        }
        repository::insert_allocation(tx, request_id, &bag.id, now)?;
        allocated.push(bag.id.clone());
    }

    let fulfilled = allocated.len() as u32;
    let remaining = requested - fulfilled;

    let (status, message) = if remaining == 0 {
        (
            RequestStatus::PendingCrossmatch,
            format!("Reserved {fulfilled} unit(s); request is ready for crossmatch"),
        )
    } else {
        (
            RequestStatus::PartiallyFulfilled,
            format!(
                "Reserved {fulfilled} of {requested} unit(s); remaining demand escalated to donor sourcing"
            ),
        )
    };

    repository::update_request_status(tx, request_id, status, None, now)?;
    tracing::info!(
        request_id,
        fulfilled,
        remaining,
        status = status.as_str(),
        "allocation complete"
    );

    Ok(WorkflowOutcome::with_units(
        message, status, fulfilled, remaining, allocated,
    ))
}
