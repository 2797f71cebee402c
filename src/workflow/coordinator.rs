//! Crossmatch/dispatch coordination: advances an allocated request through
//! crossmatch confirmation and physical dispatch, and closes requests out
//! (reject, cancel, receipt confirmation).
//!
//! Bag status and request status always move together inside one
//! transaction, and every terminal transition settles the request's
//! remaining allocation links: unsent units go back to `Available`,
//! received units forward to `Used`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::error::WorkflowError;
use super::types::WorkflowOutcome;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{BagStatus, LinkState, RequestStatus};
use crate::models::BloodRequest;

/// Record a crossmatch outcome for a unit reserved against this request.
///
/// Compatible: bag → Crossmatched, request → Allocated. Incompatible: the
/// bag returns to the pool (it must pass the expiry check again before any
/// re-selection) and the request escalates to donor sourcing.
pub fn confirm_crossmatch(
    conn: &Connection,
    request_id: i64,
    bag_id: &str,
    successful: bool,
) -> Result<WorkflowOutcome, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;
    let now = Utc::now();

    let request = fetch_request(&tx, request_id)?;
    require_status(
        &request,
        &[
            RequestStatus::PendingCrossmatch,
            RequestStatus::PartiallyFulfilled,
            RequestStatus::Allocated,
        ],
        "Pending_Crossmatch, Partially_Fulfilled or Allocated",
    )?;
    let link = fetch_link(&tx, &request, bag_id, LinkState::Reserved, "a Reserved unit for this request")?;

    let outcome = if successful {
        if !repository::transition_bag_status(&tx, bag_id, BagStatus::Reserved, BagStatus::Crossmatched)? {
            return Err(WorkflowError::Conflict { bag_id: bag_id.into() });
        }
        repository::update_allocation_state(&tx, link.id, LinkState::Crossmatched, Some("Compatible"), now)?;
        repository::update_request_status(&tx, request_id, RequestStatus::Allocated, None, now)?;
        tracing::info!(request_id, bag_id, "crossmatch compatible; unit allocated");
        WorkflowOutcome::new(
            format!("Crossmatch compatible; unit {bag_id} allocated"),
            RequestStatus::Allocated,
        )
    } else {
        if !repository::transition_bag_status(&tx, bag_id, BagStatus::Reserved, BagStatus::Available)? {
            return Err(WorkflowError::Conflict { bag_id: bag_id.into() });
        }
        repository::update_allocation_state(&tx, link.id, LinkState::Released, Some("Incompatible"), now)?;
        repository::update_request_status(
            &tx,
            request_id,
            RequestStatus::EscalatedToDonors,
            Some("Crossmatch incompatible"),
            now,
        )?;
        tracing::warn!(request_id, bag_id, "crossmatch incompatible; unit returned to pool");
        WorkflowOutcome::new(
            format!("Crossmatch incompatible; unit {bag_id} returned to the pool"),
            RequestStatus::EscalatedToDonors,
        )
    };

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(outcome)
}

/// Send a crossmatched unit out to the hospital.
pub fn dispatch_bag(
    conn: &Connection,
    request_id: i64,
    bag_id: &str,
) -> Result<WorkflowOutcome, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;
    let now = Utc::now();

    let request = fetch_request(&tx, request_id)?;
    require_status(&request, &[RequestStatus::Allocated], "Allocated")?;
    let link = fetch_link(&tx, &request, bag_id, LinkState::Crossmatched, "a Crossmatched unit for this request")?;

    if !repository::transition_bag_status(&tx, bag_id, BagStatus::Crossmatched, BagStatus::Issued)? {
        return Err(WorkflowError::Conflict { bag_id: bag_id.into() });
    }
    repository::update_allocation_state(&tx, link.id, LinkState::Issued, None, now)?;
    repository::update_request_status(&tx, request_id, RequestStatus::Issued, None, now)?;
    tracing::info!(request_id, bag_id, "unit dispatched to hospital");

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(WorkflowOutcome::new(
        format!("Unit {bag_id} dispatched to hospital"),
        RequestStatus::Issued,
    ))
}

/// Blood-bank rejection. Any units still held for the request go back to
/// the pool.
pub fn reject_request(
    conn: &Connection,
    request_id: i64,
    reason: &str,
) -> Result<WorkflowOutcome, WorkflowError> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::Validation("rejection reason is required".into()));
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;
    let now = Utc::now();

    let request = fetch_request(&tx, request_id)?;
    require_status(
        &request,
        &[
            RequestStatus::Pending,
            RequestStatus::PendingCrossmatch,
            RequestStatus::Allocated,
        ],
        "Pending, Pending_Crossmatch or Allocated",
    )?;

    let released = release_held_units(&tx, request_id, now)?;
    repository::update_request_status(
        &tx,
        request_id,
        RequestStatus::RejectedByBloodbank,
        Some(reason),
        now,
    )?;
    tracing::info!(request_id, released, reason, "request rejected by blood bank");

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(WorkflowOutcome::new(
        format!("Request rejected; {released} unit(s) returned to the pool"),
        RequestStatus::RejectedByBloodbank,
    ))
}

/// Hospital-initiated cancellation, allowed until crossmatch completes.
pub fn cancel_request(conn: &Connection, request_id: i64) -> Result<WorkflowOutcome, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;
    let now = Utc::now();

    let request = fetch_request(&tx, request_id)?;
    require_status(
        &request,
        &[RequestStatus::Pending, RequestStatus::PendingCrossmatch],
        "Pending or Pending_Crossmatch",
    )?;

    let released = release_held_units(&tx, request_id, now)?;
    repository::update_request_status(&tx, request_id, RequestStatus::CancelledByHospital, None, now)?;
    tracing::info!(request_id, released, "request cancelled by hospital");

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(WorkflowOutcome::new(
        format!("Request cancelled; {released} unit(s) returned to the pool"),
        RequestStatus::CancelledByHospital,
    ))
}

/// Hospital confirms the issued units arrived. Issued units are consumed
/// (`Used`); anything else still held is returned to the pool.
pub fn confirm_received(conn: &Connection, request_id: i64) -> Result<WorkflowOutcome, WorkflowError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(DatabaseError::Sqlite)?;
    let now = Utc::now();

    let request = fetch_request(&tx, request_id)?;
    require_status(&request, &[RequestStatus::Issued], "Issued")?;

    let mut used = Vec::new();
    for link in repository::active_allocations_for_request(&tx, request_id)? {
        if link.state != LinkState::Issued {
            continue;
        }
        if !repository::transition_bag_status(&tx, &link.bag_id, BagStatus::Issued, BagStatus::Used)? {
            return Err(WorkflowError::Conflict { bag_id: link.bag_id.clone() });
        }
        repository::update_allocation_state(&tx, link.id, LinkState::Used, None, now)?;
        used.push(link.bag_id);
    }
    // Units reserved under a partial flow but never sent go back to stock.
    release_held_units(&tx, request_id, now)?;
    repository::update_request_status(&tx, request_id, RequestStatus::Fulfilled, None, now)?;
    tracing::info!(request_id, units = used.len(), "receipt confirmed; request fulfilled");

    tx.commit().map_err(DatabaseError::Sqlite)?;
    Ok(WorkflowOutcome::with_units(
        format!("Receipt confirmed; {} unit(s) marked used", used.len()),
        RequestStatus::Fulfilled,
        used.len() as u32,
        0,
        used,
    ))
}

fn fetch_request(tx: &Transaction<'_>, request_id: i64) -> Result<BloodRequest, WorkflowError> {
    repository::get_request(tx, request_id)?.ok_or(WorkflowError::NotFound {
        entity: "BloodRequest",
        id: request_id.to_string(),
    })
}

fn require_status(
    request: &BloodRequest,
    allowed: &[RequestStatus],
    required: &'static str,
) -> Result<(), WorkflowError> {
    if !allowed.contains(&request.status) {
        return Err(WorkflowError::InvalidState {
            entity: "BloodRequest",
            id: request.id.to_string(),
            actual: request.status.as_str().into(),
            required,
        });
    }
    Ok(())
}

/// The link in the expected state between this request and this bag.
/// Distinguishes an unknown bag (NotFound) from a bag not held for this
/// request in the right state (InvalidState).
fn fetch_link(
    tx: &Transaction<'_>,
    request: &BloodRequest,
    bag_id: &str,
    expected: LinkState,
    required: &'static str,
) -> Result<crate::models::BagAllocation, WorkflowError> {
    if repository::get_bag(tx, bag_id)?.is_none() {
        return Err(WorkflowError::NotFound {
            entity: "BloodBag",
            id: bag_id.into(),
        });
    }
    repository::find_active_allocation(tx, request.id, bag_id)?
        .filter(|link| link.state == expected)
        .ok_or(WorkflowError::InvalidState {
            entity: "BloodRequest",
            id: request.id.to_string(),
            actual: request.status.as_str().into(),
            required,
        })
}

/// Return every unit still held (Reserved or Crossmatched) to the pool and
/// close its link. Issued units are left to the receipt flow.
fn release_held_units(
    tx: &Transaction<'_>,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<u32, WorkflowError> {
    let mut released = 0;
    for link in repository::active_allocations_for_request(tx, request_id)? {
        let held_as = match link.state {
            LinkState::Reserved => BagStatus::Reserved,
            LinkState::Crossmatched => BagStatus::Crossmatched,
            _ => continue,
        };
        if !repository::transition_bag_status(tx, &link.bag_id, held_as, BagStatus::Available)? {
            return Err(WorkflowError::Conflict {
                bag_id: link.bag_id.clone(),
            });
        }
        repository::update_allocation_state(tx, link.id, LinkState::Released, None, now)?;
        released += 1;
    }
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::db::repository::{
        active_allocations_for_request, allocations_for_request, get_bag, get_request, insert_bag,
        insert_request, update_bag_status,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{BloodType, Priority};
    use crate::models::{NewBloodBag, NewBloodRequest};
    use crate::workflow::engine::process_request;

    fn test_db() -> Connection {
        let conn = open_memory_database().expect("in-memory DB");
        conn.execute_batch(
            "INSERT INTO hospitals (id, name, address, city) VALUES (1, 'General Hospital', '123 Main St', 'Springfield');
             INSERT INTO blood_banks (id, name, address, city) VALUES (1, 'Central Blood Bank', '789 Pine St', 'Springfield');
             INSERT INTO users (id, first_name, last_name, role, created_at)
                 VALUES ('donor-1', 'Dana', 'Okafor', 'donor', '2026-07-01T00:00:00Z');
             INSERT INTO users (id, first_name, last_name, role, hospital_id, created_at)
                 VALUES ('staff-h', 'Ana', 'Silva', 'hospital_staff', 1, '2026-07-01T00:00:00Z');
             INSERT INTO users (id, first_name, last_name, role, bank_id, created_at)
                 VALUES ('staff-b', 'Sam', 'Reyes', 'blood_bank_staff', 1, '2026-07-01T00:00:00Z');
             INSERT INTO health_screenings (id, donor_id, bank_id, staff_id, screening_date, is_eligible_on_day)
                 VALUES (1, 'donor-1', 1, 'staff-b', '2026-07-01T00:00:00Z', 1);",
        )
        .unwrap();
        conn
    }

    fn seed_available_bag(conn: &Connection, id: &str, blood_type: BloodType, expires_in_days: i64) {
        let today = Utc::now().date_naive();
        insert_bag(
            conn,
            &NewBloodBag {
                id: id.into(),
                donor_id: "donor-1".into(),
                health_screening_id: 1,
                bank_id: 1,
                blood_type,
                component_type: None,
                collection_date: today - Duration::days(3),
                expiry_date: today + Duration::days(expires_in_days),
            },
        )
        .unwrap();
        update_bag_status(conn, id, BagStatus::Available).unwrap();
    }

    fn seed_request(conn: &Connection, blood_type: BloodType, units: u32) -> i64 {
        insert_request(
            conn,
            &NewBloodRequest {
                hospital_id: 1,
                staff_id: "staff-h".into(),
                patient_name: "Jordan Blake".into(),
                patient_id: "MRN-1001".into(),
                blood_type,
                units_requested: units,
                priority: Priority::Urgent,
                required_by: Utc::now() + Duration::days(2),
                clinical_notes: None,
                special_requirements: None,
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    /// One O+ bag reserved against a freshly processed single-unit request.
    fn reserved_pair(conn: &Connection) -> (i64, &'static str) {
        seed_available_bag(conn, "BAG-1", BloodType::OPositive, 20);
        let request_id = seed_request(conn, BloodType::OPositive, 1);
        process_request(conn, request_id).unwrap();
        (request_id, "BAG-1")
    }

    // ───────────────────────────────────────
    // confirm_crossmatch
    // ───────────────────────────────────────

    #[test]
    fn compatible_crossmatch_allocates_unit() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);

        let outcome = confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();

        assert_eq!(outcome.status, RequestStatus::Allocated);
        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Crossmatched);
        assert_eq!(
            get_request(&conn, request_id).unwrap().unwrap().status,
            RequestStatus::Allocated
        );

        let links = active_allocations_for_request(&conn, request_id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].state, LinkState::Crossmatched);
        assert_eq!(links[0].crossmatch_result.as_deref(), Some("Compatible"));
    }

    #[test]
    fn incompatible_crossmatch_returns_unit_and_escalates() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);

        let outcome = confirm_crossmatch(&conn, request_id, bag_id, false).unwrap();

        assert_eq!(outcome.status, RequestStatus::EscalatedToDonors);
        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Available);
        let request = get_request(&conn, request_id).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::EscalatedToDonors);
        assert_eq!(request.status_reason.as_deref(), Some("Crossmatch incompatible"));

        // Link closed with the outcome recorded
        assert!(active_allocations_for_request(&conn, request_id).unwrap().is_empty());
        let history = allocations_for_request(&conn, request_id).unwrap();
        assert_eq!(history[0].state, LinkState::Released);
        assert_eq!(history[0].crossmatch_result.as_deref(), Some("Incompatible"));
    }

    #[test]
    fn crossmatch_allowed_on_partially_fulfilled_request() {
        let conn = test_db();
        seed_available_bag(&conn, "BAG-1", BloodType::BNegative, 15);
        let request_id = seed_request(&conn, BloodType::BNegative, 3);
        process_request(&conn, request_id).unwrap();
        assert_eq!(
            get_request(&conn, request_id).unwrap().unwrap().status,
            RequestStatus::PartiallyFulfilled
        );

        let outcome = confirm_crossmatch(&conn, request_id, "BAG-1", true).unwrap();
        assert_eq!(outcome.status, RequestStatus::Allocated);
    }

    #[test]
    fn crossmatch_requires_request_past_allocation() {
        let conn = test_db();
        seed_available_bag(&conn, "BAG-1", BloodType::OPositive, 20);
        let request_id = seed_request(&conn, BloodType::OPositive, 1);

        // Still Pending — no units reserved yet
        let err = confirm_crossmatch(&conn, request_id, "BAG-1", true).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn crossmatch_unknown_bag_is_not_found() {
        let conn = test_db();
        let (request_id, _) = reserved_pair(&conn);

        let err = confirm_crossmatch(&conn, request_id, "BAG-NOPE", true).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "BloodBag", .. }));
    }

    #[test]
    fn crossmatch_unlinked_bag_is_invalid_state() {
        let conn = test_db();
        let (request_id, _) = reserved_pair(&conn);
        seed_available_bag(&conn, "BAG-OTHER", BloodType::OPositive, 30);

        let err = confirm_crossmatch(&conn, request_id, "BAG-OTHER", true).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    // ───────────────────────────────────────
    // dispatch_bag
    // ───────────────────────────────────────

    #[test]
    fn dispatch_issues_bag_and_request_together() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();

        let outcome = dispatch_bag(&conn, request_id, bag_id).unwrap();

        assert_eq!(outcome.status, RequestStatus::Issued);
        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Issued);
        assert_eq!(
            get_request(&conn, request_id).unwrap().unwrap().status,
            RequestStatus::Issued
        );
        let links = active_allocations_for_request(&conn, request_id).unwrap();
        assert_eq!(links[0].state, LinkState::Issued);
    }

    #[test]
    fn dispatch_before_crossmatch_is_rejected() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);

        let err = dispatch_bag(&conn, request_id, bag_id).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidState { required: "Allocated", .. }
        ));
    }

    // ───────────────────────────────────────
    // reject_request
    // ───────────────────────────────────────

    #[test]
    fn reject_releases_reserved_units() {
        let conn = test_db();
        seed_available_bag(&conn, "BAG-1", BloodType::APositive, 10);
        seed_available_bag(&conn, "BAG-2", BloodType::APositive, 20);
        let request_id = seed_request(&conn, BloodType::APositive, 2);
        process_request(&conn, request_id).unwrap();

        let outcome = reject_request(&conn, request_id, "Inventory reserved for surgery").unwrap();

        assert_eq!(outcome.status, RequestStatus::RejectedByBloodbank);
        assert_eq!(get_bag(&conn, "BAG-1").unwrap().unwrap().status, BagStatus::Available);
        assert_eq!(get_bag(&conn, "BAG-2").unwrap().unwrap().status, BagStatus::Available);
        let request = get_request(&conn, request_id).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::RejectedByBloodbank);
        assert_eq!(request.status_reason.as_deref(), Some("Inventory reserved for surgery"));
        assert!(active_allocations_for_request(&conn, request_id).unwrap().is_empty());
    }

    #[test]
    fn reject_from_allocated_releases_crossmatched_unit() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();

        reject_request(&conn, request_id, "Patient transferred").unwrap();

        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Available);
    }

    #[test]
    fn reject_requires_a_reason() {
        let conn = test_db();
        let (request_id, _) = reserved_pair(&conn);

        let err = reject_request(&conn, request_id, "  ").unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn reject_after_dispatch_is_rejected() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();
        dispatch_bag(&conn, request_id, bag_id).unwrap();

        let err = reject_request(&conn, request_id, "too late").unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    // ───────────────────────────────────────
    // cancel_request
    // ───────────────────────────────────────

    #[test]
    fn cancel_pending_request() {
        let conn = test_db();
        let request_id = seed_request(&conn, BloodType::ONegative, 2);

        let outcome = cancel_request(&conn, request_id).unwrap();

        assert_eq!(outcome.status, RequestStatus::CancelledByHospital);
        assert_eq!(
            get_request(&conn, request_id).unwrap().unwrap().status,
            RequestStatus::CancelledByHospital
        );
    }

    #[test]
    fn cancel_releases_reserved_units() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);

        cancel_request(&conn, request_id).unwrap();

        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Available);
        assert!(active_allocations_for_request(&conn, request_id).unwrap().is_empty());
    }

    #[test]
    fn cancel_after_crossmatch_is_rejected() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();

        let err = cancel_request(&conn, request_id).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    // ───────────────────────────────────────
    // confirm_received
    // ───────────────────────────────────────

    #[test]
    fn receipt_confirms_fulfillment_and_consumes_units() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();
        dispatch_bag(&conn, request_id, bag_id).unwrap();

        let outcome = confirm_received(&conn, request_id).unwrap();

        assert_eq!(outcome.status, RequestStatus::Fulfilled);
        assert_eq!(outcome.fulfilled_units, Some(1));
        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Used);
        assert_eq!(
            get_request(&conn, request_id).unwrap().unwrap().status,
            RequestStatus::Fulfilled
        );
        let history = allocations_for_request(&conn, request_id).unwrap();
        assert_eq!(history[0].state, LinkState::Used);
    }

    #[test]
    fn receipt_requires_issued_request() {
        let conn = test_db();
        let (request_id, _) = reserved_pair(&conn);

        let err = confirm_received(&conn, request_id).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { required: "Issued", .. }));
    }

    #[test]
    fn receipt_releases_units_never_dispatched() {
        let conn = test_db();
        // Partial flow: two of three reserved, one crossmatched and sent,
        // the other still Reserved when the hospital confirms receipt.
        seed_available_bag(&conn, "BAG-1", BloodType::OPositive, 10);
        seed_available_bag(&conn, "BAG-2", BloodType::OPositive, 20);
        let request_id = seed_request(&conn, BloodType::OPositive, 3);
        process_request(&conn, request_id).unwrap();
        confirm_crossmatch(&conn, request_id, "BAG-1", true).unwrap();
        dispatch_bag(&conn, request_id, "BAG-1").unwrap();

        confirm_received(&conn, request_id).unwrap();

        assert_eq!(get_bag(&conn, "BAG-1").unwrap().unwrap().status, BagStatus::Used);
        assert_eq!(get_bag(&conn, "BAG-2").unwrap().unwrap().status, BagStatus::Available);
    }

    // ───────────────────────────────────────
    // Terminal states and the full lifecycle
    // ───────────────────────────────────────

    #[test]
    fn terminal_request_admits_no_transitions() {
        let conn = test_db();
        let (request_id, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, request_id, bag_id, true).unwrap();
        dispatch_bag(&conn, request_id, bag_id).unwrap();
        confirm_received(&conn, request_id).unwrap();

        assert!(matches!(
            process_request(&conn, request_id).unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
        assert!(matches!(
            confirm_crossmatch(&conn, request_id, bag_id, true).unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
        assert!(matches!(
            dispatch_bag(&conn, request_id, bag_id).unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
        assert!(matches!(
            reject_request(&conn, request_id, "no").unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
        assert!(matches!(
            cancel_request(&conn, request_id).unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
        assert!(matches!(
            confirm_received(&conn, request_id).unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
    }

    #[test]
    fn released_unit_can_serve_a_later_request() {
        let conn = test_db();
        let (first, bag_id) = reserved_pair(&conn);
        confirm_crossmatch(&conn, first, bag_id, false).unwrap();

        // Unit is back in the pool; a new request picks it up
        let second = seed_request(&conn, BloodType::OPositive, 1);
        let outcome = process_request(&conn, second).unwrap();

        assert_eq!(outcome.fulfilled_units, Some(1));
        assert_eq!(outcome.allocated_bags.as_deref(), Some(&[bag_id.to_string()][..]));
        assert_eq!(get_bag(&conn, bag_id).unwrap().unwrap().status, BagStatus::Reserved);
    }
}
