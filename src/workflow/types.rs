//! Boundary payload returned by every workflow operation.

use serde::{Deserialize, Serialize};

use crate::models::enums::RequestStatus;

/// What a workflow call did, for the calling layer to render.
///
/// Unit counts and bag ids are only present for operations where they mean
/// something (allocation, receipt confirmation); status is the request's
/// status after the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub message: String,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfilled_units: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_units: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_bags: Option<Vec<String>>,
}

impl WorkflowOutcome {
    pub fn new(message: impl Into<String>, status: RequestStatus) -> Self {
        Self {
            message: message.into(),
            status,
            fulfilled_units: None,
            remaining_units: None,
            allocated_bags: None,
        }
    }

    pub fn with_units(
        message: impl Into<String>,
        status: RequestStatus,
        fulfilled: u32,
        remaining: u32,
        allocated_bags: Vec<String>,
    ) -> Self {
        Self {
            message: message.into(),
            status,
            fulfilled_units: Some(fulfilled),
            remaining_units: Some(remaining),
            allocated_bags: Some(allocated_bags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_fields_omitted_when_absent() {
        let outcome = WorkflowOutcome::new("Request rejected", RequestStatus::RejectedByBloodbank);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "RejectedByBloodbank");
        assert!(json.get("fulfilled_units").is_none());
        assert!(json.get("allocated_bags").is_none());
    }

    #[test]
    fn unit_fields_present_after_allocation() {
        let outcome = WorkflowOutcome::with_units(
            "Reserved 2 unit(s)",
            RequestStatus::PendingCrossmatch,
            2,
            0,
            vec!["BAG-1".into(), "BAG-2".into()],
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["fulfilled_units"], 2);
        assert_eq!(json["remaining_units"], 0);
        assert_eq!(json["allocated_bags"][1], "BAG-2");
    }
}
