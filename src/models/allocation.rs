use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::LinkState;

/// Join record binding one bag to one request for the duration of the
/// fulfillment pipeline.
///
/// The bag's own status tracks inventory state; the link carries the
/// per-request history (crossmatch outcome, issue/release). A bag has at
/// most one link in an active state at any time, enforced by a partial
/// unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagAllocation {
    pub id: Uuid,
    pub request_id: i64,
    pub bag_id: String,
    pub state: LinkState,
    pub crossmatch_result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
