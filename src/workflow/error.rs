//! Workflow-specific error types.
//!
//! Separate from DatabaseError so the calling layer can map outcomes
//! directly: NotFound → 404, InvalidState/Validation → 400, Conflict →
//! retryable.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} is {actual}; operation requires {required}")]
    InvalidState {
        entity: &'static str,
        id: String,
        actual: String,
        required: &'static str,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Bag {bag_id} was claimed by a concurrent operation; nothing was committed")]
    Conflict { bag_id: String },
}
