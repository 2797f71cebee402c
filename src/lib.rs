//! Hemolink coordinates blood units between hospitals and blood banks.
//!
//! Hospitals submit patient blood requests; blood banks allocate units
//! against tracked inventory (First-Expired-First-Out), confirm crossmatch,
//! and dispatch. The workflow module owns the request state machine and
//! keeps bag status, allocation links and request status consistent inside
//! one transaction per operation.
//!
//! Transport concerns (HTTP routing, authentication, UI) live in the
//! embedding application; this crate exposes the storage and the domain
//! operations they call.

pub mod config;
pub mod db;
pub mod inventory;
pub mod models;
pub mod requests;
pub mod workflow;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for an embedding binary. Honors RUST_LOG and falls
/// back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
