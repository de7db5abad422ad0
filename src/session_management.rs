//! Session management core module.
//!
//! This module resolves which stored session is current for a worker,
//! bootstraps one from the assignment when nothing was submitted, and
//! persists every save as a new immutable version.

use chrono::Utc;

/// Submission resolution and versioned saves.
pub mod resolver;

pub use resolver::{select_latest, SubmissionResolver};

/// Worker id used by the single-worker labeling flow.
pub const DEFAULT_WORKER: &str = "default_worker";

/// Current wall-clock time in Unix milliseconds.
pub fn record_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}
