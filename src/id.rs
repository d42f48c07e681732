//! Time-ordered identifier generation.
//!
//! # Purpose
//! All aggregates are keyed by UUIDv7 strings so that primary keys sort by
//! creation time. A single process-wide counter context keeps ids monotonic
//! even when several are generated inside the same millisecond.
use uuid::Uuid;

/// Generate a new UUIDv7, formatted as a lowercase hyphenated string.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
