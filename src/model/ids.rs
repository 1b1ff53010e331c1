//! Temporary-identifier helpers for optimistic records.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const TEMP_PREFIX: &str = "temp-";

/// Synthetic id for a record that has not been confirmed by the server yet.
/// Unix millis plus a random alphanumeric suffix keeps ids unique within a
/// session even when two creates land in the same millisecond.
pub fn temp_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "{TEMP_PREFIX}{}-{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_PREFIX)
}
