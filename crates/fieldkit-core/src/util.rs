//! Small helpers shared by the models and the HTTP adapters.

/// Upper bound on remote error text kept in a mutation's `error` field.
pub const MAX_REMOTE_MESSAGE_CHARS: usize = 180;

/// Wall-clock time in Unix milliseconds, the unit of every stored timestamp.
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Collapse whitespace in a response body and cap its length.
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_REMOTE_MESSAGE_CHARS)
        .collect()
}
