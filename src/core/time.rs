//! Shared timestamp helpers.
//!
//! All persisted timestamps are RFC3339 in UTC with second precision
//! (e.g. `2026-08-02T09:14:03Z`).

use chrono::{SecondsFormat, Utc};

/// Returns the current UTC time as an RFC3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
