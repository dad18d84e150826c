use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interruption {
    pub id: String,
    pub session_id: String,
    pub reason: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Interruption {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Milliseconds of this interruption that fall inside `[from, until]`.
    /// An open interruption is treated as ending at `until`.
    pub fn overlap_ms(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
        let start = self.start_time.max(from);
        let end = self.end_time.unwrap_or(until).min(until);
        (end - start).num_milliseconds().max(0) as u64
    }
}
