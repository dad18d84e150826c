//! Session-related data models.
//!
//! - `Session`, `SessionStatus`: the stored record and its lifecycle status
//! - `NewSession`: validated input for scheduling
//! - `SessionView`, `HistoryEntry`: read projections with derived statistics

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Active,
    Paused,
    Interrupted,
    Completed,
    Abandoned,
    Overdue,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 7] = [
        SessionStatus::Scheduled,
        SessionStatus::Active,
        SessionStatus::Paused,
        SessionStatus::Interrupted,
        SessionStatus::Completed,
        SessionStatus::Abandoned,
        SessionStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
            SessionStatus::Overdue => "overdue",
        }
    }

    /// Terminal statuses carry a `completed_at` and accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Interrupted
                | SessionStatus::Completed
                | SessionStatus::Abandoned
                | SessionStatus::Overdue
        )
    }

    /// Statuses that count as having met the "finished" contract.
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Overdue)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown session status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub goal: Option<String>,
    /// Target length in minutes.
    pub scheduled_duration: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Focused minutes, set when the session reaches a terminal status.
    pub actual_duration: Option<f64>,
}

impl Session {
    pub fn scheduled_ms(&self) -> u64 {
        u64::from(self.scheduled_duration) * 60_000
    }

    /// Wall-clock elapsed minutes over scheduled minutes. Zero unless the
    /// session finished as `completed` or `overdue`.
    pub fn completion_ratio(&self) -> f64 {
        if !self.status.is_finished() || self.scheduled_duration == 0 {
            return 0.0;
        }

        match (self.started_at, self.completed_at) {
            (Some(started_at), Some(completed_at)) => {
                let elapsed_ms = (completed_at - started_at).num_milliseconds().max(0) as f64;
                elapsed_ms / self.scheduled_ms() as f64
            }
            _ => 0.0,
        }
    }
}

/// Validated input for the `schedule` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    #[serde(default)]
    pub goal: Option<String>,
    pub scheduled_duration: i64,
}

/// A session together with the statistics derived on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub pause_count: u32,
    pub completion_ratio: f64,
}

impl SessionView {
    pub fn new(session: Session, pause_count: u32) -> Self {
        let completion_ratio = session.completion_ratio();
        Self {
            session,
            pause_count,
            completion_ratio,
        }
    }
}

/// Summary row for the history listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub goal: Option<String>,
    pub status: SessionStatus,
    pub scheduled_duration: u32,
    pub actual_duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub pause_count: u32,
    pub completion_ratio: f64,
}

impl From<SessionView> for HistoryEntry {
    fn from(view: SessionView) -> Self {
        let SessionView {
            session,
            pause_count,
            completion_ratio,
        } = view;
        Self {
            id: session.id,
            title: session.title,
            goal: session.goal,
            status: session.status,
            scheduled_duration: session.scheduled_duration,
            actual_duration: session.actual_duration,
            created_at: session.created_at,
            pause_count,
            completion_ratio,
        }
    }
}
