use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Interruption, Session, SessionStatus};

use super::{
    error::{LifecycleError, LifecycleResult},
    policy::LifecyclePolicy,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Complete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Complete => "complete",
        }
    }

    pub fn required_statuses(&self) -> &'static [SessionStatus] {
        match self {
            Operation::Start => &[SessionStatus::Scheduled],
            Operation::Pause => &[SessionStatus::Active],
            Operation::Resume => &[SessionStatus::Paused],
            Operation::Complete => &[SessionStatus::Active, SessionStatus::Paused],
        }
    }

    pub fn permits(&self, status: SessionStatus) -> bool {
        self.required_statuses().contains(&status)
    }

    pub fn required_description(&self) -> String {
        self.required_statuses()
            .iter()
            .map(|status| format!("'{status}'"))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn ensure_allowed(operation: Operation, session: &Session) -> LifecycleResult<()> {
    if operation.permits(session.status) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            operation,
            status: session.status,
        })
    }
}

/// Focused milliseconds between `started_at` and `until`, excluding the part
/// of every interruption that overlaps that window.
pub fn focused_ms(
    started_at: DateTime<Utc>,
    until: DateTime<Utc>,
    interruptions: &[Interruption],
) -> u64 {
    let elapsed = (until - started_at).num_milliseconds().max(0) as u64;
    let interrupted: u64 = interruptions
        .iter()
        .map(|interruption| interruption.overlap_ms(started_at, until))
        .sum();
    elapsed.saturating_sub(interrupted)
}

fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / 60_000.0
}

pub fn classify_completion(
    actual_ms: u64,
    scheduled_ms: u64,
    policy: &LifecyclePolicy,
) -> SessionStatus {
    if actual_ms as f64 > policy.overdue_threshold_ms(scheduled_ms) {
        SessionStatus::Overdue
    } else {
        SessionStatus::Completed
    }
}

pub fn new_session(
    title: String,
    goal: Option<String>,
    scheduled_duration: u32,
    now: DateTime<Utc>,
) -> Session {
    Session {
        id: Uuid::new_v4().to_string(),
        title,
        goal,
        scheduled_duration,
        status: SessionStatus::Scheduled,
        created_at: now,
        started_at: None,
        paused_at: None,
        completed_at: None,
        actual_duration: None,
    }
}

fn started_at(session: &Session) -> DateTime<Utc> {
    session.started_at.unwrap_or(session.created_at)
}

fn finish(session: &mut Session, status: SessionStatus, focused_ms: u64, now: DateTime<Utc>) {
    session.status = status;
    session.completed_at = Some(now.max(started_at(session)));
    session.actual_duration = Some(ms_to_minutes(focused_ms));
}

/// `scheduled -> active`
pub fn begin(session: &mut Session, now: DateTime<Utc>) {
    session.status = SessionStatus::Active;
    session.started_at = Some(now);
}

/// `active -> paused | interrupted`
///
/// Returns the new interruption. When it reaches the policy's limit the
/// session ends as `interrupted` and the interruption is closed at `now`,
/// since no resume can follow.
pub fn pause(
    session: &mut Session,
    reason: String,
    earlier: &[Interruption],
    policy: &LifecyclePolicy,
    now: DateTime<Utc>,
) -> Interruption {
    let mut interruption = Interruption {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        reason,
        start_time: now,
        end_time: None,
    };

    session.paused_at = Some(now);
    let count = earlier.len() as u64 + 1;

    if count >= u64::from(policy.interruption_limit) {
        let focused = focused_ms(started_at(session), now, earlier);
        finish(session, SessionStatus::Interrupted, focused, now);
        interruption.end_time = Some(now);
    } else {
        session.status = SessionStatus::Paused;
    }

    interruption
}

/// `paused -> active`
pub fn resume(session: &mut Session, open: &mut Interruption, now: DateTime<Utc>) {
    open.end_time = Some(now.max(open.start_time));
    session.status = SessionStatus::Active;
    session.paused_at = None;
}

/// `active -> completed | overdue`, or `paused -> abandoned`.
///
/// `interruptions` is every interruption of the session; an open one is
/// closed at `now`.
pub fn complete(
    session: &mut Session,
    interruptions: &mut [Interruption],
    policy: &LifecyclePolicy,
    now: DateTime<Utc>,
) {
    let started_at = started_at(session);

    if session.status == SessionStatus::Paused {
        let paused_at = session.paused_at.unwrap_or(now);
        let focused = focused_ms(started_at, paused_at, interruptions);
        for open in interruptions.iter_mut().filter(|i| i.is_open()) {
            open.end_time = Some(now.max(open.start_time));
        }
        finish(session, SessionStatus::Abandoned, focused, now);
        return;
    }

    let focused = focused_ms(started_at, now, interruptions);
    let status = classify_completion(focused, session.scheduled_ms(), policy);
    finish(session, status, focused, now);
}
