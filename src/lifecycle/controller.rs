use std::sync::Arc;

use log::info;
use rusqlite::Transaction;

use crate::db::{
    repositories::{
        interruptions::{close_interruption, insert_interruption, interruptions_for_session},
        sessions::{delete_session, find_session, insert_session, update_session},
    },
    Database, HistoryEntry, Interruption, NewSession, Session, SessionView,
};

use super::{
    clock::{Clock, SystemClock},
    error::{LifecycleError, LifecycleResult},
    policy::LifecyclePolicy,
    state::{self, Operation},
};

/// Executes session lifecycle operations against the store.
///
/// Every mutating operation loads the session, checks the precondition and
/// writes all resulting changes inside one transaction on the database
/// thread, so a failed check or write leaves no trace.
#[derive(Clone)]
pub struct SessionController {
    db: Database,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl SessionController {
    pub fn new(db: Database, policy: LifecyclePolicy) -> Self {
        Self::with_clock(db, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, policy: LifecyclePolicy, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock, policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub async fn schedule(&self, input: NewSession) -> LifecycleResult<SessionView> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(LifecycleError::Validation("title must not be empty".into()));
        }
        if input.scheduled_duration <= 0 {
            return Err(LifecycleError::Validation(format!(
                "scheduled_duration must be a positive number of minutes, got {}",
                input.scheduled_duration
            )));
        }
        let scheduled_duration = u32::try_from(input.scheduled_duration).map_err(|_| {
            LifecycleError::Validation(format!(
                "scheduled_duration {} is too large",
                input.scheduled_duration
            ))
        })?;
        let goal = input
            .goal
            .map(|goal| goal.trim().to_string())
            .filter(|goal| !goal.is_empty());

        let session = state::new_session(title, goal, scheduled_duration, self.clock.now());
        let record = session.clone();
        self.db
            .execute(move |conn| insert_session(conn, &record))
            .await?;

        info!(
            "Scheduled session {} ({} min): {}",
            session.id, session.scheduled_duration, session.title
        );
        Ok(SessionView::new(session, 0))
    }

    pub async fn start(&self, session_id: &str) -> LifecycleResult<SessionView> {
        let now = self.clock.now();
        self.transition(session_id, Operation::Start, move |_, session| {
            state::begin(session, now);
            Ok(0)
        })
        .await
    }

    pub async fn pause(&self, session_id: &str, reason: Option<String>) -> LifecycleResult<SessionView> {
        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
            .ok_or_else(|| LifecycleError::Validation("a pause reason is required".into()))?;

        let now = self.clock.now();
        let policy = self.policy.clone();
        self.transition(session_id, Operation::Pause, move |tx, session| {
            let earlier = interruptions_for_session(tx, &session.id)?;
            let interruption = state::pause(session, reason, &earlier, &policy, now);
            insert_interruption(tx, &interruption)?;
            Ok(earlier.len() + 1)
        })
        .await
    }

    pub async fn resume(&self, session_id: &str) -> LifecycleResult<SessionView> {
        let now = self.clock.now();
        self.transition(session_id, Operation::Resume, move |tx, session| {
            let interruptions = interruptions_for_session(tx, &session.id)?;
            let mut open = interruptions
                .iter()
                .find(|interruption| interruption.is_open())
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!("paused session {} has no open interruption", session.id)
                })?;

            state::resume(session, &mut open, now);
            if let Some(end_time) = open.end_time {
                close_interruption(tx, &open.id, end_time)?;
            }
            Ok(interruptions.len())
        })
        .await
    }

    pub async fn complete(&self, session_id: &str) -> LifecycleResult<SessionView> {
        let now = self.clock.now();
        let policy = self.policy.clone();
        self.transition(session_id, Operation::Complete, move |tx, session| {
            let mut interruptions = interruptions_for_session(tx, &session.id)?;
            let open_ids: Vec<String> = interruptions
                .iter()
                .filter(|interruption| interruption.is_open())
                .map(|interruption| interruption.id.clone())
                .collect();

            state::complete(session, &mut interruptions, &policy, now);

            for interruption in interruptions
                .iter()
                .filter(|interruption| open_ids.contains(&interruption.id))
            {
                if let Some(end_time) = interruption.end_time {
                    close_interruption(tx, &interruption.id, end_time)?;
                }
            }
            Ok(interruptions.len())
        })
        .await
    }

    pub async fn get(&self, session_id: &str) -> LifecycleResult<SessionView> {
        self.db
            .get_session_view(session_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(session_id.to_string()))
    }

    pub async fn list(&self, skip: u32, limit: u32) -> LifecycleResult<Vec<SessionView>> {
        Ok(self.db.list_session_views(skip, limit).await?)
    }

    /// Every session, newest first, with its derived statistics.
    pub async fn history(&self) -> LifecycleResult<Vec<HistoryEntry>> {
        let views = self.db.list_session_views(0, u32::MAX).await?;
        Ok(views.into_iter().map(HistoryEntry::from).collect())
    }

    pub async fn interruptions(&self, session_id: &str) -> LifecycleResult<Vec<Interruption>> {
        self.db
            .get_interruptions(session_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(session_id.to_string()))
    }

    pub async fn delete(&self, session_id: &str) -> LifecycleResult<()> {
        let id = session_id.to_string();
        let deleted = self
            .db
            .execute(move |conn| delete_session(conn, &id))
            .await?;

        if !deleted {
            return Err(LifecycleError::NotFound(session_id.to_string()));
        }
        info!("Deleted session {session_id}");
        Ok(())
    }

    /// Load, check, apply and persist one transition atomically.
    ///
    /// `apply` mutates the session (and any interruption rows through the
    /// transaction) and returns the session's interruption count afterwards.
    async fn transition<F>(
        &self,
        session_id: &str,
        operation: Operation,
        apply: F,
    ) -> LifecycleResult<SessionView>
    where
        F: FnOnce(&Transaction<'_>, &mut Session) -> LifecycleResult<usize> + Send + 'static,
    {
        let id = session_id.to_string();
        let view = self
            .db
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let mut session =
                    find_session(&tx, &id)?.ok_or_else(|| LifecycleError::NotFound(id.clone()))?;
                state::ensure_allowed(operation, &session)?;

                let pause_count = apply(&tx, &mut session)?;
                update_session(&tx, &session)?;
                tx.commit()?;

                let pause_count = u32::try_from(pause_count)
                    .map_err(|_| anyhow::anyhow!("pause count {pause_count} out of range"))?;
                Ok::<_, LifecycleError>(SessionView::new(session, pause_count))
            })
            .await?;

        info!(
            "Session {} {} -> {}",
            view.session.id, operation, view.session.status
        );
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionStatus;
    use crate::lifecycle::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        clock: Arc<ManualClock>,
        controller: SessionController,
    }

    fn harness() -> Harness {
        harness_with(LifecyclePolicy::default())
    }

    fn harness_with(policy: LifecyclePolicy) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("deepwork.sqlite3")).unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        ));
        let controller = SessionController::with_clock(db, policy, clock.clone());
        Harness {
            _dir: dir,
            clock,
            controller,
        }
    }

    fn new_session(title: &str, minutes: i64) -> NewSession {
        NewSession {
            title: title.into(),
            goal: None,
            scheduled_duration: minutes,
        }
    }

    #[tokio::test]
    async fn schedule_validates_input() {
        let h = harness();
        let err = h.controller.schedule(new_session("   ", 30)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        let err = h.controller.schedule(new_session("Focus", 0)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        let err = h.controller.schedule(new_session("Focus", -5)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        assert!(h.controller.list(0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_creates_a_scheduled_session() {
        let h = harness();
        let view = h
            .controller
            .schedule(NewSession {
                title: "  Write docs ".into(),
                goal: Some("  ".into()),
                scheduled_duration: 45,
            })
            .await
            .unwrap();

        assert_eq!(view.session.title, "Write docs");
        assert_eq!(view.session.goal, None);
        assert_eq!(view.session.status, SessionStatus::Scheduled);
        assert_eq!(view.session.started_at, None);
        assert_eq!(view.pause_count, 0);

        let fetched = h.controller.get(&view.session.id).await.unwrap();
        assert_eq!(fetched, view);
    }

    #[tokio::test]
    async fn round_trip_without_pauses() {
        let h = harness();
        let id = h.controller.schedule(new_session("Deep work", 30)).await.unwrap().session.id;

        h.controller.start(&id).await.unwrap();
        h.clock.advance_minutes(30);
        let view = h.controller.complete(&id).await.unwrap();

        assert_eq!(view.session.status, SessionStatus::Completed);
        assert_eq!(view.session.actual_duration, Some(30.0));
        assert_eq!(view.completion_ratio, 1.0);
        assert_eq!(view.pause_count, 0);
    }

    #[tokio::test]
    async fn pause_and_resume_keep_focused_time_accurate() {
        let h = harness();
        let id = h.controller.schedule(new_session("Write docs", 45)).await.unwrap().session.id;

        h.controller.start(&id).await.unwrap();
        h.clock.advance_minutes(20);
        let paused = h.controller.pause(&id, Some("call".into())).await.unwrap();
        assert_eq!(paused.session.status, SessionStatus::Paused);
        assert_eq!(paused.pause_count, 1);

        h.clock.advance_minutes(5);
        let resumed = h.controller.resume(&id).await.unwrap();
        assert_eq!(resumed.session.status, SessionStatus::Active);
        assert_eq!(resumed.session.paused_at, None);
        assert_eq!(resumed.pause_count, 1);

        let interruptions = h.controller.interruptions(&id).await.unwrap();
        assert_eq!(interruptions.len(), 1);
        assert_eq!(interruptions[0].reason, "call");
        assert!(interruptions.iter().all(|i| !i.is_open()));

        h.clock.advance_minutes(25);
        let done = h.controller.complete(&id).await.unwrap();
        assert_eq!(done.session.status, SessionStatus::Completed);
        assert_eq!(done.session.actual_duration, Some(45.0));
    }

    #[tokio::test]
    async fn pause_requires_a_reason() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();

        for reason in [None, Some(String::new()), Some("  ".into())] {
            let err = h.controller.pause(&id, reason).await.unwrap_err();
            assert!(matches!(err, LifecycleError::Validation(_)));
        }
        let view = h.controller.get(&id).await.unwrap();
        assert_eq!(view.session.status, SessionStatus::Active);
        assert_eq!(view.pause_count, 0);
    }

    #[tokio::test]
    async fn fourth_pause_interrupts_for_good() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 60)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();

        for _ in 0..3 {
            h.clock.advance_minutes(5);
            h.controller.pause(&id, Some("ping".into())).await.unwrap();
            h.clock.advance_minutes(1);
            h.controller.resume(&id).await.unwrap();
        }

        h.clock.advance_minutes(5);
        let view = h.controller.pause(&id, Some("ping".into())).await.unwrap();
        assert_eq!(view.session.status, SessionStatus::Interrupted);
        assert_eq!(view.pause_count, 4);
        assert!(view.session.completed_at.is_some());
        assert_eq!(view.session.actual_duration, Some(20.0));

        let interruptions = h.controller.interruptions(&id).await.unwrap();
        assert!(interruptions.iter().all(|i| !i.is_open()));

        for result in [
            h.controller.start(&id).await,
            h.controller.pause(&id, Some("again".into())).await,
            h.controller.resume(&id).await,
            h.controller.complete(&id).await,
        ] {
            assert!(matches!(
                result,
                Err(LifecycleError::InvalidTransition {
                    status: SessionStatus::Interrupted,
                    ..
                })
            ));
        }
        assert_eq!(h.controller.get(&id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn completing_a_paused_session_abandons_it() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();
        h.clock.advance_minutes(10);
        h.controller.pause(&id, Some("lunch".into())).await.unwrap();
        h.clock.advance_minutes(60);

        let view = h.controller.complete(&id).await.unwrap();
        assert_eq!(view.session.status, SessionStatus::Abandoned);
        assert_eq!(view.session.actual_duration, Some(10.0));
        assert_eq!(view.completion_ratio, 0.0);

        let interruptions = h.controller.interruptions(&id).await.unwrap();
        assert_eq!(interruptions.len(), 1);
        assert!(!interruptions[0].is_open());
    }

    #[tokio::test]
    async fn overdue_when_past_tolerance() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();
        h.clock.advance_minutes(34);

        let view = h.controller.complete(&id).await.unwrap();
        assert_eq!(view.session.status, SessionStatus::Overdue);
        assert!(view.completion_ratio > 1.1);
    }

    #[tokio::test]
    async fn invalid_transition_changes_nothing() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        let before = h.controller.get(&id).await.unwrap();

        let err = h.controller.resume(&id).await.unwrap_err();
        match err {
            LifecycleError::InvalidTransition { operation, status } => {
                assert_eq!(operation, Operation::Resume);
                assert_eq!(status, SessionStatus::Scheduled);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(h.controller.pause(&id, Some("x".into())).await.is_err());
        assert!(h.controller.complete(&id).await.is_err());
        assert_eq!(h.controller.get(&id).await.unwrap(), before);
        assert!(h.controller.interruptions(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = harness();
        let missing = "00000000-0000-0000-0000-000000000000";
        assert!(matches!(
            h.controller.get(missing).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(matches!(
            h.controller.start(missing).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(matches!(
            h.controller.interruptions(missing).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(matches!(
            h.controller.delete(missing).await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_pauses_only_one_wins() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();

        let (a, b) = tokio::join!(
            h.controller.pause(&id, Some("a".into())),
            h.controller.pause(&id, Some("b".into())),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(h.controller.interruptions(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_is_newest_first_with_stats() {
        let h = harness();
        let first = h.controller.schedule(new_session("First", 30)).await.unwrap().session.id;
        let second = h.controller.schedule(new_session("Second", 30)).await.unwrap().session.id;
        h.clock.advance_minutes(1);
        let third = h.controller.schedule(new_session("Third", 20)).await.unwrap().session.id;

        h.controller.start(&third).await.unwrap();
        h.clock.advance_minutes(10);
        h.controller.complete(&third).await.unwrap();

        let history = h.controller.history().await.unwrap();
        let ids: Vec<_> = history.iter().map(|entry| entry.id.clone()).collect();
        assert_eq!(ids, vec![third.clone(), second, first]);
        assert_eq!(history[0].status, SessionStatus::Completed);
        assert_eq!(history[0].completion_ratio, 0.5);
        assert_eq!(history[1].completion_ratio, 0.0);
    }

    #[tokio::test]
    async fn list_paginates() {
        let h = harness();
        for n in 0..5 {
            h.controller
                .schedule(new_session(&format!("Session {n}"), 25))
                .await
                .unwrap();
        }

        let page = h.controller.list(1, 2).await.unwrap();
        let titles: Vec<_> = page.iter().map(|v| v.session.title.as_str()).collect();
        assert_eq!(titles, vec!["Session 3", "Session 2"]);
    }

    #[tokio::test]
    async fn delete_cascades_to_interruptions() {
        let h = harness();
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();
        h.controller.pause(&id, Some("door".into())).await.unwrap();

        h.controller.delete(&id).await.unwrap();
        assert!(matches!(
            h.controller.get(&id).await,
            Err(LifecycleError::NotFound(_))
        ));

        let orphans: i64 = h
            .controller
            .db
            .execute(|conn| {
                let count = conn.query_row("SELECT COUNT(*) FROM interruptions", [], |row| row.get(0))?;
                Ok::<_, anyhow::Error>(count)
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn custom_limit_applies() {
        let h = harness_with(LifecyclePolicy {
            interruption_limit: 2,
            overdue_tolerance: 0.10,
        });
        let id = h.controller.schedule(new_session("Focus", 30)).await.unwrap().session.id;
        h.controller.start(&id).await.unwrap();
        h.controller.pause(&id, Some("one".into())).await.unwrap();
        h.controller.resume(&id).await.unwrap();
        let view = h.controller.pause(&id, Some("two".into())).await.unwrap();
        assert_eq!(view.session.status, SessionStatus::Interrupted);
    }
}
