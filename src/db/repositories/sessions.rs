use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{
        format_datetime, format_optional_datetime, parse_datetime, parse_optional_datetime,
        parse_status, to_u32,
    },
    models::{Session, SessionView},
};

const SESSION_COLUMNS: &str = "id, title, goal, scheduled_duration, status, created_at, \
     started_at, paused_at, completed_at, actual_duration";

fn row_to_session(row: &Row) -> Result<Session> {
    let scheduled_duration: i64 = row.get("scheduled_duration")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let started_at: Option<String> = row.get("started_at")?;
    let paused_at: Option<String> = row.get("paused_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(Session {
        id: row.get("id")?,
        title: row.get("title")?,
        goal: row.get("goal")?,
        scheduled_duration: to_u32(scheduled_duration, "scheduled_duration")?,
        status: parse_status(&status)?,
        created_at: parse_datetime(&created_at, "created_at")?,
        started_at: parse_optional_datetime(started_at, "started_at")?,
        paused_at: parse_optional_datetime(paused_at, "paused_at")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
        actual_duration: row.get("actual_duration")?,
    })
}

fn row_to_view(row: &Row) -> Result<SessionView> {
    let session = row_to_session(row)?;
    let pause_count: i64 = row.get("pause_count")?;
    Ok(SessionView::new(session, to_u32(pause_count, "pause_count")?))
}

pub fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, title, goal, scheduled_duration, status, created_at,
                               started_at, paused_at, completed_at, actual_duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            session.id,
            session.title,
            session.goal,
            session.scheduled_duration,
            session.status.as_str(),
            format_datetime(&session.created_at),
            format_optional_datetime(session.started_at.as_ref()),
            format_optional_datetime(session.paused_at.as_ref()),
            format_optional_datetime(session.completed_at.as_ref()),
            session.actual_duration,
        ],
    )
    .with_context(|| format!("failed to insert session {}", session.id))?;
    Ok(())
}

pub fn find_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;

    let mut rows = stmt.query(params![session_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_session(row)?)),
        None => Ok(None),
    }
}

/// Persist the mutable lifecycle fields. `id`, `title`, `goal`,
/// `scheduled_duration` and `created_at` are never rewritten.
pub fn update_session(conn: &Connection, session: &Session) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE sessions
             SET status = ?1,
                 started_at = ?2,
                 paused_at = ?3,
                 completed_at = ?4,
                 actual_duration = ?5
             WHERE id = ?6",
            params![
                session.status.as_str(),
                format_optional_datetime(session.started_at.as_ref()),
                format_optional_datetime(session.paused_at.as_ref()),
                format_optional_datetime(session.completed_at.as_ref()),
                session.actual_duration,
                session.id,
            ],
        )
        .with_context(|| format!("failed to update session {}", session.id))?;

    if rows_affected == 0 {
        return Err(anyhow!("session {} vanished during update", session.id));
    }
    Ok(())
}

/// Delete a session. Interruptions go with it via ON DELETE CASCADE.
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<bool> {
    let rows_affected = conn
        .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
        .with_context(|| format!("failed to delete session {session_id}"))?;
    Ok(rows_affected > 0)
}

impl Database {
    pub async fn get_session_view(&self, session_id: &str) -> Result<Option<SessionView>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let view = conn
                .query_row(
                    &format!(
                        "SELECT {SESSION_COLUMNS},
                                (SELECT COUNT(*) FROM interruptions i WHERE i.session_id = s.id) AS pause_count
                         FROM sessions s
                         WHERE s.id = ?1"
                    ),
                    params![session_id],
                    |row| Ok(row_to_view(row)),
                )
                .optional()?
                .transpose()?;
            Ok(view)
        })
        .await
    }

    /// Sessions newest-first by creation time; equal timestamps fall back to
    /// insertion order, later first.
    pub async fn list_session_views(&self, skip: u32, limit: u32) -> Result<Vec<SessionView>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS},
                        (SELECT COUNT(*) FROM interruptions i WHERE i.session_id = s.id) AS pause_count
                 FROM sessions s
                 ORDER BY s.created_at DESC, s.rowid DESC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let mut rows = stmt.query(params![i64::from(limit), i64::from(skip)])?;
            let mut views = Vec::new();
            while let Some(row) = rows.next()? {
                views.push(row_to_view(row)?);
            }

            Ok(views)
        })
        .await
    }
}
