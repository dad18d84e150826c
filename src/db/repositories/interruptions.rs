use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, format_optional_datetime, parse_datetime, parse_optional_datetime},
    models::Interruption,
};

fn row_to_interruption(row: &Row) -> Result<Interruption> {
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;

    Ok(Interruption {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        reason: row.get("reason")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_optional_datetime(end_time, "end_time")?,
    })
}

pub fn insert_interruption(conn: &Connection, interruption: &Interruption) -> Result<()> {
    conn.execute(
        "INSERT INTO interruptions (id, session_id, reason, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            interruption.id,
            interruption.session_id,
            interruption.reason,
            format_datetime(&interruption.start_time),
            format_optional_datetime(interruption.end_time.as_ref()),
        ],
    )
    .with_context(|| "failed to insert interruption")?;
    Ok(())
}

/// Set `end_time` on an interruption that is still open.
pub fn close_interruption(
    conn: &Connection,
    interruption_id: &str,
    end_time: DateTime<Utc>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE interruptions
             SET end_time = ?1
             WHERE id = ?2 AND end_time IS NULL",
            params![format_datetime(&end_time), interruption_id],
        )
        .with_context(|| "failed to close interruption")?;

    if rows_affected == 0 {
        return Err(anyhow!("interruption {interruption_id} is not open"));
    }
    Ok(())
}

/// All interruptions of a session in the order they happened.
pub fn interruptions_for_session(conn: &Connection, session_id: &str) -> Result<Vec<Interruption>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, reason, start_time, end_time
         FROM interruptions
         WHERE session_id = ?1
         ORDER BY start_time ASC, rowid ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut interruptions = Vec::new();
    while let Some(row) = rows.next()? {
        interruptions.push(row_to_interruption(row)?);
    }

    Ok(interruptions)
}

impl Database {
    /// `None` when the session itself does not exist.
    pub async fn get_interruptions(&self, session_id: &str) -> Result<Option<Vec<Interruption>>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
                params![session_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            interruptions_for_session(conn, &session_id).map(Some)
        })
        .await
    }
}
