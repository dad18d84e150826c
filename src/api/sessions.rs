//! Session endpoints.
//!
//! Each handler is a thin shim over [`SessionController`]; all lifecycle
//! rules live there.
//!
//! [`SessionController`]: crate::lifecycle::SessionController

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db::{HistoryEntry, Interruption, NewSession, SessionView};

use super::error::ApiResult;
use super::AppState;

// ── POST /sessions ────────────────────────────────────────────────────

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let Json(input) = payload?;
    let view = state.sessions.schedule(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// ── GET /sessions ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn list_sessions(
    State(state): State<AppState>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<Vec<SessionView>>> {
    let Query(page) = query?;
    Ok(Json(state.sessions.list(page.skip, page.limit).await?))
}

// ── GET /sessions/history ─────────────────────────────────────────────

pub async fn session_history(State(state): State<AppState>) -> ApiResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.sessions.history().await?))
}

// ── GET | DELETE /sessions/:id ────────────────────────────────────────

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.sessions.get(&session_id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.sessions.delete(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── PATCH /sessions/:id/{start,pause,resume,complete} ─────────────────

pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.sessions.start(&session_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PauseParams {
    #[serde(default)]
    pub reason: Option<String>,
}

/// The reason may arrive as `?reason=` or as a JSON body; the query wins.
pub async fn pause_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    query: Result<Query<PauseParams>, QueryRejection>,
    body: Option<Json<PauseParams>>,
) -> ApiResult<Json<SessionView>> {
    let Query(params) = query?;
    let reason = params
        .reason
        .or_else(|| body.and_then(|Json(body)| body.reason));
    Ok(Json(state.sessions.pause(&session_id, reason).await?))
}

pub async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.sessions.resume(&session_id).await?))
}

pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.sessions.complete(&session_id).await?))
}

// ── GET /sessions/:id/interruptions ───────────────────────────────────

pub async fn session_interruptions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<Interruption>>> {
    Ok(Json(state.sessions.interruptions(&session_id).await?))
}
