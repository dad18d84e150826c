pub mod error;
pub mod sessions;

use axum::response::Json;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::lifecycle::SessionController;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionController,
}

/// Build the full API router with its middleware.
pub fn router(state: AppState, config: &Config) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/sessions/history", get(sessions::session_history))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/start", patch(sessions::start_session))
        .route("/sessions/:id/pause", patch(sessions::pause_session))
        .route("/sessions/:id/resume", patch(sessions::resume_session))
        .route("/sessions/:id/complete", patch(sessions::complete_session))
        .route(
            "/sessions/:id/interruptions",
            get(sessions::session_interruptions),
        )
        .with_state(state);

    if let Some(timeout) = config.request_timeout() {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    router.layer(CorsLayer::permissive())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "DeepWork API is running",
        "status": "online",
    }))
}
