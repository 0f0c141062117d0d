use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod logging;
pub mod logic;
pub mod sessions;
pub mod state;
pub mod storage;

use crate::handlers::{
    complete_handler, open_session_handler, ping_handler, project_handler, render_handler,
    save_session_handler,
};
pub use crate::state::AppState;
pub use crate::storage::{FileStorage, Storage, StorageError};

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/ping", get(ping_handler))
        .route("/api/projects/:project_id", get(project_handler))
        .route(
            "/api/coloring/session/:id",
            post(open_session_handler).put(save_session_handler),
        )
        .route("/api/coloring/complete", post(complete_handler))
        .route("/api/coloring/render/:session_id", get(render_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Flushes dirty projects every `period` until the task is dropped.
pub async fn run_flush_loop(state: AppState, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        interval.tick().await;
        sessions::flush_dirty(&state).await;
    }
}
