mod evaluation;
mod health;
mod lesson_sessions;
mod lessons;
mod progress;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/api/lessons", lessons::router())
        .nest("/api/evaluation", evaluation::router())
        .nest("/api/progress", progress::router())
        .nest("/api/lesson-sessions", lesson_sessions::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_auth,
        ));

    Router::new()
        .nest("/health", health::router())
        .merge(api)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "接口不存在").into_response()
}
