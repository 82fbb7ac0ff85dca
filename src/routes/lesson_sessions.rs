use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::lesson::manager::{ClientEvent, SessionManagerError};
use crate::response::AppError;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    level: String,
    stage: String,
    lesson_id: String,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(start_session))
        .route(
            "/:sessionId",
            get(get_session).delete(close_session),
        )
        .route("/:sessionId/events", post(post_event))
}

async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.level.trim().is_empty()
        || payload.stage.trim().is_empty()
        || payload.lesson_id.trim().is_empty()
    {
        return Err(AppError::validation("level、stage、lessonId 均不能为空"));
    }

    let view = state
        .sessions()
        .start(&user.id, &payload.level, &payload.stage, &payload.lesson_id)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            success: true,
            data: view,
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .sessions()
        .view(&session_id, &user.id)
        .await
        .map_err(not_found)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

async fn post_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<String>,
    Json(event): Json<ClientEvent>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .sessions()
        .handle_event(&session_id, &user.id, event)
        .await
        .map_err(not_found)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: view,
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions()
        .close(&session_id, &user.id)
        .await
        .map_err(not_found)?;

    Ok(Json(SuccessResponse {
        success: true,
        data: serde_json::json!({ "closed": true }),
    }))
}

fn not_found(err: SessionManagerError) -> AppError {
    match err {
        SessionManagerError::NotFound => AppError::not_found("会话不存在"),
    }
}
