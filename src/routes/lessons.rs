use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;

use crate::lesson::types::Dialogue;
use crate::response::{json_error, AppError};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DialoguesResponse {
    dialogues: Vec<Dialogue>,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/:level/:stage/:lessonId/dialogues", get(get_dialogues))
}

async fn get_dialogues(
    State(state): State<AppState>,
    Path((level, stage, lesson_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let dialogues = state
        .dialogue_store()
        .dialogues_for_lesson(&level, &stage, &lesson_id)
        .map_err(|err| {
            tracing::error!(error = %err, %level, %stage, %lesson_id, "dialogue lookup failed");
            json_error(StatusCode::BAD_GATEWAY, "STORE_ERROR", "获取对话数据失败")
        })?;

    if dialogues.is_empty() {
        return Err(AppError::not_found("该课程暂无对话内容"));
    }

    Ok(Json(SuccessResponse {
        success: true,
        data: DialoguesResponse { dialogues },
    }))
}
