use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::response::{json_error, AppError};
use crate::state::AppState;
use crate::store::NewProgressRecord;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveProgressRequest {
    dialogue_id: String,
    total_turns: i64,
    correct_turns: i64,
    duration_seconds: i64,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list_progress).post(save_progress))
        .route("/:id", get(get_progress).delete(delete_progress))
}

async fn save_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.dialogue_id.trim().is_empty() {
        return Err(AppError::validation("dialogueId 不能为空"));
    }
    if payload.total_turns < 0 || payload.correct_turns < 0 || payload.duration_seconds < 0 {
        return Err(AppError::validation("进度数值不能为负数"));
    }
    if payload.correct_turns > payload.total_turns {
        return Err(AppError::validation("correctTurns 不能大于 totalTurns"));
    }

    let record = state
        .progress_store()
        .insert(NewProgressRecord {
            owner_id: user.id,
            dialogue_id: payload.dialogue_id,
            total_turns: payload.total_turns as u32,
            correct_turns: payload.correct_turns as u32,
            duration_seconds: payload.duration_seconds,
        })
        .map_err(|err| {
            tracing::error!(error = %err, "failed to save progress record");
            json_error(StatusCode::BAD_GATEWAY, "STORE_ERROR", "进度保存失败")
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            success: true,
            data: record,
        }),
    ))
}

async fn list_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let records = state
        .progress_store()
        .list_for_owner(&user.id)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to list progress records");
            json_error(StatusCode::BAD_GATEWAY, "STORE_ERROR", "进度查询失败")
        })?;

    Ok(Json(SuccessResponse {
        success: true,
        data: records,
    }))
}

async fn get_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .progress_store()
        .get(&user.id, &id)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to read progress record");
            json_error(StatusCode::BAD_GATEWAY, "STORE_ERROR", "进度查询失败")
        })?
        .ok_or_else(|| AppError::not_found(format!("进度记录不存在: {id}")))?;

    Ok(Json(SuccessResponse {
        success: true,
        data: record,
    }))
}

async fn delete_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .progress_store()
        .delete(&user.id, &id)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to delete progress record");
            json_error(StatusCode::BAD_GATEWAY, "STORE_ERROR", "进度删除失败")
        })?;

    if !deleted {
        return Err(AppError::not_found(format!("进度记录不存在: {id}")));
    }

    Ok(Json(SuccessResponse {
        success: true,
        data: serde_json::json!({ "deleted": true }),
    }))
}
