use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::services::evaluator::EvaluationRequest;
use crate::state::AppState;

const MAX_ANSWER_LEN: usize = 500;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateAnswerRequest {
    dialogue_id: String,
    turn_index: i64,
    expected_answer: String,
    accepted_answers: Vec<String>,
    user_answer: String,
    #[serde(default)]
    target_structures: Vec<String>,
    context: EvaluationContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationContext {
    teacher_question: String,
    lesson_title: String,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/answer", post(evaluate_answer))
}

async fn evaluate_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<EvaluateAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.turn_index < 0 {
        return Err(AppError::validation("turnIndex 不能为负数"));
    }

    let user_answer = payload.user_answer.trim();
    if user_answer.is_empty() || user_answer.chars().count() > MAX_ANSWER_LEN {
        return Err(AppError::validation("userAnswer 长度必须在 1-500 之间"));
    }

    if payload.accepted_answers.is_empty() {
        return Err(AppError::validation("acceptedAnswers 不能为空"));
    }

    tracing::debug!(
        user_id = %user.id,
        dialogue_id = %payload.dialogue_id,
        turn_index = payload.turn_index,
        "evaluating answer"
    );

    let request = EvaluationRequest {
        user_answer: user_answer.to_string(),
        expected_answer: payload.expected_answer,
        accepted_answers: payload.accepted_answers,
        target_structures: payload.target_structures,
        teacher_question: payload.context.teacher_question,
        lesson_title: payload.context.lesson_title,
    };

    let result = state.evaluator().evaluate(&request).await;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}
