use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::response::AppError;
use crate::state::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if state.config().desktop_mode {
        req.extensions_mut().insert(crate::auth::local_user());
        return next.run(req).await;
    }

    let token = crate::auth::extract_token(req.headers());
    let Some(token) = token else {
        return AppError::unauthorized("未提供认证令牌").into_response();
    };

    match crate::auth::verify_token(state.config().api_token.as_deref(), &token) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => AppError::unauthorized("认证失败，请重新登录").into_response(),
    }
}
