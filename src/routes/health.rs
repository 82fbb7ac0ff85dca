use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfo {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(health_root))
        .route("/live", get(health_live))
        .route("/info", get(health_info))
}

async fn health_root() -> impl IntoResponse {
    Json(SuccessResponse {
        success: true,
        data: "ok",
    })
}

async fn health_live() -> impl IntoResponse {
    Json(SuccessResponse {
        success: true,
        data: "alive",
    })
}

async fn health_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(SuccessResponse {
        success: true,
        data: HealthInfo {
            status: "ok",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: state.uptime_seconds(),
        },
    })
}
