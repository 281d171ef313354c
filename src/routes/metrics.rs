use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Prometheus 文本格式导出，被动抓取
#[axum::debug_handler]
pub async fn metrics(State(state): State<AppState>) -> Response {
    let output = state.metrics.encode();

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
        .into_response()
}
