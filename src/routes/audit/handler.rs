use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;
use crate::utils::success_to_api_response;

use super::model::{AuditQuery, AuditRecord};

#[axum::debug_handler]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = AuditRecord::list(&state.pool, &query).await?;
    Ok((StatusCode::OK, success_to_api_response(records)))
}
