use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Validation { detail: String, fields: Vec<String> },
    Database(sqlx::Error),
    InternalServerError,
}

/// 全服务统一的错误响应结构
#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("资源不存在".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail, fields) = match self {
            AppError::NotFound(detail) => (StatusCode::NOT_FOUND, detail, None),
            AppError::Validation { detail, fields } => {
                (StatusCode::UNPROCESSABLE_ENTITY, detail, Some(fields))
            }
            AppError::Database(e) => {
                // 内部细节只进日志，不返回给调用方
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部服务器错误".to_string(),
                    None,
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "内部服务器错误".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse { detail, fields });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_offending_fields() {
        let err = AppError::Validation {
            detail: "字段校验失败".into(),
            fields: vec!["price".into(), "name".into()],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn database_error_does_not_leak_detail() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_body_shape_is_stable() {
        let body = ErrorResponse {
            detail: "x".into(),
            fields: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "detail": "x" }));
    }
}
