//! REST 错误响应

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::TodoError;

/// 所有 REST 错误的响应体：`{"error": "..."}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// 处理器失败时的响应；存储故障只以固定文案对外，细节写日志
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(&'static str),
}

impl ApiError {
    /// 记录故障并换成对外的固定文案
    pub fn fault(message: &'static str) -> impl FnOnce(TodoError) -> ApiError {
        move |e| {
            error!(error = %e, "❌ {}", message);
            ApiError::Internal(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Todo not found".to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
