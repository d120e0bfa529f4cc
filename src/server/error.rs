use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use super::types::ErrorResponse;
use crate::error::Error;

/// API错误类型，统一返回 `{success: false, error}`
pub enum ApiError {
    /// 请求本身不合法
    BadRequest(String),
    /// 引擎返回的错误
    Engine(Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Engine(err) => {
                let status = match &err {
                    Error::UnknownCollection(_)
                    | Error::InvalidTopK(_)
                    | Error::UnsupportedFormat(_)
                    | Error::ExtractionFailed { .. } => StatusCode::BAD_REQUEST,
                    Error::QueryNotIndexed(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("请求处理失败: {err}");
                }
                (status, err.to_string())
            }
        };
        (status, Json(ErrorResponse { success: false, error: message })).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}
