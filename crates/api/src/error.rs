//! # API 统一错误处理
//!
//! 将预测流水线与行情端口的错误统一映射到 HTTP 状态码与 JSON 响应体。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use yosoku_core::forecast::error::ForecastError;
use yosoku_core::market::error::MarketError;

use crate::types::ApiErrorResponse;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 行情数据不可用 (404)
    #[error("数据不可用: {0}")]
    NotFound(String),

    /// 请求参数错误 (400)
    #[error("请求参数错误: {0}")]
    BadRequest(String),

    /// 数据可用但无法建模 (422)
    #[error("无法完成预测: {message}")]
    Unprocessable { kind: &'static str, message: String },

    /// 内部错误 (500)
    #[error("内部服务错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 响应体中的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "DataUnavailable",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unprocessable { kind, .. } => *kind,
            ApiError::Internal(_) => "Internal",
        }
    }
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable { message, .. } => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(msg) => {
                // 内部错误只记录日志，不向客户端透传细节
                tracing::error!("内部服务错误: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "服务器内部错误".to_string())
            }
        };

        let body = Json(ApiErrorResponse::new(message, kind));
        (status, body).into_response()
    }
}

/// 从 `ForecastError` 转换：数据问题归 404，建模问题归 422
impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::DataUnavailable(msg) => ApiError::NotFound(msg),
            other => ApiError::Unprocessable {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

/// 从 `MarketError` 转换
impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        ApiError::from(ForecastError::from(err))
    }
}
