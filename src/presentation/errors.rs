// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::application::dto::analyze_request::ValidationIssue;
use crate::application::use_cases::analysis_use_case::AnalysisError;
use crate::domain::repositories::analysis_repository::RepositoryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口。
/// 所有错误响应都带有 `success: false`。
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    /// 请求体无法解析时使用的校验错误
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self(AnalysisError::Validation(vec![ValidationIssue::new("body", message)]).into())
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Analysis not found" })),
    )
        .into_response()
}

fn internal(error: &str, message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": error, "message": message })),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<AnalysisError>() {
            return match err {
                AnalysisError::Validation(details) => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": "Validation failed",
                        "details": details,
                    })),
                )
                    .into_response(),
                AnalysisError::NotFound => not_found(),
                AnalysisError::NotReady { status, progress } => (
                    StatusCode::ACCEPTED,
                    Json(json!({
                        "success": false,
                        "error": "Analysis not completed yet",
                        "status": status,
                        "progress": progress,
                    })),
                )
                    .into_response(),
                AnalysisError::QueueUnavailable(message) => {
                    internal("Failed to start URL analysis", message.clone())
                }
                AnalysisError::Repository(e) => {
                    error!("Repository error: {}", e);
                    internal("Internal server error", e.to_string())
                }
            };
        }

        match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => not_found(),
            Some(e) => {
                error!("Repository error: {}", e);
                internal("Internal server error", e.to_string())
            }
            None => {
                error!("Unhandled error: {:#}", self.0);
                internal("Internal server error", self.0.to_string())
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
