// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::analysis_use_case::AnalysisUseCase;
use crate::domain::repositories::analysis_repository::AnalysisRepository;
use crate::domain::services::identity_provider::IdentityProvider;
use crate::presentation::handlers::analysis_handler;
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use crate::queue::job_queue::JobQueue;
use axum::{
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 分析接口的挂载前缀
pub const API_PREFIX: &str = "/api/url-analysis";

/// 创建应用路由
///
/// `/health` 与 `/version` 无需认证，其余接口都要求 Bearer API 密钥。
pub fn build_router<R, Q>(
    use_case: Arc<AnalysisUseCase<R, Q>>,
    identity: Arc<dyn IdentityProvider>,
) -> Router
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let protected_routes = Router::new()
        .route("/analyze", post(analysis_handler::analyze::<R, Q>))
        .route("/status/{id}", get(analysis_handler::get_status::<R, Q>))
        .route("/result/{id}", get(analysis_handler::get_result::<R, Q>))
        .route("/history", get(analysis_handler::list_history::<R, Q>))
        .route("/events/{id}", get(analysis_handler::list_events::<R, Q>))
        .route("/{id}", delete(analysis_handler::delete_analysis::<R, Q>))
        .route_layer(middleware::from_fn_with_state(
            AuthState { identity },
            auth_middleware,
        ))
        .layer(Extension(use_case));

    Router::new()
        .merge(public_routes)
        .nest(API_PREFIX, protected_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
