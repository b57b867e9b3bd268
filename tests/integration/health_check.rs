// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::helpers::create_test_app;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::util::ServiceExt;

/// 健康检查测试
///
/// 健康检查和版本端点无需认证
#[tokio::test]
async fn health_check_works() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let response = app.server.get("/version").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

/// 未授权分析端点测试
///
/// 没有认证头时直接返回 401
#[tokio::test]
async fn analyze_endpoint_returns_401_without_auth() {
    use analyzrs::application::use_cases::analysis_use_case::AnalysisUseCase;
    use analyzrs::domain::services::identity_provider::IdentityProvider;
    use analyzrs::infrastructure::identity::DatabaseIdentityProvider;
    use analyzrs::presentation::routes;
    use std::sync::Arc;

    let app = create_test_app().await;
    let use_case = Arc::new(AnalysisUseCase::new(
        app.analysis_repo.clone(),
        app.queue.clone(),
        3,
    ));
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(DatabaseIdentityProvider::new(app.db_pool.clone()));

    let response = routes::build_router(use_case, identity)
        .oneshot(
            Request::builder()
                .uri("/api/url-analysis/analyze")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"url": "https://example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
