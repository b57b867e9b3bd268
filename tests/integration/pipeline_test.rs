// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use analyzrs::domain::models::analysis::AnalysisStatus;
use analyzrs::domain::repositories::analysis_repository::AnalysisRepository;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Acme Widgets - Industrial widgets since 1999</title>
  <meta name="description" content="Acme builds reliable industrial widgets for factories and workshops around the world.">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="canonical" href="https://acme.example/">
  <script src="https://cdn.jsdelivr.net/npm/react@18/umd/react.production.min.js" defer></script>
</head>
<body>
  <header><nav><a href="/products">Products</a> <a href="/about">About</a></nav></header>
  <main>
    <h1>Industrial widgets</h1>
    <p>Durable widgets with a ten year warranty.</p>
    <img src="/hero.jpg" alt="A widget on a workbench">
    <form><label for="email">Email</label><input id="email" type="email"></form>
  </main>
</body>
</html>"#;

async fn target_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("x-frame-options", "DENY")
                .set_body_string(LANDING_PAGE),
        )
        .mount(&server)
        .await;
    server
}

fn completion(content: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content.to_string() } }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 80, "total_tokens": 200 }
    }))
}

async fn submit(app: &super::helpers::TestApp, payload: Value) -> Uuid {
    let response = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    Uuid::parse_str(body["analysisId"].as_str().unwrap()).unwrap()
}

/// 业务视角的完整分析
///
/// 提交后立即排队；工作器完成后结果包含扫描器各部分以及业务视角的 AI 洞察
#[tokio::test]
async fn test_business_profile_analysis_end_to_end() {
    let app = create_test_app().await;
    let site = target_site().await;

    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-llm-key"))
        .and(body_string_contains("business stakeholders"))
        .respond_with(completion(json!({
            "summary": "Solid landing page with room to grow organic traffic.",
            "highlights": ["Clear value proposition"],
            "businessRecommendations": [
                { "title": "Add customer testimonials", "description": "Social proof near the fold.", "priority": "high" }
            ],
            "technicalRecommendations": [
                { "title": "Add a Content-Security-Policy", "description": "Restrict script sources." }
            ],
            "riskAssessment": { "level": "Medium", "score": 42.4, "factors": ["Missing CSP"] }
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let id = submit(
        &app,
        json!({ "url": format!("{}/", site.uri()), "options": { "aiProfile": "business" } }),
    )
    .await;

    let worker = app.worker(Some(llm.uri()));
    assert!(worker.process_next().await.unwrap());

    let response = app
        .server
        .get(&format!("/api/url-analysis/result/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let analysis = &body["analysis"];

    assert_eq!(body["success"], true);
    assert_eq!(analysis["status"], "completed");
    assert_eq!(
        analysis["title"],
        "Acme Widgets - Industrial widgets since 1999"
    );
    assert!(analysis["seo"].is_object());
    assert!(analysis["performance"].is_object());
    assert!(analysis["accessibility"].is_object());
    assert!(analysis["security"].is_object());
    assert!(analysis["technologies"].is_object());
    assert_eq!(analysis["aiInsights"]["profile"], "business");
    assert_eq!(
        analysis["businessRecommendations"][0]["title"],
        "Add customer testimonials"
    );
    assert_eq!(analysis["riskAssessment"]["level"], "medium");
    assert_eq!(analysis["riskAssessment"]["score"], 42);

    // five scanners plus enrichment all succeeded
    assert_eq!(analysis["confidenceScore"].as_f64(), Some(1.0));

    let events: Value = app
        .server
        .get(&format!("/api/url-analysis/events/{}", id))
        .add_header("Authorization", app.bearer())
        .await
        .json();
    let progresses: Vec<i64> = events["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["progress"].as_i64().unwrap())
        .collect();
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progresses.last(), Some(&100));
    assert_eq!(events["events"].as_array().unwrap().last().unwrap()["stage"], "completed");
}

/// AI 增强失败时仍然完成，AI 部分为空
#[tokio::test]
async fn test_enrichment_failure_degrades_to_completed() {
    let app = create_test_app().await;
    let site = target_site().await;

    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream overloaded"))
        .mount(&llm)
        .await;

    let id = submit(&app, json!({ "url": format!("{}/", site.uri()) })).await;
    app.worker(Some(llm.uri())).process_next().await.unwrap();

    let record = app
        .analysis_repo
        .find_by_id(id, app.owner_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.progress, 100);
    assert!(record.report.seo.is_some());
    assert!(record.report.ai_insights.is_none());
    assert!(record.report.business_recommendations.is_none());
    assert!(record.report.risk_assessment.is_none());
}

/// 要求 AI 洞察时，增强失败导致整体失败
#[tokio::test]
async fn test_required_insights_fail_without_llm() {
    let app = create_test_app().await;
    let site = target_site().await;

    let id = submit(
        &app,
        json!({
            "url": format!("{}/", site.uri()),
            "options": { "requireAiInsights": true }
        }),
    )
    .await;
    // no LLM key configured
    app.worker(None).process_next().await.unwrap();

    let record = app
        .analysis_repo
        .find_by_id(id, app.owner_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Failed);
    assert!(record.error_message.is_some());
}

/// 目标站点返回错误状态时分析失败
#[tokio::test]
async fn test_unreachable_target_fails_analysis() {
    let app = create_test_app().await;

    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&site)
        .await;

    let id = submit(&app, json!({ "url": format!("{}/", site.uri()) })).await;
    app.worker(None).process_next().await.unwrap();

    let response = app
        .server
        .get(&format!("/api/url-analysis/status/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    let body: Value = response.json();
    assert_eq!(body["analysis"]["status"], "failed");
    assert_eq!(body["analysis"]["error"], "Target unreachable: HTTP 503");
    assert!(body["analysis"]["completedAt"].is_string());
}

/// 处理期间被删除的分析不会被重新写入
#[tokio::test]
async fn test_deleted_analysis_is_skipped_by_worker() {
    let app = create_test_app().await;
    let site = target_site().await;

    let id = submit(&app, json!({ "url": format!("{}/", site.uri()) })).await;
    let response = app
        .server
        .delete(&format!("/api/url-analysis/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let worker = app.worker(None);
    assert!(worker.process_next().await.unwrap());
    assert!(app
        .analysis_repo
        .find_by_id(id, app.owner_id)
        .await
        .unwrap()
        .is_none());

    // the job was acknowledged
    assert!(!worker.process_next().await.unwrap());
}
