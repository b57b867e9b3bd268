// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use analyzrs::domain::models::analysis::AnalysisStatus;
use analyzrs::domain::repositories::analysis_repository::AnalysisRepository;
use analyzrs::queue::job_queue::JobQueue;
use analyzrs::workers::reaper::{LeaseReaper, ReapSummary};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 工作器崩溃后的恢复
///
/// 领取后未确认的任务在租约过期后被重新投递，由另一个工作器完成
#[tokio::test]
async fn test_crashed_worker_job_is_redelivered_and_completed() {
    let app = create_test_app().await;

    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><head><title>Recovered</title></head><body><h1>Hi</h1></body></html>"),
        )
        .mount(&site)
        .await;

    let body: Value = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": format!("{}/", site.uri()) }))
        .await
        .json();
    let id = Uuid::parse_str(body["analysisId"].as_str().unwrap()).unwrap();

    // a worker takes the job and disappears
    let lost = app.queue.dequeue(Uuid::new_v4()).await.unwrap().unwrap();
    assert_eq!(lost.id, id);
    assert!(app.queue.dequeue(Uuid::new_v4()).await.unwrap().is_none());

    let reaper = LeaseReaper::new(
        app.analysis_repo.clone(),
        app.queue.clone(),
        Duration::from_secs(30),
    );
    let after_lease: DateTime<FixedOffset> = (Utc::now() + chrono::Duration::minutes(5)).into();
    let summary = reaper.reap_once(after_lease).await.unwrap();
    assert_eq!(summary, ReapSummary { requeued: 1, failed: 0 });

    let worker = app.worker(None);
    assert!(worker.process_next().await.unwrap());

    let record = app
        .analysis_repo
        .find_by_id(id, app.owner_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(record.report.title.as_deref(), Some("Recovered"));
}
