// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use analyzrs::domain::models::analysis::AnalysisStatus;
use analyzrs::domain::repositories::analysis_repository::{AnalysisRepository, AnalysisUpdate};
use analyzrs::queue::job_queue::JobQueue;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};
use std::future::IntoFuture;
use uuid::Uuid;

/// 测试成功提交分析请求
///
/// 返回排队响应，记录为 pending，且队列中有对应任务
#[tokio::test]
async fn test_submit_analysis_success() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({
            "url": "https://example.com",
            "options": { "aiProfile": "business" }
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["estimatedTime"], "30-60 seconds");

    let id = Uuid::parse_str(body["analysisId"].as_str().unwrap()).unwrap();
    let record = app
        .analysis_repo
        .find_by_id(id, app.owner_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AnalysisStatus::Pending);
    assert_eq!(record.progress, 0);

    let job = app.queue.dequeue(Uuid::new_v4()).await.unwrap().unwrap();
    assert_eq!(job.id, id);
}

/// 测试请求校验
///
/// 无效URL、缺失URL和非法选项都返回 400，且不产生任何记录
#[tokio::test]
async fn test_submit_validation_failures() {
    let app = create_test_app().await;

    let cases = [
        json!({ "url": "not-a-valid-url" }),
        json!({ "url": "ftp://example.com/file" }),
        json!({}),
        json!({ "url": "https://example.com", "options": { "aiProfile": "marketing" } }),
    ];

    for payload in cases {
        let response = app
            .server
            .post("/api/url-analysis/analyze")
            .add_header("Authorization", app.bearer())
            .json(&payload)
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", payload);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Validation failed");
        assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));
    }

    let (records, total) = app
        .analysis_repo
        .list_paginated(
            app.owner_id,
            1,
            20,
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(total, 0);
    assert!(app.queue.dequeue(Uuid::new_v4()).await.unwrap().is_none());
}

/// 测试认证
#[tokio::test]
async fn test_requests_without_valid_key_are_rejected() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/url-analysis/analyze")
        .json(&json!({ "url": "https://example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/url-analysis/history")
        .add_header("Authorization", "Bearer unknown-key")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

/// 测试状态查询与未完成时的结果查询
#[tokio::test]
async fn test_status_and_not_ready_result() {
    let app = create_test_app().await;

    let body: Value = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json();
    let id = body["analysisId"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/url-analysis/status/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"]["id"], id);
    assert_eq!(body["analysis"]["status"], "pending");
    assert_eq!(body["analysis"]["progress"], 0);
    assert!(body["analysis"]["startedAt"].is_string());

    let response = app
        .server
        .get(&format!("/api/url-analysis/result/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Analysis not completed yet");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 0);
}

/// 测试所有者隔离
///
/// 其他用户的分析对当前用户表现为不存在
#[tokio::test]
async fn test_other_owners_cannot_see_analysis() {
    let app = create_test_app().await;
    let (other_key, _) = app.add_owner().await;

    let body: Value = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json();
    let id = body["analysisId"].as_str().unwrap().to_string();

    let other = format!("Bearer {}", other_key);
    for path in [
        format!("/api/url-analysis/status/{}", id),
        format!("/api/url-analysis/result/{}", id),
        format!("/api/url-analysis/events/{}", id),
    ] {
        let response = app
            .server
            .get(&path)
            .add_header("Authorization", other.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
    }

    let response = app
        .server
        .delete(&format!("/api/url-analysis/{}", id))
        .add_header("Authorization", other)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let history: Value = app
        .server
        .get("/api/url-analysis/history")
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert_eq!(history["pagination"]["total"], 1);
}

/// 测试未知或非法的分析ID
#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = create_test_app().await;

    for path in [
        format!("/api/url-analysis/status/{}", Uuid::new_v4()),
        "/api/url-analysis/status/not-a-uuid".to_string(),
    ] {
        let response = app
            .server
            .get(&path)
            .add_header("Authorization", app.bearer())
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "Analysis not found");
    }

    let response = app
        .server
        .delete(&format!("/api/url-analysis/{}", Uuid::new_v4()))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

/// 测试历史分页与删除
#[tokio::test]
async fn test_history_pagination_and_delete() {
    let app = create_test_app().await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let body: Value = app
            .server
            .post("/api/url-analysis/analyze")
            .add_header("Authorization", app.bearer())
            .json(&json!({ "url": format!("https://example.com/page-{}", i) }))
            .await
            .json();
        ids.push(body["analysisId"].as_str().unwrap().to_string());
    }

    let response = app
        .server
        .get("/api/url-analysis/history")
        .add_query_param("page", 1)
        .add_query_param("limit", 2)
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["analyses"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "pages": 2 })
    );

    let response = app
        .server
        .delete(&format!("/api/url-analysis/{}", ids[0]))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Analysis deleted successfully");

    let body: Value = app
        .server
        .get("/api/url-analysis/history")
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert_eq!(body["pagination"]["total"], 2);
    let listed: Vec<&str> = body["analyses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert!(!listed.contains(&ids[0].as_str()));

    // deleting twice reports not found
    let response = app
        .server
        .delete(&format!("/api/url-analysis/{}", ids[0]))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

/// 测试历史记录的排序参数和超大页码
#[tokio::test]
async fn test_history_ordering_and_out_of_range_page() {
    let app = create_test_app().await;

    let mut ids = Vec::new();
    for i in 0..2 {
        let body: Value = app
            .server
            .post("/api/url-analysis/analyze")
            .add_header("Authorization", app.bearer())
            .json(&json!({ "url": format!("https://example.com/item-{}", i) }))
            .await
            .json();
        ids.push(body["analysisId"].as_str().unwrap().to_string());
    }

    let body: Value = app
        .server
        .get("/api/url-analysis/history")
        .add_query_param("sortBy", "createdAt")
        .add_query_param("order", "asc")
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert_eq!(body["analyses"][0]["id"], ids[0].as_str());
    assert_eq!(body["analyses"][1]["id"], ids[1].as_str());

    let response = app
        .server
        .get("/api/url-analysis/history")
        .add_query_param("page", "1000000000000000000")
        .add_query_param("limit", 100)
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["analyses"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 2);

    let response = app
        .server
        .get("/api/url-analysis/history")
        .add_query_param("sortBy", "url")
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

/// 测试进度事件回放
#[tokio::test]
async fn test_events_replay_after_sequence() {
    let app = create_test_app().await;

    let body: Value = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json();
    let id = body["analysisId"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/url-analysis/events/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["stage"], "queued");
    let sequence = events[0]["sequence"].as_i64().unwrap();

    let body: Value = app
        .server
        .get(&format!("/api/url-analysis/events/{}", id))
        .add_query_param("after", sequence)
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert!(body["events"].as_array().unwrap().is_empty());
}

/// 测试并发提交
///
/// 两个同时提交的请求得到两条互不相同的记录
#[tokio::test]
async fn test_concurrent_submissions_create_distinct_records() {
    let app = create_test_app().await;

    let first = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }));
    let second = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }));
    let (first, second) = tokio::join!(first.into_future(), second.into_future());

    let a: Value = first.json();
    let b: Value = second.json();
    assert_ne!(a["analysisId"], b["analysisId"]);

    let history: Value = app
        .server
        .get("/api/url-analysis/history")
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert_eq!(history["pagination"]["total"], 2);
}

/// 测试已完成分析的结果
#[tokio::test]
async fn test_completed_result_payload() {
    let app = create_test_app().await;

    let body: Value = app
        .server
        .post("/api/url-analysis/analyze")
        .add_header("Authorization", app.bearer())
        .json(&json!({ "url": "https://example.com" }))
        .await
        .json();
    let id = Uuid::parse_str(body["analysisId"].as_str().unwrap()).unwrap();

    app.analysis_repo
        .update(id, AnalysisUpdate::start(Utc::now().into()))
        .await
        .unwrap();
    app.analysis_repo
        .update(
            id,
            AnalysisUpdate::fail("Target unreachable: HTTP 503", Utc::now().into(), 12),
        )
        .await
        .unwrap();

    // failed analyses are never "ready"
    let response = app
        .server
        .get(&format!("/api/url-analysis/result/{}", id))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["status"], "failed");

    let status: Value = app
        .server
        .get(&format!("/api/url-analysis/status/{}", id))
        .add_header("Authorization", app.bearer())
        .await
        .json();
    assert_eq!(status["analysis"]["error"], "Target unreachable: HTTP 503");
}
