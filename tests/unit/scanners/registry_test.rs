// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use analyzrs::config::settings::ScannerSettings;
use analyzrs::domain::models::analysis::AnalysisOptions;
use analyzrs::domain::models::report::AnalysisReport;
use analyzrs::scanners::fetcher::{HttpFetcher, PageFetcher};
use analyzrs::scanners::registry::ScannerRegistry;
use analyzrs::scanners::traits::ScanContext;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_PAGE: &str = r#"<html>
<head>
  <title>My blog</title>
  <meta name="generator" content="WordPress 6.4.2">
  <link rel="stylesheet" href="/wp-content/themes/twenty/style.css">
</head>
<body>
  <h2>Latest posts</h2>
  <img src="/wp-content/uploads/cat.png">
  <a href="/page/2"></a>
</body>
</html>"#;

/// 默认扫描器组合
///
/// 通过真实 HTTP 抓取一个 WordPress 站点，各扫描器结果合并到同一份报告中
#[tokio::test]
async fn test_default_registry_on_fetched_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(BLOG_PAGE),
        )
        .mount(&server)
        .await;

    let settings = ScannerSettings {
        allow_private_targets: true,
        performance_samples: 1,
        ..ScannerSettings::default()
    };
    let fetcher = HttpFetcher::new(settings.clone()).unwrap();
    let page = fetcher.fetch(&format!("{}/", server.uri())).await.unwrap();

    let registry = ScannerRegistry::with_defaults(&settings, Duration::from_secs(10)).unwrap();
    let ctx = ScanContext {
        page: Arc::new(page),
        options: AnalysisOptions::default(),
    };

    let mut report = AnalysisReport::default();
    let mut results = registry.launch(ctx);
    let mut settled = 0;
    while let Some((kind, result)) = results.next().await {
        settled += 1;
        let output = result.unwrap_or_else(|e| panic!("{} failed: {}", kind, e));
        output.apply_to(&mut report);
    }
    assert_eq!(settled, 5);

    let technologies = report.technologies.unwrap().technologies;
    let wordpress = technologies
        .iter()
        .find(|t| t.name == "WordPress")
        .expect("WordPress detected");
    assert_eq!(wordpress.version.as_deref(), Some("6.4.2"));

    let seo = report.seo.unwrap();
    assert_eq!(seo.title.as_deref(), Some("My blog"));
    assert!(seo.meta_description.is_none());
    assert_eq!(seo.images_without_alt, 1);
    assert!(!seo.has_viewport);
    assert!(seo.score < 100);

    let security = report.security.unwrap();
    assert!(!security.https);
    assert!(security
        .missing_headers
        .contains(&"content-security-policy".to_string()));

    let accessibility = report.accessibility.unwrap();
    assert!(!accessibility.violations.is_empty());
    assert!(accessibility.score < 100);

    let performance = report.performance.unwrap();
    assert_eq!(performance.stylesheet_count, 1);
    assert_eq!(performance.image_count, 1);
}

/// 只启用部分扫描器时其余部分保持为空
#[tokio::test]
async fn test_disabled_scanners_leave_sections_empty() {
    let settings = ScannerSettings::default();
    let registry = ScannerRegistry::with_defaults(&settings, Duration::from_secs(5)).unwrap();

    let options = AnalysisOptions {
        include_performance: false,
        include_accessibility: false,
        include_security: false,
        include_technologies: false,
        ..AnalysisOptions::default()
    };
    assert_eq!(registry.enabled(&options).len(), 1);
}
