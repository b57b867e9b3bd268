// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScannerSettings;
use crate::domain::models::report::{score_from_findings, Finding, PerformanceReport, Severity};
use crate::scanners::html;
use crate::scanners::validators;
use crate::scanners::traits::{
    PageSnapshot, ScanContext, ScanOutput, Scanner, ScannerError, ScannerKind,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use scraper::Html;
use std::time::Instant;
use tracing::debug;
use url::Url;

/// 页面静态资源统计
#[derive(Debug, Default, PartialEq)]
pub struct ResourceStats {
    pub scripts: usize,
    pub stylesheets: usize,
    pub images: usize,
    pub render_blocking: usize,
}

/// 统计资源数量和 `<head>` 中的阻塞渲染资源
pub fn resource_stats(body: &str) -> ResourceStats {
    let doc = Html::parse_document(body);

    let blocking_scripts = html::select(&doc, "head script[src]")
        .iter()
        .filter(|s| {
            let value = s.value();
            value.attr("async").is_none()
                && value.attr("defer").is_none()
                && value.attr("type") != Some("module")
        })
        .count();
    let blocking_styles = html::select(&doc, "head link[rel=stylesheet]")
        .iter()
        .filter(|l| l.value().attr("media").map_or(true, |m| m == "all" || m == "screen"))
        .count();

    ResourceStats {
        scripts: html::count(&doc, "script[src]"),
        stylesheets: html::count(&doc, "link[rel=stylesheet]"),
        images: html::count(&doc, "img"),
        render_blocking: blocking_scripts + blocking_styles,
    }
}

/// 一次计时采样
#[derive(Debug, Clone)]
struct Sample {
    ttfb_ms: u64,
    content_encoding: Option<String>,
}

/// 性能扫描器
///
/// 首次抓取给出完整响应时间；深度分析时额外发起多次请求测量首字节时间。
/// 采样客户端不自动解压，以便读取服务端实际使用的压缩方式。
pub struct PerformanceScanner {
    client: reqwest::Client,
    deep_samples: usize,
    allow_private_targets: bool,
}

impl PerformanceScanner {
    pub fn new(settings: &ScannerSettings) -> Result<Self, reqwest::Error> {
        let client = validators::client_builder(settings)
            .no_gzip()
            .no_brotli()
            .build()?;
        Ok(Self {
            client,
            deep_samples: settings.performance_samples.max(1),
            allow_private_targets: settings.allow_private_targets,
        })
    }

    async fn sample(&self, url: &Url) -> Result<Sample, ScannerError> {
        if !self.allow_private_targets {
            validators::validate_target(url)
                .await
                .map_err(|e| ScannerError::Fetch(e.to_string()))?;
        }

        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT_ENCODING, "gzip, br")
            .send()
            .await?;
        let ttfb_ms = start.elapsed().as_millis() as u64;
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Sample {
            ttfb_ms,
            content_encoding,
        })
    }
}

#[async_trait]
impl Scanner for PerformanceScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Performance
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError> {
        let rounds = if ctx.options.deep_analysis {
            self.deep_samples
        } else {
            1
        };
        let url = &ctx.page.final_url;

        let mut samples = Vec::with_capacity(rounds);
        let mut last_error = None;
        for _ in 0..rounds {
            match self.sample(url).await {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    debug!(url = %url, error = %e, "Performance sample failed");
                    last_error = Some(e);
                }
            }
        }
        if samples.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(ScanOutput::Performance(build_report(&ctx.page, &samples)))
    }
}

fn build_report(page: &PageSnapshot, samples: &[Sample]) -> PerformanceReport {
    let stats = resource_stats(&page.body);
    let average_ttfb_ms = if samples.is_empty() {
        None
    } else {
        Some(samples.iter().map(|s| s.ttfb_ms).sum::<u64>() / samples.len() as u64)
    };
    let compression = samples.iter().find_map(|s| s.content_encoding.clone());
    let cache_control = page.header("cache-control").map(str::to_string);
    let page_size_bytes = page.body.len();

    let mut findings = Vec::new();
    if page.response_time_ms > 3000 {
        findings.push(Finding::new(
            "slow-response",
            Severity::High,
            format!("Page took {} ms to load", page.response_time_ms),
        ));
    } else if page.response_time_ms > 1000 {
        findings.push(Finding::new(
            "slow-response",
            Severity::Medium,
            format!("Page took {} ms to load", page.response_time_ms),
        ));
    }
    if let Some(ttfb) = average_ttfb_ms.filter(|t| *t > 800) {
        findings.push(Finding::new(
            "slow-ttfb",
            Severity::Medium,
            format!("Average time to first byte is {} ms", ttfb),
        ));
    }
    if page_size_bytes > 2 * 1024 * 1024 {
        findings.push(Finding::new(
            "heavy-page",
            Severity::Medium,
            format!("HTML document is {} KB", page_size_bytes / 1024),
        ));
    } else if page_size_bytes > 500 * 1024 {
        findings.push(Finding::new(
            "heavy-page",
            Severity::Low,
            format!("HTML document is {} KB", page_size_bytes / 1024),
        ));
    }
    if !samples.is_empty() && compression.is_none() {
        findings.push(Finding::new(
            "no-compression",
            Severity::Medium,
            "Response is not compressed with gzip or brotli",
        ));
    }
    if stats.render_blocking > 3 {
        findings.push(Finding::new(
            "render-blocking",
            Severity::Medium,
            format!("{} render-blocking resources in <head>", stats.render_blocking),
        ));
    } else if stats.render_blocking > 0 {
        findings.push(Finding::new(
            "render-blocking",
            Severity::Low,
            format!("{} render-blocking resources in <head>", stats.render_blocking),
        ));
    }
    if stats.scripts > 20 {
        findings.push(Finding::new(
            "many-scripts",
            Severity::Low,
            format!("{} external scripts", stats.scripts),
        ));
    }
    if cache_control.is_none() {
        findings.push(Finding::new(
            "no-cache-control",
            Severity::Low,
            "No Cache-Control header on the document",
        ));
    }

    PerformanceReport {
        score: score_from_findings(&findings),
        response_time_ms: page.response_time_ms,
        average_ttfb_ms,
        samples: samples.len(),
        page_size_bytes,
        script_count: stats.scripts,
        stylesheet_count: stats.stylesheets,
        image_count: stats.images,
        render_blocking_resources: stats.render_blocking,
        compression,
        cache_control,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::analysis::AnalysisOptions;
    use crate::scanners::testing::page;
    use std::sync::Arc;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_resource_stats() {
        let stats = resource_stats(
            r#"<html><head>
                <script src="/a.js"></script>
                <script src="/b.js" defer></script>
                <script src="/c.js" type="module"></script>
                <link rel="stylesheet" href="/a.css">
                <link rel="stylesheet" href="/print.css" media="print">
            </head><body><img src="x"><img src="y"><script src="/d.js"></script></body></html>"#,
        );
        assert_eq!(
            stats,
            ResourceStats {
                scripts: 4,
                stylesheets: 2,
                images: 2,
                render_blocking: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_deep_analysis_samples_and_detects_compression() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("accept-encoding", "gzip, br"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "br")
                    .set_body_bytes(vec![0u8; 8]),
            )
            .expect(3)
            .mount(&server)
            .await;

        let scanner = PerformanceScanner::new(&ScannerSettings {
            performance_samples: 3,
            allow_private_targets: true,
            ..Default::default()
        })
        .unwrap();
        let ctx = ScanContext {
            page: Arc::new(page(
                &server.uri(),
                "<html></html>",
                &[("cache-control", "max-age=60")],
            )),
            options: AnalysisOptions::default(),
        };

        let ScanOutput::Performance(report) = scanner.scan(&ctx).await.unwrap() else {
            panic!("unexpected output");
        };
        assert_eq!(report.samples, 3);
        assert_eq!(report.compression.as_deref(), Some("br"));
        assert!(report.average_ttfb_ms.is_some());
        assert!(report.findings.iter().all(|f| f.code != "no-compression"));
    }

    #[tokio::test]
    async fn test_shallow_analysis_single_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let scanner = PerformanceScanner::new(&ScannerSettings {
            allow_private_targets: true,
            ..Default::default()
        })
        .unwrap();
        let ctx = ScanContext {
            page: Arc::new(page(&server.uri(), "<html></html>", &[])),
            options: AnalysisOptions {
                deep_analysis: false,
                ..Default::default()
            },
        };

        let ScanOutput::Performance(report) = scanner.scan(&ctx).await.unwrap() else {
            panic!("unexpected output");
        };
        assert_eq!(report.samples, 1);
        let codes: Vec<&str> = report.findings.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"no-compression"));
        assert!(codes.contains(&"no-cache-control"));
    }

    #[tokio::test]
    async fn test_private_targets_are_not_sampled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let scanner = PerformanceScanner::new(&ScannerSettings::default()).unwrap();
        let by_name = server.uri().replace("127.0.0.1", "localhost");
        for url in [server.uri(), by_name] {
            let ctx = ScanContext {
                page: Arc::new(page(&url, "<html></html>", &[])),
                options: AnalysisOptions::default(),
            };
            let err = scanner.scan(&ctx).await.unwrap_err();
            assert!(err.to_string().contains("SSRF protection"), "{}", err);
        }
    }
}
