// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{score_from_findings, Finding, SeoReport, Severity};
use crate::scanners::html;
use crate::scanners::traits::{PageSnapshot, ScanContext, ScanOutput, Scanner, ScannerKind, ScannerError};
use async_trait::async_trait;
use scraper::Html;

const TITLE_RANGE: (usize, usize) = (10, 60);
const DESCRIPTION_RANGE: (usize, usize) = (50, 160);
const THIN_CONTENT_WORDS: usize = 300;

/// SEO 扫描器
///
/// 检查标题、描述、标题层级、规范链接、可索引性等页面内信号
pub struct SeoScanner;

#[async_trait]
impl Scanner for SeoScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Seo
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError> {
        Ok(ScanOutput::Seo(analyze(&ctx.page)))
    }
}

pub fn analyze(page: &PageSnapshot) -> SeoReport {
    let doc = Html::parse_document(&page.body);
    let mut findings = Vec::new();

    let title = html::first_text(&doc, "title");
    match &title {
        None => findings.push(Finding::new(
            "missing-title",
            Severity::High,
            "Page has no <title>",
        )),
        Some(t) => {
            let len = t.chars().count();
            if len < TITLE_RANGE.0 || len > TITLE_RANGE.1 {
                findings.push(Finding::new(
                    "title-length",
                    Severity::Low,
                    format!(
                        "Title is {} characters; {}-{} is recommended",
                        len, TITLE_RANGE.0, TITLE_RANGE.1
                    ),
                ));
            }
        }
    }

    let meta_description = html::meta_content(&doc, "description").filter(|d| !d.is_empty());
    match &meta_description {
        None => findings.push(Finding::new(
            "missing-meta-description",
            Severity::Medium,
            "Page has no meta description",
        )),
        Some(d) => {
            let len = d.chars().count();
            if len < DESCRIPTION_RANGE.0 || len > DESCRIPTION_RANGE.1 {
                findings.push(Finding::new(
                    "meta-description-length",
                    Severity::Low,
                    format!(
                        "Meta description is {} characters; {}-{} is recommended",
                        len, DESCRIPTION_RANGE.0, DESCRIPTION_RANGE.1
                    ),
                ));
            }
        }
    }

    let h1_count = html::count(&doc, "h1");
    if h1_count == 0 {
        findings.push(Finding::new("missing-h1", Severity::Medium, "Page has no <h1>"));
    } else if h1_count > 1 {
        findings.push(Finding::new(
            "multiple-h1",
            Severity::Low,
            format!("Page has {} <h1> elements", h1_count),
        ));
    }

    let canonical_url = html::first_attr(&doc, "link[rel=canonical]", "href");
    if canonical_url.is_none() {
        findings.push(Finding::new(
            "missing-canonical",
            Severity::Low,
            "No canonical link declared",
        ));
    }

    let language = html::first_attr(&doc, "html", "lang");
    if language.is_none() {
        findings.push(Finding::new(
            "missing-lang",
            Severity::Low,
            "The <html> element has no lang attribute",
        ));
    }

    let has_viewport = html::meta_content(&doc, "viewport").is_some();
    if !has_viewport {
        findings.push(Finding::new(
            "missing-viewport",
            Severity::Medium,
            "No viewport meta tag; the page may not be mobile friendly",
        ));
    }

    let has_open_graph = html::select(&doc, "meta[property]")
        .iter()
        .any(|el| el.value().attr("property").is_some_and(|p| p.starts_with("og:")));
    if !has_open_graph {
        findings.push(Finding::new(
            "missing-open-graph",
            Severity::Info,
            "No Open Graph metadata for social sharing",
        ));
    }

    let images_without_alt = html::select(&doc, "img")
        .iter()
        .filter(|img| img.value().attr("alt").is_none())
        .count();
    if images_without_alt > 0 {
        findings.push(Finding::new(
            "images-missing-alt",
            Severity::Low,
            format!("{} images have no alt attribute", images_without_alt),
        ));
    }

    let robots_meta = html::meta_content(&doc, "robots").unwrap_or_default();
    let robots_header = page.header("x-robots-tag").unwrap_or_default();
    let indexable = !robots_meta.to_ascii_lowercase().contains("noindex")
        && !robots_header.to_ascii_lowercase().contains("noindex");
    if !indexable {
        findings.push(Finding::new(
            "noindex",
            Severity::High,
            "Page asks search engines not to index it",
        ));
    }

    let word_count = html::visible_text(&doc).split_whitespace().count();
    if word_count < THIN_CONTENT_WORDS {
        findings.push(Finding::new(
            "thin-content",
            Severity::Low,
            format!("Only {} words of visible text", word_count),
        ));
    }

    SeoReport {
        score: score_from_findings(&findings),
        title,
        meta_description,
        canonical_url,
        language,
        h1_count,
        word_count,
        images_without_alt,
        has_viewport,
        has_open_graph,
        indexable,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::testing::page;

    #[test]
    fn test_well_formed_page() {
        let words = "word ".repeat(320);
        let body = format!(
            r#"<html lang="en"><head>
                <title>Example Domain Homepage</title>
                <meta name="description" content="An example page used for illustrative purposes in documents and tests.">
                <meta name="viewport" content="width=device-width">
                <meta property="og:title" content="Example">
                <link rel="canonical" href="https://example.com/">
            </head><body><h1>Example</h1><p>{}</p><img src="a.png" alt="A"></body></html>"#,
            words
        );
        let report = analyze(&page("https://example.com", &body, &[]));

        assert_eq!(report.title.as_deref(), Some("Example Domain Homepage"));
        assert_eq!(report.h1_count, 1);
        assert!(report.indexable);
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_bare_page_collects_findings() {
        let report = analyze(&page(
            "https://example.com",
            r#"<html><head><meta name="robots" content="noindex"></head><body><h1>a</h1><h1>b</h1><img src="x"></body></html>"#,
            &[],
        ));

        let codes: Vec<&str> = report.findings.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"missing-title"));
        assert!(codes.contains(&"missing-meta-description"));
        assert!(codes.contains(&"multiple-h1"));
        assert!(codes.contains(&"noindex"));
        assert!(codes.contains(&"images-missing-alt"));
        assert!(!report.indexable);
        assert!(report.score < 50);
    }

    #[test]
    fn test_noindex_header() {
        let report = analyze(&page(
            "https://example.com",
            "<html><title>Header driven page</title></html>",
            &[("x-robots-tag", "noindex, nofollow")],
        ));
        assert!(!report.indexable);
    }
}
