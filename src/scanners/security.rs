// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{score_from_findings, Finding, SecurityReport, Severity};
use crate::scanners::html;
use crate::scanners::traits::{
    PageSnapshot, ScanContext, ScanOutput, Scanner, ScannerError, ScannerKind,
};
use async_trait::async_trait;
use scraper::Html;

/// 需要检查的安全响应头：(header, 严重程度, 缺失时的说明)
const SECURITY_HEADERS: &[(&str, Severity, &str)] = &[
    (
        "strict-transport-security",
        Severity::Medium,
        "HSTS is not enabled",
    ),
    (
        "content-security-policy",
        Severity::Medium,
        "No Content-Security-Policy",
    ),
    (
        "x-frame-options",
        Severity::Medium,
        "No clickjacking protection (X-Frame-Options or frame-ancestors)",
    ),
    (
        "x-content-type-options",
        Severity::Low,
        "X-Content-Type-Options: nosniff is missing",
    ),
    ("referrer-policy", Severity::Low, "No Referrer-Policy"),
    ("permissions-policy", Severity::Low, "No Permissions-Policy"),
];

/// 安全扫描器
///
/// 被动检查：响应头、Cookie 属性、混合内容和信息泄露，不做任何主动探测
pub struct SecurityScanner;

#[async_trait]
impl Scanner for SecurityScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Security
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError> {
        Ok(ScanOutput::Security(analyze(&ctx.page)))
    }
}

fn header_present(page: &PageSnapshot, name: &str) -> bool {
    match name {
        "x-frame-options" => {
            page.header(name).is_some()
                || page
                    .header("content-security-policy")
                    .is_some_and(|csp| csp.contains("frame-ancestors"))
        }
        "x-content-type-options" => page
            .header(name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("nosniff")),
        _ => page.header(name).is_some(),
    }
}

fn insecure_cookie(cookie: &str, https: bool) -> bool {
    let attributes: Vec<String> = cookie
        .split(';')
        .skip(1)
        .map(|a| a.trim().to_ascii_lowercase())
        .collect();
    let has = |name: &str| attributes.iter().any(|a| a == name || a.starts_with(&format!("{}=", name)));

    !has("httponly") || !has("samesite") || (https && !has("secure"))
}

fn mixed_content(doc: &Html) -> usize {
    let mut count = 0;
    for (css, attr) in [
        ("script[src]", "src"),
        ("img[src]", "src"),
        ("iframe[src]", "src"),
        ("audio[src]", "src"),
        ("video[src]", "src"),
        ("source[src]", "src"),
        ("link[rel=stylesheet]", "href"),
        ("form[action]", "action"),
    ] {
        count += html::select(doc, css)
            .iter()
            .filter_map(|el| el.value().attr(attr))
            .filter(|v| v.trim().to_ascii_lowercase().starts_with("http://"))
            .count();
    }
    count
}

pub fn grade(score: u8) -> &'static str {
    match score {
        90..=100 => "A",
        80..=89 => "B",
        70..=79 => "C",
        60..=69 => "D",
        _ => "F",
    }
}

pub fn analyze(page: &PageSnapshot) -> SecurityReport {
    let https = page.is_https();
    let mut findings = Vec::new();

    if !https {
        findings.push(Finding::new(
            "no-https",
            Severity::Critical,
            "Page is served over plain HTTP",
        ));
    }

    let mut present_headers = Vec::new();
    let mut missing_headers = Vec::new();
    for (name, severity, message) in SECURITY_HEADERS {
        // HSTS is ignored by browsers on plain HTTP, no-https already covers it
        if *name == "strict-transport-security" && !https {
            continue;
        }
        if header_present(page, name) {
            present_headers.push(name.to_string());
        } else {
            missing_headers.push(name.to_string());
            findings.push(Finding::new(&format!("missing-{}", name), *severity, *message));
        }
    }

    if let Some(server) = page.header("server") {
        if server.chars().any(|c| c.is_ascii_digit()) {
            findings.push(Finding::new(
                "server-version-disclosure",
                Severity::Low,
                format!("Server header discloses a version: {}", server),
            ));
        }
    }
    if let Some(powered_by) = page.header("x-powered-by") {
        findings.push(Finding::new(
            "x-powered-by-disclosure",
            Severity::Low,
            format!("X-Powered-By discloses the stack: {}", powered_by),
        ));
    }

    let insecure_cookies = page
        .set_cookies
        .iter()
        .filter(|c| insecure_cookie(c, https))
        .count();
    if insecure_cookies > 0 {
        findings.push(Finding::new(
            "insecure-cookies",
            Severity::Medium,
            format!(
                "{} cookies lack Secure, HttpOnly or SameSite attributes",
                insecure_cookies
            ),
        ));
    }

    let mixed = if https {
        let doc = Html::parse_document(&page.body);
        mixed_content(&doc)
    } else {
        0
    };
    if mixed > 0 {
        findings.push(Finding::new(
            "mixed-content",
            Severity::High,
            format!("{} resources are loaded over HTTP from an HTTPS page", mixed),
        ));
    }

    let score = score_from_findings(&findings);
    SecurityReport {
        score,
        grade: grade(score).to_string(),
        https,
        present_headers,
        missing_headers,
        insecure_cookies,
        mixed_content: mixed,
        findings,
    }
}
