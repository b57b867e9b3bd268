// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::report::{AccessibilityReport, AccessibilityViolation, Severity};
use crate::scanners::html;
use crate::scanners::traits::{
    PageSnapshot, ScanContext, ScanOutput, Scanner, ScannerError, ScannerKind,
};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};

/// 可访问性扫描器
///
/// 基于静态 HTML 的 WCAG 2.1 规则子集，不执行脚本，也不计算颜色对比度。
pub struct AccessibilityScanner;

#[async_trait]
impl Scanner for AccessibilityScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Accessibility
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError> {
        Ok(ScanOutput::Accessibility(analyze(&ctx.page)))
    }
}

struct Rule {
    id: &'static str,
    wcag: &'static str,
    severity: Severity,
    message: &'static str,
}

const IMAGE_ALT: Rule = Rule {
    id: "image-alt",
    wcag: "1.1.1",
    severity: Severity::High,
    message: "Images must have alternate text",
};
const FORM_LABEL: Rule = Rule {
    id: "label",
    wcag: "4.1.2",
    severity: Severity::High,
    message: "Form fields must have an accessible label",
};
const LINK_NAME: Rule = Rule {
    id: "link-name",
    wcag: "2.4.4",
    severity: Severity::Medium,
    message: "Links must have discernible text",
};
const BUTTON_NAME: Rule = Rule {
    id: "button-name",
    wcag: "4.1.2",
    severity: Severity::Medium,
    message: "Buttons must have discernible text",
};
const HTML_LANG: Rule = Rule {
    id: "html-has-lang",
    wcag: "3.1.1",
    severity: Severity::Medium,
    message: "The <html> element must have a lang attribute",
};
const DOCUMENT_TITLE: Rule = Rule {
    id: "document-title",
    wcag: "2.4.2",
    severity: Severity::Medium,
    message: "Documents must have a <title>",
};
const FRAME_TITLE: Rule = Rule {
    id: "frame-title",
    wcag: "4.1.2",
    severity: Severity::Medium,
    message: "Frames must have a title attribute",
};
const HEADING_ORDER: Rule = Rule {
    id: "heading-order",
    wcag: "1.3.1",
    severity: Severity::Low,
    message: "Heading levels should only increase by one",
};
const DUPLICATE_ID: Rule = Rule {
    id: "duplicate-id",
    wcag: "4.1.1",
    severity: Severity::Low,
    message: "Element ids must be unique",
};
const ZOOM_DISABLED: Rule = Rule {
    id: "meta-viewport",
    wcag: "1.4.4",
    severity: Severity::Medium,
    message: "Zooming and scaling must not be disabled",
};
const POSITIVE_TABINDEX: Rule = Rule {
    id: "tabindex",
    wcag: "2.4.3",
    severity: Severity::Low,
    message: "Elements should not have a positive tabindex",
};

fn has_aria_name(el: &ElementRef) -> bool {
    let value = el.value();
    value
        .attr("aria-label")
        .is_some_and(|v| !v.trim().is_empty())
        || value.attr("aria-labelledby").is_some()
        || value.attr("title").is_some_and(|v| !v.trim().is_empty())
}

fn has_text(el: &ElementRef) -> bool {
    if el.text().any(|t| !t.trim().is_empty()) {
        return true;
    }
    // Image links are named by their alt text
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|child| {
            child.value().name() == "img"
                && child.value().attr("alt").is_some_and(|a| !a.trim().is_empty())
        })
}

fn inside_label(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "label")
}

pub fn analyze(page: &PageSnapshot) -> AccessibilityReport {
    let doc = Html::parse_document(&page.body);
    let mut counts: Vec<(&Rule, usize)> = Vec::new();
    let mut record = |rule: &'static Rule, occurrences: usize| {
        if occurrences > 0 {
            counts.push((rule, occurrences));
        }
    };

    record(
        &IMAGE_ALT,
        html::select(&doc, "img")
            .iter()
            .filter(|img| img.value().attr("alt").is_none() && !has_aria_name(img))
            .count(),
    );

    let labelled: HashSet<String> = html::select(&doc, "label[for]")
        .iter()
        .filter_map(|l| l.value().attr("for"))
        .map(str::to_string)
        .collect();
    record(
        &FORM_LABEL,
        html::select(&doc, "input, select, textarea")
            .iter()
            .filter(|field| {
                let input_type = field.value().attr("type").unwrap_or("text");
                !matches!(input_type, "hidden" | "submit" | "button" | "reset" | "image")
            })
            .filter(|field| {
                let by_for = field
                    .value()
                    .attr("id")
                    .is_some_and(|id| labelled.contains(id));
                !by_for && !inside_label(field) && !has_aria_name(field)
            })
            .count(),
    );

    record(
        &LINK_NAME,
        html::select(&doc, "a[href]")
            .iter()
            .filter(|a| !has_text(a) && !has_aria_name(a))
            .count(),
    );

    record(
        &BUTTON_NAME,
        html::select(&doc, "button")
            .iter()
            .filter(|b| !has_text(b) && !has_aria_name(b))
            .count(),
    );

    record(
        &HTML_LANG,
        usize::from(html::first_attr(&doc, "html", "lang").is_none()),
    );

    record(
        &DOCUMENT_TITLE,
        usize::from(html::first_text(&doc, "title").is_none()),
    );

    record(
        &FRAME_TITLE,
        html::select(&doc, "iframe, frame")
            .iter()
            .filter(|f| f.value().attr("title").map_or(true, |t| t.trim().is_empty()))
            .count(),
    );

    let mut skipped = 0;
    let mut previous: Option<u8> = None;
    for heading in html::select(&doc, "h1, h2, h3, h4, h5, h6") {
        let level = heading.value().name()[1..].parse::<u8>().unwrap_or(1);
        if let Some(prev) = previous {
            if level > prev + 1 {
                skipped += 1;
            }
        }
        previous = Some(level);
    }
    record(&HEADING_ORDER, skipped);

    let mut ids: HashMap<&str, usize> = HashMap::new();
    let all = html::select(&doc, "[id]");
    for el in &all {
        if let Some(id) = el.value().attr("id") {
            *ids.entry(id).or_default() += 1;
        }
    }
    record(&DUPLICATE_ID, ids.values().filter(|n| **n > 1).count());

    let zoom_disabled = html::meta_content(&doc, "viewport").is_some_and(|v| {
        let v = v.to_ascii_lowercase().replace(' ', "");
        v.contains("user-scalable=no")
            || v.contains("user-scalable=0")
            || v.contains("maximum-scale=1,")
            || v.ends_with("maximum-scale=1")
            || v.contains("maximum-scale=1.0")
    });
    record(&ZOOM_DISABLED, usize::from(zoom_disabled));

    record(
        &POSITIVE_TABINDEX,
        html::select(&doc, "[tabindex]")
            .iter()
            .filter(|el| {
                el.value()
                    .attr("tabindex")
                    .and_then(|t| t.trim().parse::<i32>().ok())
                    .is_some_and(|t| t > 0)
            })
            .count(),
    );

    let violations: Vec<AccessibilityViolation> = counts
        .into_iter()
        .map(|(rule, occurrences)| AccessibilityViolation {
            rule: rule.id.to_string(),
            wcag: rule.wcag.to_string(),
            severity: rule.severity,
            occurrences,
            message: rule.message.to_string(),
        })
        .collect();

    let penalty: u32 = violations.iter().map(|v| v.severity.penalty()).sum();

    AccessibilityReport {
        score: 100u32.saturating_sub(penalty) as u8,
        violations,
        elements_checked: html::count(&doc, "*"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::testing::page;

    fn rules(report: &AccessibilityReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn test_accessible_page_has_no_violations() {
        let report = analyze(&page(
            "https://example.com",
            r#"<html lang="en"><head><title>Accessible</title></head><body>
                <h1>Title</h1><h2>Section</h2>
                <img src="a.png" alt="Logo">
                <label for="email">Email</label><input id="email" type="email">
                <label>Name <input type="text"></label>
                <input type="hidden" name="csrf">
                <a href="/about">About us</a>
                <a href="/"><img src="home.png" alt="Home"></a>
                <button aria-label="Close"></button>
            </body></html>"#,
            &[],
        ));
        assert!(report.violations.is_empty(), "{:?}", report.violations);
        assert_eq!(report.score, 100);
        assert!(report.elements_checked > 10);
    }

    #[test]
    fn test_common_violations() {
        let report = analyze(&page(
            "https://example.com",
            r#"<html><head><meta name="viewport" content="width=device-width, user-scalable=no"></head><body>
                <h1>Title</h1><h4>Deep</h4>
                <img src="a.png"><img src="b.png">
                <input type="text">
                <a href="/x"></a>
                <button></button>
                <iframe src="/embed"></iframe>
                <div id="dup"></div><div id="dup"></div>
                <div tabindex="3">focus</div>
            </body></html>"#,
            &[],
        ));

        let found = rules(&report);
        for expected in [
            "image-alt",
            "label",
            "link-name",
            "button-name",
            "html-has-lang",
            "document-title",
            "frame-title",
            "heading-order",
            "duplicate-id",
            "meta-viewport",
            "tabindex",
        ] {
            assert!(found.contains(&expected), "missing {}", expected);
        }

        let images = report
            .violations
            .iter()
            .find(|v| v.rule == "image-alt")
            .unwrap();
        assert_eq!(images.occurrences, 2);
        assert_eq!(images.wcag, "1.1.1");
        // 2 high, 6 medium, 3 low
        assert_eq!(report.score, 13);
    }
}
