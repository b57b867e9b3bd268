// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::analysis::AiProfile;

/// 分析结果
///
/// 每个部分都可能为空：扫描器失败或未启用时对应字段为 `None`，
/// AI 增强失败时 AI 相关字段为 `None`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub title: Option<String>,
    pub basic: Option<BasicWebsiteData>,
    pub technologies: Option<TechnologyReport>,
    pub performance: Option<PerformanceReport>,
    pub seo: Option<SeoReport>,
    pub accessibility: Option<AccessibilityReport>,
    pub security: Option<SecurityReport>,
    pub ai_insights: Option<AiInsights>,
    pub business_recommendations: Option<Vec<Recommendation>>,
    pub technical_recommendations: Option<Vec<Recommendation>>,
    pub risk_assessment: Option<RiskAssessment>,
}

impl AnalysisReport {
    /// 写入 AI 增强结果
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.ai_insights = Some(enrichment.insights);
        self.business_recommendations = Some(enrichment.business_recommendations);
        self.technical_recommendations = Some(enrichment.technical_recommendations);
        self.risk_assessment = Some(enrichment.risk_assessment);
    }
}

/// 目标页面的基础抓取信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicWebsiteData {
    pub final_url: String,
    pub status_code: u16,
    pub content_type: String,
    pub content_length: usize,
    pub response_time_ms: u64,
    pub redirected: bool,
}

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// 该严重程度对评分的扣分
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Info => 0,
            Severity::Low => 3,
            Severity::Medium => 8,
            Severity::High => 15,
            Severity::Critical => 25,
        }
    }
}

/// 扫描器发现的单个问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(code: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message: message.into(),
        }
    }
}

/// 由问题列表计算 0-100 的评分
pub fn score_from_findings(findings: &[Finding]) -> u8 {
    let penalty: u32 = findings.iter().map(|f| f.severity.penalty()).sum();
    100u32.saturating_sub(penalty) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
    /// 检测依据（header、meta、script 等）
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyReport {
    pub technologies: Vec<Technology>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub score: u8,
    /// 首次抓取的完整响应时间
    pub response_time_ms: u64,
    /// 采样得到的平均首字节时间
    pub average_ttfb_ms: Option<u64>,
    pub samples: usize,
    pub page_size_bytes: usize,
    pub script_count: usize,
    pub stylesheet_count: usize,
    pub image_count: usize,
    pub render_blocking_resources: usize,
    pub compression: Option<String>,
    pub cache_control: Option<String>,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoReport {
    pub score: u8,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub language: Option<String>,
    pub h1_count: usize,
    pub word_count: usize,
    pub images_without_alt: usize,
    pub has_viewport: bool,
    pub has_open_graph: bool,
    pub indexable: bool,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityViolation {
    pub rule: String,
    /// WCAG 成功准则编号
    pub wcag: String,
    pub severity: Severity,
    pub occurrences: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityReport {
    pub score: u8,
    pub violations: Vec<AccessibilityViolation>,
    pub elements_checked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub score: u8,
    pub grade: String,
    pub https: bool,
    pub present_headers: Vec<String>,
    pub missing_headers: Vec<String>,
    pub insecure_cookies: usize,
    pub mixed_content: usize,
    pub findings: Vec<Finding>,
}

/// AI 生成的整体洞察
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub profile: AiProfile,
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub impact: Option<String>,
}

fn default_priority() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: String,
    pub score: u8,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// AI 增强步骤的完整输出
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub insights: AiInsights,
    pub business_recommendations: Vec<Recommendation>,
    pub technical_recommendations: Vec<Recommendation>,
    pub risk_assessment: RiskAssessment,
}
