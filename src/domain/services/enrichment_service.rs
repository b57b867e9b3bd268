// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::analysis::AiProfile;
use crate::domain::models::report::{
    AiInsights, AnalysisReport, Enrichment, Finding, Recommendation, RiskAssessment,
};
use crate::domain::services::llm_service::LLMServiceTrait;

/// 每个扫描部分最多送给模型的发现数量
const MAX_FINDINGS_PER_SECTION: usize = 8;

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("AI enrichment is not configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// AI 增强服务
///
/// 根据扫描结果和分析视角生成洞察、建议和风险评估。
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn enrich(
        &self,
        url: &str,
        report: &AnalysisReport,
        profile: AiProfile,
    ) -> Result<Enrichment, EnrichmentError>;
}

#[async_trait]
impl<T: EnrichmentService + ?Sized> EnrichmentService for Arc<T> {
    async fn enrich(
        &self,
        url: &str,
        report: &AnalysisReport,
        profile: AiProfile,
    ) -> Result<Enrichment, EnrichmentError> {
        (**self).enrich(url, report, profile).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichmentPayload {
    summary: String,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    business_recommendations: Vec<Recommendation>,
    #[serde(default)]
    technical_recommendations: Vec<Recommendation>,
    risk_assessment: RiskPayload,
}

#[derive(Debug, Deserialize)]
struct RiskPayload {
    level: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    factors: Vec<String>,
}

/// 基于 LLM 的增强实现
pub struct LlmEnrichmentService {
    llm: Arc<dyn LLMServiceTrait>,
    configured: bool,
}

impl LlmEnrichmentService {
    /// `configured` 为 false 时直接返回 [`EnrichmentError::NotConfigured`]，不发起请求
    pub fn new(llm: Arc<dyn LLMServiceTrait>, configured: bool) -> Self {
        Self { llm, configured }
    }

    fn system_prompt(profile: AiProfile) -> String {
        let focus = match profile {
            AiProfile::Technical => {
                "Your audience is an engineering team. Focus on concrete technical fixes, \
                 performance bottlenecks, security hardening and standards compliance. \
                 Keep businessRecommendations short or empty."
            }
            AiProfile::Business => {
                "Your audience is business stakeholders. Focus on conversion, brand trust, \
                 search visibility, legal exposure and return on investment. Avoid jargon \
                 and keep technicalRecommendations short."
            }
            AiProfile::Mixed => {
                "Your audience includes both engineers and business stakeholders. Balance \
                 technical fixes with their business impact."
            }
        };
        format!(
            "You are a senior website auditor. {focus} \
             Respond with a single JSON object with exactly these keys: \
             \"summary\" (string), \"highlights\" (array of strings), \
             \"businessRecommendations\" and \"technicalRecommendations\" (arrays of objects \
             with \"title\", \"description\", \"priority\" one of high|medium|low, \"impact\"), \
             \"riskAssessment\" (object with \"level\" one of low|medium|high|critical, \
             \"score\" integer 0-100 where higher is riskier, \"factors\" array of strings)."
        )
    }

    fn user_prompt(url: &str, report: &AnalysisReport) -> String {
        let digest = digest(report);
        format!(
            "Analyze the website {} using these automated scan results:\n{}",
            url,
            serde_json::to_string_pretty(&digest).unwrap_or_else(|_| digest.to_string())
        )
    }
}

fn top_findings(findings: &[Finding]) -> Vec<Value> {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| b.severity.penalty().cmp(&a.severity.penalty()));
    sorted
        .into_iter()
        .take(MAX_FINDINGS_PER_SECTION)
        .map(|f| json!({"severity": f.severity, "message": f.message}))
        .collect()
}

/// 把报告压缩成送给模型的摘要，只保留分数和主要问题
fn digest(report: &AnalysisReport) -> Value {
    json!({
        "title": report.title,
        "basic": report.basic.as_ref().map(|b| json!({
            "finalUrl": b.final_url,
            "statusCode": b.status_code,
            "responseTimeMs": b.response_time_ms,
        })),
        "technologies": report.technologies.as_ref().map(|t| {
            t.technologies
                .iter()
                .map(|tech| match &tech.version {
                    Some(v) => format!("{} {} ({})", tech.name, v, tech.category),
                    None => format!("{} ({})", tech.name, tech.category),
                })
                .collect::<Vec<_>>()
        }),
        "performance": report.performance.as_ref().map(|p| json!({
            "score": p.score,
            "responseTimeMs": p.response_time_ms,
            "pageSizeBytes": p.page_size_bytes,
            "issues": top_findings(&p.findings),
        })),
        "seo": report.seo.as_ref().map(|s| json!({
            "score": s.score,
            "issues": top_findings(&s.findings),
        })),
        "accessibility": report.accessibility.as_ref().map(|a| json!({
            "score": a.score,
            "violations": a.violations
                .iter()
                .take(MAX_FINDINGS_PER_SECTION)
                .map(|v| format!("{} (WCAG {}, {} occurrences)", v.message, v.wcag, v.occurrences))
                .collect::<Vec<_>>(),
        })),
        "security": report.security.as_ref().map(|s| json!({
            "score": s.score,
            "grade": s.grade,
            "issues": top_findings(&s.findings),
        })),
    })
}

#[async_trait]
impl EnrichmentService for LlmEnrichmentService {
    async fn enrich(
        &self,
        url: &str,
        report: &AnalysisReport,
        profile: AiProfile,
    ) -> Result<Enrichment, EnrichmentError> {
        if !self.configured {
            return Err(EnrichmentError::NotConfigured);
        }

        let (value, usage) = self
            .llm
            .complete_json(&Self::system_prompt(profile), &Self::user_prompt(url, report))
            .await
            .map_err(|e| EnrichmentError::Llm(format!("{:#}", e)))?;
        debug!(
            url,
            profile = %profile,
            total_tokens = usage.total_tokens,
            "Enrichment response received"
        );

        let payload: EnrichmentPayload = serde_json::from_value(value)
            .map_err(|e| EnrichmentError::InvalidResponse(e.to_string()))?;
        if payload.summary.trim().is_empty() {
            return Err(EnrichmentError::InvalidResponse(
                "summary is empty".to_string(),
            ));
        }

        Ok(Enrichment {
            insights: AiInsights {
                profile,
                summary: payload.summary,
                highlights: payload.highlights,
                model: Some(self.llm.model().to_string()),
            },
            business_recommendations: payload.business_recommendations,
            technical_recommendations: payload.technical_recommendations,
            risk_assessment: RiskAssessment {
                level: payload.risk_assessment.level.to_ascii_lowercase(),
                score: payload.risk_assessment.score.clamp(0.0, 100.0).round() as u8,
                factors: payload.risk_assessment.factors,
            },
        })
    }
}
