// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::analysis::{AnalysisRecord, AnalysisStatus};
use crate::domain::models::progress::{ProgressEvent, ProgressStage};
use crate::domain::models::report::{
    AccessibilityReport, AiInsights, BasicWebsiteData, PerformanceReport, Recommendation,
    RiskAssessment, SecurityReport, SeoReport, TechnologyReport,
};

/// 提交成功后的响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponseDto {
    pub success: bool,
    pub analysis_id: Uuid,
    pub status: String,
    pub message: String,
    pub estimated_time: String,
}

impl AnalyzeResponseDto {
    pub fn queued(analysis_id: Uuid) -> Self {
        Self {
            success: true,
            analysis_id,
            status: "queued".to_string(),
            message: "Website analysis queued".to_string(),
            estimated_time: "30-60 seconds".to_string(),
        }
    }
}

/// 状态查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatusDto {
    pub id: Uuid,
    pub url: String,
    pub status: AnalysisStatus,
    pub progress: i32,
    /// 提交时间
    pub started_at: DateTime<FixedOffset>,
    /// 工作器实际开始执行的时间
    pub running_since: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub error: Option<String>,
}

impl From<&AnalysisRecord> for AnalysisStatusDto {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            id: record.id,
            url: record.url.clone(),
            status: record.status,
            progress: record.progress,
            started_at: record.created_at,
            running_since: record.started_at,
            completed_at: record.completed_at,
            error: record.error_message.clone(),
        }
    }
}

/// 完整分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultDto {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub status: AnalysisStatus,
    pub technologies: Option<TechnologyReport>,
    pub basic: Option<BasicWebsiteData>,
    pub performance: Option<PerformanceReport>,
    pub seo: Option<SeoReport>,
    pub accessibility: Option<AccessibilityReport>,
    pub security: Option<SecurityReport>,
    pub ai_insights: Option<AiInsights>,
    pub business_recommendations: Option<Vec<Recommendation>>,
    pub technical_recommendations: Option<Vec<Recommendation>>,
    pub risk_assessment: Option<RiskAssessment>,
    pub analysis_date: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 耗时（毫秒）
    pub duration: Option<i64>,
    pub confidence_score: Option<f64>,
}

impl From<AnalysisRecord> for AnalysisResultDto {
    fn from(record: AnalysisRecord) -> Self {
        let report = record.report;
        Self {
            id: record.id,
            url: record.url,
            title: report.title,
            status: record.status,
            technologies: report.technologies,
            basic: report.basic,
            performance: report.performance,
            seo: report.seo,
            accessibility: report.accessibility,
            security: report.security,
            ai_insights: report.ai_insights,
            business_recommendations: report.business_recommendations,
            technical_recommendations: report.technical_recommendations,
            risk_assessment: report.risk_assessment,
            analysis_date: record.created_at,
            completed_at: record.completed_at,
            duration: record.duration_ms,
            confidence_score: record.confidence_score,
        }
    }
}

/// 历史列表中的单条摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummaryDto {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub technologies: Option<TechnologyReport>,
    pub confidence_score: Option<f64>,
}

impl From<AnalysisRecord> for AnalysisSummaryDto {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            url: record.url,
            title: record.report.title,
            status: record.status,
            created_at: record.created_at,
            completed_at: record.completed_at,
            technologies: record.report.technologies,
            confidence_score: record.confidence_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl PaginationDto {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// 分页的历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisHistoryDto {
    pub analyses: Vec<AnalysisSummaryDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEventDto {
    pub sequence: i32,
    pub status: AnalysisStatus,
    pub progress: i32,
    pub stage: ProgressStage,
    pub message: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<ProgressEvent> for ProgressEventDto {
    fn from(event: ProgressEvent) -> Self {
        Self {
            sequence: event.sequence,
            status: event.status,
            progress: event.progress,
            stage: event.stage,
            message: event.message,
            created_at: event.created_at,
        }
    }
}
