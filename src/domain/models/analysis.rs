// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::report::AnalysisReport;

/// 分析记录实体
///
/// 每个分析请求对应一条记录，从提交开始跟踪到完成或失败。
/// 结果字段只由分析工作器写入，请求 API 只读取。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// 分析唯一标识符，创建后不可变
    pub id: Uuid,
    /// 提交者ID，所有读取和删除都按此字段隔离
    pub owner_id: Uuid,
    /// 目标URL（仅 http/https）
    pub url: String,
    /// 创建时校验的分析选项，之后不可变
    pub options: AnalysisOptions,
    /// 当前状态
    pub status: AnalysisStatus,
    /// 进度（0-100）
    pub progress: i32,
    /// 分析结果，完成前各部分为空
    pub report: AnalysisReport,
    /// 置信度（0.0-1.0），由成功的子分析数量决定
    pub confidence_score: Option<f64>,
    /// 失败原因，仅在 failed 状态下存在
    pub error_message: Option<String>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 工作器开始执行的时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 进入终态的时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 从创建到终态的耗时（毫秒）
    pub duration_ms: Option<i64>,
    /// 最后更新时间
    pub updated_at: DateTime<FixedOffset>,
}

impl AnalysisRecord {
    /// 创建一条待处理的分析记录
    pub fn new(owner_id: Uuid, url: String, options: AnalysisOptions) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            url,
            options,
            status: AnalysisStatus::Pending,
            progress: 0,
            report: AnalysisReport::default(),
            confidence_score: None,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            updated_at: now,
        }
    }

    /// 记录从创建到 `finished_at` 的耗时（毫秒）
    pub fn elapsed_ms(&self, finished_at: DateTime<FixedOffset>) -> i64 {
        (finished_at - self.created_at).num_milliseconds().max(0)
    }
}

/// 分析状态
///
/// 状态只能向前流转：
/// Pending → Running → Completed/Failed，Pending 也可直接进入 Failed。
/// Running → Running 用于任务重新投递后的重新执行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// 已创建，等待工作器领取
    #[default]
    Pending,
    /// 工作器执行中
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
}

impl AnalysisStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// 能够流转到 `target` 的源状态集合
    pub fn sources_for(target: AnalysisStatus) -> &'static [AnalysisStatus] {
        match target {
            AnalysisStatus::Pending => &[],
            AnalysisStatus::Running => &[AnalysisStatus::Pending, AnalysisStatus::Running],
            AnalysisStatus::Completed => &[AnalysisStatus::Running],
            AnalysisStatus::Failed => &[AnalysisStatus::Pending, AnalysisStatus::Running],
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisStatus::Pending => write!(f, "pending"),
            AnalysisStatus::Running => write!(f, "running"),
            AnalysisStatus::Completed => write!(f, "completed"),
            AnalysisStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for AnalysisStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "running" => Ok(AnalysisStatus::Running),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            _ => Err(()),
        }
    }
}

/// AI 分析视角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiProfile {
    /// 面向工程团队
    Technical,
    /// 面向业务决策者
    Business,
    /// 兼顾两者
    #[default]
    Mixed,
}

impl fmt::Display for AiProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AiProfile::Technical => write!(f, "technical"),
            AiProfile::Business => write!(f, "business"),
            AiProfile::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for AiProfile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(AiProfile::Technical),
            "business" => Ok(AiProfile::Business),
            "mixed" => Ok(AiProfile::Mixed),
            other => Err(DomainError::ValidationError(format!(
                "aiProfile must be technical, business, or mixed (got '{}')",
                other
            ))),
        }
    }
}

/// 分析选项
///
/// 创建时校验，之后随记录和任务一起保存，不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// 是否截图（仅记录，服务本身不做截图）
    pub include_screenshots: bool,
    /// 深度分析：性能扫描多次采样
    pub deep_analysis: bool,
    /// AI 分析视角
    pub ai_profile: AiProfile,
    pub include_performance: bool,
    pub include_seo: bool,
    pub include_accessibility: bool,
    pub include_security: bool,
    pub include_technologies: bool,
    /// AI 增强失败时是否让整个分析失败
    pub require_ai_insights: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_screenshots: false,
            deep_analysis: true,
            ai_profile: AiProfile::Mixed,
            include_performance: true,
            include_seo: true,
            include_accessibility: true,
            include_security: true,
            include_technologies: true,
            require_ai_insights: false,
        }
    }
}

impl AnalysisOptions {
    /// 启用的扫描器数量
    pub fn enabled_scanner_count(&self) -> usize {
        [
            self.include_performance,
            self.include_seo,
            self.include_accessibility,
            self.include_security,
            self.include_technologies,
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}
