// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::analysis::{AnalysisRecord, AnalysisStatus};
use crate::domain::models::progress::ProgressEvent;
use crate::domain::models::report::AnalysisReport;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 记录存在，但当前状态不允许该更新（例如已处于终态）
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// 分析记录的部分更新
///
/// 只有为 `Some` 的字段会被写入。带 `status` 的更新只在记录处于
/// 合法源状态时生效，不带 `status` 的更新只作用于非终态记录。
#[derive(Debug, Clone, Default)]
pub struct AnalysisUpdate {
    pub status: Option<AnalysisStatus>,
    pub progress: Option<i32>,
    pub report: Option<AnalysisReport>,
    pub confidence_score: Option<f64>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub duration_ms: Option<i64>,
}

impl AnalysisUpdate {
    /// 工作器开始（或重新开始）执行
    pub fn start(now: DateTime<FixedOffset>) -> Self {
        Self {
            status: Some(AnalysisStatus::Running),
            progress: Some(0),
            started_at: Some(now),
            ..Default::default()
        }
    }

    pub fn progress(progress: i32) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn complete(
        report: AnalysisReport,
        confidence_score: f64,
        completed_at: DateTime<FixedOffset>,
        duration_ms: i64,
    ) -> Self {
        Self {
            status: Some(AnalysisStatus::Completed),
            progress: Some(100),
            report: Some(report),
            confidence_score: Some(confidence_score),
            completed_at: Some(completed_at),
            duration_ms: Some(duration_ms),
            ..Default::default()
        }
    }

    pub fn fail(
        message: impl Into<String>,
        completed_at: DateTime<FixedOffset>,
        duration_ms: i64,
    ) -> Self {
        Self {
            status: Some(AnalysisStatus::Failed),
            error_message: Some(message.into()),
            completed_at: Some(completed_at),
            duration_ms: Some(duration_ms),
            ..Default::default()
        }
    }

    /// 更新生效所要求的当前状态
    pub fn allowed_sources(&self) -> &'static [AnalysisStatus] {
        match self.status {
            Some(target) => AnalysisStatus::sources_for(target),
            None => &[AnalysisStatus::Pending, AnalysisStatus::Running],
        }
    }
}

/// 历史记录排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryOrder {
    #[default]
    CreatedAt,
    CompletedAt,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// 分析仓库特质
///
/// 所有按 `owner_id` 的读取与删除都只返回该所有者的记录。
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// 创建新记录
    async fn create(&self, record: &AnalysisRecord) -> Result<AnalysisRecord, RepositoryError>;
    /// 按ID和所有者查找记录
    async fn find_by_id(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, RepositoryError>;
    /// 原子地应用部分更新，返回更新后的记录
    async fn update(
        &self,
        id: Uuid,
        update: AnalysisUpdate,
    ) -> Result<AnalysisRecord, RepositoryError>;
    /// 分页查询所有者的记录，返回（记录，总数）
    ///
    /// 偏移量超出范围的页返回空列表。
    async fn list_paginated(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
        order_by: HistoryOrder,
        direction: SortDirection,
    ) -> Result<(Vec<AnalysisRecord>, u64), RepositoryError>;
    /// 删除记录及其进度事件，返回是否有记录被删除
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, RepositoryError>;
    /// 追加进度事件，序号由仓库分配
    async fn append_event(&self, event: &ProgressEvent) -> Result<ProgressEvent, RepositoryError>;
    /// 按序号列出事件，`after` 为空时返回全部
    async fn list_events(
        &self,
        analysis_id: Uuid,
        after: Option<i32>,
    ) -> Result<Vec<ProgressEvent>, RepositoryError>;
}
