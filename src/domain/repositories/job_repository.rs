// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::AnalysisJob;
use crate::domain::repositories::analysis_repository::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use uuid::Uuid;

/// 租约回收结果
#[derive(Debug, Default)]
pub struct RequeueOutcome {
    /// 重新进入队列的任务数量
    pub requeued: u64,
    /// 投递次数耗尽的任务
    ///
    /// 这些任务仍处于 active 且租约已过期，直到调用方以其 `lock_token`
    /// 标记失败为止，每一轮回收都会再次返回它们。
    pub exhausted: Vec<AnalysisJob>,
}

/// 任务仓库特质
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, job: &AnalysisJob) -> Result<AnalysisJob, RepositoryError>;
    /// 领取下一个排队中的任务并加上租约
    async fn acquire_next(
        &self,
        worker_id: Uuid,
        lease: Duration,
    ) -> Result<Option<AnalysisJob>, RepositoryError>;
    /// 标记任务已完成
    ///
    /// 只有仍持有该租约（active 且 `lock_token` 匹配）时生效，否则返回 `Conflict`。
    async fn mark_completed(&self, id: Uuid, lock_token: Uuid) -> Result<(), RepositoryError>;
    /// 标记任务已失败，租约要求同 `mark_completed`
    async fn mark_failed(&self, id: Uuid, lock_token: Uuid) -> Result<(), RepositoryError>;
    /// 回收租约已过期的任务：可重试的放回队列，耗尽的原样返回
    async fn requeue_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<RequeueOutcome, RepositoryError>;
}
