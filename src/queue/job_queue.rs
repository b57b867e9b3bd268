// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::AnalysisJob;
use crate::domain::repositories::analysis_repository::RepositoryError;
use crate::domain::repositories::job_repository::{JobRepository, RequeueOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 队列暂不可用
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// 分析任务队列特质
///
/// 至少一次投递：任务在 `complete`/`fail` 之前可能因租约过期被再次投递。
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 入队任务，不等待执行
    async fn enqueue(&self, job: AnalysisJob) -> Result<AnalysisJob, QueueError>;

    /// 出队任务并加租约
    async fn dequeue(&self, worker_id: Uuid) -> Result<Option<AnalysisJob>, QueueError>;

    /// 完成任务，`lock_token` 为出队时获得的租约
    async fn complete(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError>;

    /// 失败任务
    async fn fail(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError>;

    /// 回收租约过期的任务
    async fn reap_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<RequeueOutcome, QueueError>;
}

/// 数据库任务队列实现
///
/// 在 Postgres 上通过 `FOR UPDATE SKIP LOCKED` 领取任务。
pub struct DatabaseJobQueue<R: JobRepository> {
    repository: Arc<R>,
    /// 租约时长，应大于单个任务的执行上限
    lease: Duration,
}

impl<R: JobRepository> DatabaseJobQueue<R> {
    pub fn new(repository: Arc<R>, lease: Duration) -> Self {
        Self { repository, lease }
    }
}

#[async_trait]
impl<R: JobRepository> JobQueue for DatabaseJobQueue<R> {
    async fn enqueue(&self, job: AnalysisJob) -> Result<AnalysisJob, QueueError> {
        let created = self.repository.create(&job).await?;
        Ok(created)
    }

    async fn dequeue(&self, worker_id: Uuid) -> Result<Option<AnalysisJob>, QueueError> {
        let job = self.repository.acquire_next(worker_id, self.lease).await?;
        Ok(job)
    }

    async fn complete(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError> {
        self.repository.mark_completed(job_id, lock_token).await?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError> {
        self.repository.mark_failed(job_id, lock_token).await?;
        Ok(())
    }

    async fn reap_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<RequeueOutcome, QueueError> {
        let outcome = self.repository.requeue_expired(now).await?;
        Ok(outcome)
    }
}

#[async_trait]
impl<T: JobQueue + ?Sized> JobQueue for Arc<T> {
    async fn enqueue(&self, job: AnalysisJob) -> Result<AnalysisJob, QueueError> {
        (**self).enqueue(job).await
    }

    async fn dequeue(&self, worker_id: Uuid) -> Result<Option<AnalysisJob>, QueueError> {
        (**self).dequeue(worker_id).await
    }

    async fn complete(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError> {
        (**self).complete(job_id, lock_token).await
    }

    async fn fail(&self, job_id: Uuid, lock_token: Uuid) -> Result<(), QueueError> {
        (**self).fail(job_id, lock_token).await
    }

    async fn reap_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<RequeueOutcome, QueueError> {
        (**self).reap_expired(now).await
    }
}
