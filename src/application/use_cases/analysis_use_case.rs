// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::{
    application::dto::analyze_request::{AnalyzeRequestDto, ValidationIssue},
    domain::{
        models::{
            analysis::{AnalysisRecord, AnalysisStatus},
            job::AnalysisJob,
            progress::{ProgressEvent, ProgressStage},
        },
        repositories::analysis_repository::{
            AnalysisRepository, AnalysisUpdate, HistoryOrder, RepositoryError, SortDirection,
        },
    },
    queue::job_queue::JobQueue,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 入队失败且回滚也失败时写入记录的错误信息
pub const ENQUEUE_FAILED_MESSAGE: &str = "Failed to enqueue analysis";

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation failed")]
    Validation(Vec<ValidationIssue>),
    #[error("Analysis not found")]
    NotFound,
    #[error("Analysis not completed yet")]
    NotReady {
        status: AnalysisStatus,
        progress: i32,
    },
    #[error("Failed to enqueue analysis: {0}")]
    QueueUnavailable(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 分析请求用例
///
/// 负责校验、创建记录、入队以及所有按所有者隔离的读取操作。
/// 不等待工作器，也不写入任何结果字段。
pub struct AnalysisUseCase<R, Q> {
    analysis_repo: Arc<R>,
    queue: Arc<Q>,
    max_attempts: i32,
}

impl<R, Q> AnalysisUseCase<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    pub fn new(analysis_repo: Arc<R>, queue: Arc<Q>, max_attempts: i32) -> Self {
        Self {
            analysis_repo,
            queue,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 提交分析请求，返回新建的待处理记录
    pub async fn submit(
        &self,
        owner_id: Uuid,
        dto: AnalyzeRequestDto,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let (url, options) = dto.into_submission().map_err(AnalysisError::Validation)?;

        let record = AnalysisRecord::new(owner_id, url, options);
        let record = self.analysis_repo.create(&record).await?;

        let queued = ProgressEvent::new(
            record.id,
            AnalysisStatus::Pending,
            0,
            ProgressStage::Queued,
            Some("Analysis queued".to_string()),
        );
        if let Err(e) = self.analysis_repo.append_event(&queued).await {
            warn!(analysis_id = %record.id, "Failed to append queued event: {}", e);
        }

        let job = AnalysisJob::for_record(&record, self.max_attempts);
        if let Err(e) = self.queue.enqueue(job).await {
            error!(analysis_id = %record.id, "Failed to enqueue analysis: {}", e);
            self.rollback(&record).await;
            return Err(AnalysisError::QueueUnavailable(e.to_string()));
        }

        info!(
            analysis_id = %record.id,
            owner_id = %owner_id,
            url = %record.url,
            "Analysis queued"
        );
        Ok(record)
    }

    /// 入队失败时删除刚创建的记录；删除也失败时把记录标记为失败
    async fn rollback(&self, record: &AnalysisRecord) {
        match self.analysis_repo.delete(record.id, record.owner_id).await {
            Ok(_) => {}
            Err(e) => {
                warn!(
                    analysis_id = %record.id,
                    "Rollback delete failed, marking analysis failed: {}", e
                );
                let now: DateTime<FixedOffset> = Utc::now().into();
                let update =
                    AnalysisUpdate::fail(ENQUEUE_FAILED_MESSAGE, now, record.elapsed_ms(now));
                if let Err(e) = self.analysis_repo.update(record.id, update).await {
                    error!(analysis_id = %record.id, "Failed to mark analysis failed: {}", e);
                }
            }
        }
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<AnalysisRecord, AnalysisError> {
        self.analysis_repo
            .find_by_id(id, owner_id)
            .await?
            .ok_or(AnalysisError::NotFound)
    }

    pub async fn get_status(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<AnalysisRecord, AnalysisError> {
        self.find_owned(id, owner_id).await
    }

    /// 获取完整结果，未完成时返回 [`AnalysisError::NotReady`]
    pub async fn get_result(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let record = self.find_owned(id, owner_id).await?;
        if record.status != AnalysisStatus::Completed {
            return Err(AnalysisError::NotReady {
                status: record.status,
                progress: record.progress,
            });
        }
        Ok(record)
    }

    /// 分页列出历史记录，调用方负责规范化 page 和 limit
    pub async fn list_history(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
        order_by: HistoryOrder,
        direction: SortDirection,
    ) -> Result<(Vec<AnalysisRecord>, u64), AnalysisError> {
        let result = self
            .analysis_repo
            .list_paginated(owner_id, page.max(1), limit.max(1), order_by, direction)
            .await?;
        Ok(result)
    }

    /// 删除记录，不通知正在执行的工作器
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AnalysisError> {
        let deleted = self.analysis_repo.delete(id, owner_id).await?;
        if deleted {
            info!(analysis_id = %id, "Analysis deleted");
        }
        Ok(deleted)
    }

    pub async fn list_events(
        &self,
        id: Uuid,
        owner_id: Uuid,
        after: Option<i32>,
    ) -> Result<Vec<ProgressEvent>, AnalysisError> {
        self.find_owned(id, owner_id).await?;
        let events = self.analysis_repo.list_events(id, after).await?;
        Ok(events)
    }
}
