// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::analysis::AnalysisStatus;
use crate::domain::models::job::AnalysisJob;
use crate::domain::models::progress::{ProgressEvent, ProgressStage};
use crate::domain::repositories::analysis_repository::{
    AnalysisRepository, AnalysisUpdate, RepositoryError,
};
use crate::infrastructure::metrics::{JOBS_FAILED, LEASES_REQUEUED};
use crate::queue::job_queue::{JobQueue, QueueError};
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 一轮回收的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapSummary {
    /// 重新入队的任务数
    pub requeued: u64,
    /// 因投递次数耗尽而被标记失败的记录数
    pub failed: u64,
}

/// 租约回收工作器
///
/// 定期把租约过期的任务放回队列；投递次数耗尽的任务对应的记录直接标记为失败，
/// 保证记录不会无限期停留在 running。
pub struct LeaseReaper<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    analysis_repo: Arc<R>,
    queue: Arc<Q>,
    interval: Duration,
}

impl<R, Q> LeaseReaper<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    pub fn new(analysis_repo: Arc<R>, queue: Arc<Q>, interval: Duration) -> Self {
        Self {
            analysis_repo,
            queue,
            interval,
        }
    }

    /// 执行一轮回收
    ///
    /// 投递次数耗尽的任务先把记录写为失败，再以原租约标记任务失败；
    /// 记录写入出错时任务保持 active，下一轮回收会再次处理。
    pub async fn reap_once(&self, now: DateTime<FixedOffset>) -> Result<ReapSummary, WorkerError> {
        let outcome = self.queue.reap_expired(now).await?;
        let mut summary = ReapSummary {
            requeued: outcome.requeued,
            failed: 0,
        };
        if outcome.requeued > 0 {
            counter!(LEASES_REQUEUED).increment(outcome.requeued);
        }

        for job in outcome.exhausted {
            if self.fail_record(&job, now).await? {
                summary.failed += 1;
            }

            let Some(lock_token) = job.lock_token else {
                continue;
            };
            match self.queue.fail(job.id, lock_token).await {
                Ok(()) => {}
                Err(QueueError::Repository(
                    RepositoryError::NotFound | RepositoryError::Conflict(_),
                )) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }

    /// 把耗尽投递次数的任务对应的记录标记为失败，返回是否写入了记录
    async fn fail_record(
        &self,
        job: &AnalysisJob,
        now: DateTime<FixedOffset>,
    ) -> Result<bool, WorkerError> {
        let Some(record) = self.analysis_repo.find_by_id(job.id, job.owner_id).await? else {
            return Ok(false);
        };
        if record.status.is_terminal() {
            return Ok(false);
        }

        let message = format!(
            "Analysis failed after {} attempts: worker stopped responding",
            job.attempt_count
        );
        let update = AnalysisUpdate::fail(&message, now, record.elapsed_ms(now));
        match self.analysis_repo.update(record.id, update).await {
            Ok(_) => {}
            // finished or deleted in the meantime
            Err(RepositoryError::NotFound | RepositoryError::Conflict(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        counter!(JOBS_FAILED).increment(1);
        warn!(analysis_id = %record.id, attempts = job.attempt_count, "Analysis exhausted its attempts");
        let event = ProgressEvent::new(
            record.id,
            AnalysisStatus::Failed,
            record.progress,
            ProgressStage::Failed,
            Some(message),
        );
        if let Err(e) = self.analysis_repo.append_event(&event).await {
            warn!(analysis_id = %record.id, "Failed to append progress event: {}", e);
        }
        Ok(true)
    }
}

#[async_trait]
impl<R, Q> Worker for LeaseReaper<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    async fn run(&self) -> Result<(), WorkerError> {
        info!("Lease reaper started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.reap_once(Utc::now().into()).await {
                Ok(summary) => {
                    if summary.requeued > 0 || summary.failed > 0 {
                        info!(
                            requeued = summary.requeued,
                            failed = summary.failed,
                            "Reclaimed expired leases"
                        );
                    }
                }
                Err(e) => {
                    error!("Failed to reclaim expired leases: {}", e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "lease_reaper"
    }
}
