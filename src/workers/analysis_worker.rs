// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::WorkerSettings;
use crate::domain::models::analysis::{AnalysisRecord, AnalysisStatus};
use crate::domain::models::job::AnalysisJob;
use crate::domain::models::progress::ProgressStage;
use crate::domain::models::report::AnalysisReport;
use crate::domain::repositories::analysis_repository::{
    AnalysisRepository, AnalysisUpdate, RepositoryError,
};
use crate::domain::services::enrichment_service::EnrichmentService;
use crate::infrastructure::metrics::{
    ENRICHMENT_FAILURES, JOBS_COMPLETED, JOBS_FAILED, JOBS_STARTED, JOB_DURATION,
    SCANNER_FAILURES,
};
use crate::queue::job_queue::{JobQueue, QueueError};
use crate::scanners::fetcher::PageFetcher;
use crate::scanners::html;
use crate::scanners::registry::ScannerRegistry;
use crate::scanners::traits::ScanContext;
use crate::utils::errors::WorkerError;
use crate::workers::progress::ProgressTracker;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::StreamExt;
use metrics::{counter, histogram};
use scraper::Html;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// 扫描阶段开始时的进度
const PROGRESS_SCANNING: i32 = 10;
/// 扫描阶段结束时的进度
const PROGRESS_SCANNED: i32 = 70;
/// AI 增强结束时的进度
const PROGRESS_ENRICHED: i32 = 90;

/// 单个分析的不可恢复错误，消息原样写入记录
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("All scanners failed: {0}")]
    AllScannersFailed(String),

    #[error("AI enrichment failed: {0}")]
    EnrichmentRequired(String),

    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),

    /// 记录已被删除或已进入终态
    #[error("Analysis record no longer accepts updates")]
    RecordGone,

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PipelineError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound | RepositoryError::Conflict(_) => PipelineError::RecordGone,
            other => PipelineError::Repository(other),
        }
    }
}

/// 单个任务的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    /// 记录不存在或已是终态，直接确认任务
    Skipped,
}

/// 进程内正在执行的分析，离开作用域时自动移除
struct InFlightGuard {
    in_flight: Arc<DashMap<Uuid, Uuid>>,
    analysis_id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.analysis_id);
    }
}

fn page_title(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    html::first_text(&doc, "title")
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

/// 分析工作器
///
/// 循环领取任务并执行完整流水线：抓取目标、并发扫描、AI 增强、写入结果。
/// 整条流水线受 `job_timeout` 限制，任何单个任务的失败都不会影响后续任务。
pub struct AnalysisWorker<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    analysis_repo: Arc<R>,
    queue: Arc<Q>,
    fetcher: Arc<dyn PageFetcher>,
    scanners: Arc<ScannerRegistry>,
    enrichment: Arc<dyn EnrichmentService>,
    settings: WorkerSettings,
    enrichment_timeout: Duration,
    in_flight: Arc<DashMap<Uuid, Uuid>>,
    worker_id: Uuid,
}

impl<R, Q> AnalysisWorker<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        analysis_repo: Arc<R>,
        queue: Arc<Q>,
        fetcher: Arc<dyn PageFetcher>,
        scanners: Arc<ScannerRegistry>,
        enrichment: Arc<dyn EnrichmentService>,
        settings: WorkerSettings,
        enrichment_timeout: Duration,
        in_flight: Arc<DashMap<Uuid, Uuid>>,
    ) -> Self {
        Self {
            analysis_repo,
            queue,
            fetcher,
            scanners,
            enrichment,
            settings,
            enrichment_timeout,
            in_flight,
            worker_id: Uuid::new_v4(),
        }
    }

    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    /// 领取并处理一个任务，队列为空时返回 `false`
    pub async fn process_next(&self) -> Result<bool, WorkerError> {
        let Some(job) = self.queue.dequeue(self.worker_id).await? else {
            return Ok(false);
        };

        let _guard = match self.in_flight.entry(job.id) {
            Entry::Occupied(entry) => {
                warn!(
                    analysis_id = %job.id,
                    holder = %entry.get(),
                    "Analysis already running in this process, leaving redelivered job to its lease"
                );
                return Ok(true);
            }
            Entry::Vacant(entry) => {
                entry.insert(self.worker_id);
                InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    analysis_id: job.id,
                }
            }
        };

        self.handle(&job).await?;
        Ok(true)
    }

    /// 处理任务并确认：成功或跳过时 complete，失败时 fail
    ///
    /// 仓库不可用时不确认任务，由租约过期后重新投递。确认时使用出队时的租约，
    /// 租约已被回收或转给其他工作器时只记录警告。
    pub async fn handle(&self, job: &AnalysisJob) -> Result<JobOutcome, WorkerError> {
        let outcome = self.process_job(job).await?;
        let lock_token = job.lock_token.unwrap_or(self.worker_id);
        let acked = match outcome {
            JobOutcome::Completed | JobOutcome::Skipped => {
                self.queue.complete(job.id, lock_token).await
            }
            JobOutcome::Failed => self.queue.fail(job.id, lock_token).await,
        };
        match acked {
            Ok(()) => {}
            Err(QueueError::Repository(RepositoryError::Conflict(reason))) => {
                warn!(analysis_id = %job.id, %reason, "Lease lost before acknowledgement");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(outcome)
    }

    #[instrument(skip(self, job), fields(analysis_id = %job.id, url = %job.url, attempt = job.attempt_count))]
    pub async fn process_job(&self, job: &AnalysisJob) -> Result<JobOutcome, WorkerError> {
        let Some(record) = self.analysis_repo.find_by_id(job.id, job.owner_id).await? else {
            info!("Analysis record no longer exists, acknowledging job");
            return Ok(JobOutcome::Skipped);
        };
        if record.status.is_terminal() {
            info!(status = %record.status, "Analysis already finished, acknowledging job");
            return Ok(JobOutcome::Skipped);
        }

        let record = match self
            .analysis_repo
            .update(record.id, AnalysisUpdate::start(now()))
            .await
        {
            Ok(record) => record,
            Err(RepositoryError::NotFound | RepositoryError::Conflict(_)) => {
                warn!("Analysis changed before it could start, acknowledging job");
                return Ok(JobOutcome::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Processing analysis");
        counter!(JOBS_STARTED).increment(1);
        let started = Instant::now();
        let mut tracker = ProgressTracker::new(self.analysis_repo.clone(), record.id);

        let result = match timeout(
            self.settings.job_timeout(),
            self.pipeline(&record, &mut tracker),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(self.settings.job_timeout_secs)),
        };
        histogram!(JOB_DURATION).record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                counter!(JOBS_COMPLETED).increment(1);
                info!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Analysis completed"
                );
                Ok(JobOutcome::Completed)
            }
            Err(PipelineError::RecordGone) => {
                warn!("Analysis was deleted while running, discarding results");
                Ok(JobOutcome::Skipped)
            }
            Err(e) => {
                counter!(JOBS_FAILED).increment(1);
                error!(error = %e, "Analysis failed");
                self.fail_record(&record, &mut tracker, &e.to_string())
                    .await?;
                Ok(JobOutcome::Failed)
            }
        }
    }

    async fn fail_record(
        &self,
        record: &AnalysisRecord,
        tracker: &mut ProgressTracker<R>,
        message: &str,
    ) -> Result<(), WorkerError> {
        let finished = now();
        let update = AnalysisUpdate::fail(message, finished, record.elapsed_ms(finished));
        match self.analysis_repo.update(record.id, update).await {
            Ok(_) => {
                tracker
                    .finish(AnalysisStatus::Failed, Some(message.to_string()))
                    .await;
                Ok(())
            }
            Err(RepositoryError::NotFound | RepositoryError::Conflict(_)) => {
                warn!(analysis_id = %record.id, "Could not mark analysis failed, record is gone or finished");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pipeline(
        &self,
        record: &AnalysisRecord,
        tracker: &mut ProgressTracker<R>,
    ) -> Result<(), PipelineError> {
        tracker
            .advance(0, ProgressStage::Fetching, Some(format!("Fetching {}", record.url)))
            .await?;
        let page = self
            .fetcher
            .fetch(&record.url)
            .await
            .map_err(|e| PipelineError::TargetUnreachable(e.to_string()))?;

        let mut report = AnalysisReport {
            title: page_title(&page.body),
            basic: Some(page.basic()),
            ..Default::default()
        };

        let ctx = ScanContext {
            page: Arc::new(page),
            options: record.options.clone(),
        };
        let mut pending = self.scanners.launch(ctx);
        let total = pending.len();
        tracker
            .advance(
                PROGRESS_SCANNING,
                ProgressStage::Scanning,
                Some(format!("Running {} scanners", total)),
            )
            .await?;

        let mut settled = 0usize;
        let mut succeeded = 0usize;
        let mut failures = Vec::new();
        while let Some((kind, result)) = pending.next().await {
            settled += 1;
            match result {
                Ok(output) => {
                    output.apply_to(&mut report);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(scanner = %kind, error = %e, "Scanner failed");
                    counter!(SCANNER_FAILURES, "scanner" => kind.name())
                        .increment(1);
                    failures.push(format!("{}: {}", kind, e));
                }
            }
            let span = PROGRESS_SCANNED - PROGRESS_SCANNING;
            let progress = PROGRESS_SCANNING + (span as usize * settled / total.max(1)) as i32;
            tracker
                .advance(
                    progress,
                    ProgressStage::Scanning,
                    Some(format!("{} scanner finished", kind)),
                )
                .await?;
        }

        if succeeded == 0 {
            return Err(PipelineError::AllScannersFailed(if failures.is_empty() {
                "no scanners enabled".to_string()
            } else {
                failures.join("; ")
            }));
        }

        tracker
            .advance(
                PROGRESS_SCANNED,
                ProgressStage::Enriching,
                Some(format!("Generating {} insights", record.options.ai_profile)),
            )
            .await?;

        let enrichment = timeout(
            self.enrichment_timeout,
            self.enrichment
                .enrich(&record.url, &report, record.options.ai_profile),
        )
        .await;
        let enrichment_error = match enrichment {
            Ok(Ok(enrichment)) => {
                report.apply_enrichment(enrichment);
                succeeded += 1;
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "timed out after {} seconds",
                self.enrichment_timeout.as_secs()
            )),
        };
        if let Some(reason) = enrichment_error {
            counter!(ENRICHMENT_FAILURES).increment(1);
            if record.options.require_ai_insights {
                return Err(PipelineError::EnrichmentRequired(reason));
            }
            warn!(reason = %reason, "AI enrichment failed, completing without AI sections");
        }

        tracker
            .advance(PROGRESS_ENRICHED, ProgressStage::Enriching, None)
            .await?;

        // scanners plus the enrichment step
        let attempted = total + 1;
        let confidence = succeeded as f64 / attempted as f64;
        let finished = now();
        self.analysis_repo
            .update(
                record.id,
                AnalysisUpdate::complete(
                    report,
                    confidence,
                    finished,
                    record.elapsed_ms(finished),
                ),
            )
            .await?;
        tracker
            .finish(
                AnalysisStatus::Completed,
                Some(format!(
                    "{} of {} analyses succeeded",
                    succeeded, attempted
                )),
            )
            .await;
        Ok(())
    }
}

#[async_trait]
impl<R, Q> Worker for AnalysisWorker<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    async fn run(&self) -> Result<(), WorkerError> {
        info!("Analysis worker {} started", self.worker_id);
        let idle = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            match self.process_next().await {
                Ok(true) => {}
                Ok(false) => sleep(idle).await,
                Err(e) => {
                    error!("Error processing analysis job: {}", e);
                    sleep(idle).await;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "analysis_worker"
    }
}
