// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::WorkerSettings;
use crate::domain::repositories::analysis_repository::AnalysisRepository;
use crate::domain::services::enrichment_service::EnrichmentService;
use crate::queue::job_queue::JobQueue;
use crate::scanners::fetcher::PageFetcher;
use crate::scanners::registry::ScannerRegistry;
use crate::workers::analysis_worker::AnalysisWorker;
use crate::workers::reaper::LeaseReaper;
use crate::workers::worker::Worker;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// 工作管理器
///
/// 启动 N 个分析工作器和一个租约回收器，并在进程内跟踪正在执行的分析ID。
pub struct WorkerManager<R, Q>
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
    /// 分析ID → 工作器ID
    in_flight: Arc<DashMap<Uuid, Uuid>>,
    handles: Vec<JoinHandle<()>>,
}

impl<R, Q> WorkerManager<R, Q>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    pub fn new(
        analysis_repo: Arc<R>,
        queue: Arc<Q>,
        fetcher: Arc<dyn PageFetcher>,
        scanners: Arc<ScannerRegistry>,
        enrichment: Arc<dyn EnrichmentService>,
        settings: WorkerSettings,
        enrichment_timeout: Duration,
    ) -> Self {
        Self {
            analysis_repo,
            queue,
            fetcher,
            scanners,
            enrichment,
            settings,
            enrichment_timeout,
            in_flight: Arc::new(DashMap::new()),
            handles: Vec::new(),
        }
    }

    /// 当前进程内正在执行的分析
    pub fn in_flight(&self) -> Arc<DashMap<Uuid, Uuid>> {
        self.in_flight.clone()
    }

    /// 启动工作进程
    ///
    /// # 参数
    ///
    /// * `count` - 要启动的工作进程数量
    pub fn start_workers(&mut self, count: usize) {
        for _ in 0..count {
            let worker = AnalysisWorker::new(
                self.analysis_repo.clone(),
                self.queue.clone(),
                self.fetcher.clone(),
                self.scanners.clone(),
                self.enrichment.clone(),
                self.settings.clone(),
                self.enrichment_timeout,
                self.in_flight.clone(),
            );

            self.handles.push(worker.spawn());
        }
        info!("Started {} analysis workers", count);
    }

    /// 启动租约回收器
    pub fn start_reaper(&mut self) {
        let reaper = LeaseReaper::new(
            self.analysis_repo.clone(),
            self.queue.clone(),
            Duration::from_secs(self.settings.reaper_interval_secs.max(1)),
        );
        self.handles.push(reaper.spawn());
    }

    /// 按配置启动全部后台任务
    pub fn start(&mut self) {
        self.start_workers(self.settings.concurrency.max(1));
        self.start_reaper();
    }

    /// 立即停止所有后台任务
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        self.shutdown();
    }
}
