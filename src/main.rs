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

use analyzrs::application::use_cases::analysis_use_case::AnalysisUseCase;
use analyzrs::config::settings::Settings;
use analyzrs::domain::services::enrichment_service::{EnrichmentService, LlmEnrichmentService};
use analyzrs::domain::services::identity_provider::IdentityProvider;
use analyzrs::domain::services::llm_service::LLMService;
use analyzrs::infrastructure::database::connection;
use analyzrs::infrastructure::identity::DatabaseIdentityProvider;
use analyzrs::infrastructure::repositories::analysis_repo_impl::AnalysisRepositoryImpl;
use analyzrs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use analyzrs::presentation::routes;
use analyzrs::queue::job_queue::DatabaseJobQueue;
use analyzrs::scanners::fetcher::{HttpFetcher, PageFetcher};
use analyzrs::scanners::registry::ScannerRegistry;
use analyzrs::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use analyzrs::utils::telemetry;
use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(settings.logging.json);
    info!("Starting analyzrs...");

    if settings.metrics.enabled {
        analyzrs::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr);
    }

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    if settings.database.run_migrations {
        info!("Running database migrations...");
        Migrator::up(db.as_ref(), None).await?;
        info!("Database migrations applied");
    }

    // 4. Initialize repositories and queue
    let analysis_repo = Arc::new(AnalysisRepositoryImpl::new(db.clone()));
    let job_repo = Arc::new(JobRepositoryImpl::new(db.clone()));
    let queue = Arc::new(DatabaseJobQueue::new(job_repo, settings.worker.lease()));
    let identity: Arc<dyn IdentityProvider> = Arc::new(DatabaseIdentityProvider::new(db.clone()));

    // 5. Initialize scanners and enrichment
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(settings.scanner.clone())?);
    let scanners = Arc::new(ScannerRegistry::with_defaults(
        &settings.scanner,
        settings.worker.scanner_timeout(),
    )?);

    let llm = LLMService::new(&settings.llm)?;
    let configured = llm.is_configured();
    if !configured {
        warn!("No LLM API key configured, AI enrichment is disabled");
    }
    let enrichment: Arc<dyn EnrichmentService> =
        Arc::new(LlmEnrichmentService::new(Arc::new(llm), configured));

    // 6. Start workers
    let mut worker_manager = WorkerManager::new(
        analysis_repo.clone(),
        queue.clone(),
        fetcher,
        scanners,
        enrichment,
        settings.worker.clone(),
        Duration::from_secs(settings.llm.timeout_secs),
    );
    worker_manager.start();

    // 7. Start HTTP server
    let use_case = Arc::new(AnalysisUseCase::new(
        analysis_repo,
        queue,
        settings.worker.max_attempts,
    ));
    let app = routes::build_router(use_case, identity);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { worker_manager.wait_for_shutdown().await })
        .await?;

    info!("analyzrs stopped");
    Ok(())
}
