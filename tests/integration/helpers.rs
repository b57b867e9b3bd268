// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use analyzrs::application::use_cases::analysis_use_case::AnalysisUseCase;
use analyzrs::config::settings::{LlmSettings, ScannerSettings, WorkerSettings};
use analyzrs::domain::services::enrichment_service::{EnrichmentService, LlmEnrichmentService};
use analyzrs::domain::services::identity_provider::IdentityProvider;
use analyzrs::domain::services::llm_service::LLMService;
use analyzrs::infrastructure::database::entities::api_key;
use analyzrs::infrastructure::identity::DatabaseIdentityProvider;
use analyzrs::infrastructure::repositories::analysis_repo_impl::AnalysisRepositoryImpl;
use analyzrs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use analyzrs::presentation::routes;
use analyzrs::queue::job_queue::DatabaseJobQueue;
use analyzrs::scanners::fetcher::{HttpFetcher, PageFetcher};
use analyzrs::scanners::registry::ScannerRegistry;
use analyzrs::workers::analysis_worker::AnalysisWorker;
use axum_test::TestServer;
use chrono::Utc;
use dashmap::DashMap;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type TestQueue = DatabaseJobQueue<JobRepositoryImpl>;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub db_pool: Arc<DatabaseConnection>,
    pub api_key: String,
    pub owner_id: Uuid,
    pub analysis_repo: Arc<AnalysisRepositoryImpl>,
    pub queue: Arc<TestQueue>,
}

impl TestApp {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// 为新的所有者签发一个 API 密钥
    pub async fn add_owner(&self) -> (String, Uuid) {
        let key = format!("test-key-{}", Uuid::new_v4());
        let owner = Uuid::new_v4();
        insert_api_key(&self.db_pool, &key, owner).await;
        (key, owner)
    }

    /// 构建一个直连测试目标站点的工作器
    pub fn worker(&self, llm_base_url: Option<String>) -> AnalysisWorker<AnalysisRepositoryImpl, TestQueue> {
        let scanner_settings = ScannerSettings {
            allow_private_targets: true,
            fetch_timeout_secs: 5,
            performance_samples: 1,
            ..ScannerSettings::default()
        };
        let worker_settings = WorkerSettings {
            job_timeout_secs: 30,
            scanner_timeout_secs: 10,
            poll_interval_ms: 10,
            ..WorkerSettings::default()
        };

        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::new(scanner_settings.clone()).unwrap());
        let scanners = Arc::new(
            ScannerRegistry::with_defaults(&scanner_settings, worker_settings.scanner_timeout())
                .unwrap(),
        );

        let llm_settings = LlmSettings {
            api_key: llm_base_url.as_ref().map(|_| "test-llm-key".to_string()),
            api_base_url: llm_base_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string()),
            timeout_secs: 5,
            ..LlmSettings::default()
        };
        let llm = LLMService::new(&llm_settings).unwrap();
        let configured = llm.is_configured();
        let enrichment: Arc<dyn EnrichmentService> =
            Arc::new(LlmEnrichmentService::new(Arc::new(llm), configured));

        AnalysisWorker::new(
            self.analysis_repo.clone(),
            self.queue.clone(),
            fetcher,
            scanners,
            enrichment,
            worker_settings,
            Duration::from_secs(5),
            Arc::new(DashMap::new()),
        )
    }
}

pub async fn insert_api_key(db: &DatabaseConnection, key: &str, owner: Uuid) {
    api_key::ActiveModel {
        id: Set(Uuid::new_v4()),
        key: Set(key.to_string()),
        owner_id: Set(owner),
        label: Set(Some("test".to_string())),
        revoked_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn create_test_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let db_pool = Arc::new(db);

    let analysis_repo = Arc::new(AnalysisRepositoryImpl::new(db_pool.clone()));
    let queue = Arc::new(DatabaseJobQueue::new(
        Arc::new(JobRepositoryImpl::new(db_pool.clone())),
        chrono::Duration::seconds(60),
    ));
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(DatabaseIdentityProvider::new(db_pool.clone()));

    let api_key = format!("test-key-{}", Uuid::new_v4());
    let owner_id = Uuid::new_v4();
    insert_api_key(&db_pool, &api_key, owner_id).await;

    let use_case = Arc::new(AnalysisUseCase::new(
        analysis_repo.clone(),
        queue.clone(),
        3,
    ));
    let server = TestServer::new(routes::build_router(use_case, identity)).unwrap();

    TestApp {
        server,
        db_pool,
        api_key,
        owner_id,
        analysis_repo,
        queue,
    }
}
