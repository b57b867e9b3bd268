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

use crate::domain::models::job::{AnalysisJob, JobStatus};
use crate::domain::repositories::analysis_repository::RepositoryError;
use crate::domain::repositories::job_repository::{JobRepository, RequeueOutcome};
use crate::infrastructure::database::entities::analysis_job as job_entity;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, LockBehavior, LockType},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的分析任务数据访问层
#[derive(Clone)]
pub struct JobRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl JobRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 释放租约并写入终态，只作用于仍由 `lock_token` 持有的 active 任务
    async fn release(
        &self,
        id: Uuid,
        lock_token: Uuid,
        status: JobStatus,
    ) -> Result<(), RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(job_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(job_entity::Column::LockToken, Expr::value(Option::<Uuid>::None))
            .col_expr(
                job_entity::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(Utc::now())),
            )
            .filter(job_entity::Column::Id.eq(id))
            .filter(job_entity::Column::Status.eq(JobStatus::Active.to_string()))
            .filter(job_entity::Column::LockToken.eq(lock_token))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected > 0 {
            return Ok(());
        }

        match job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
        {
            Some(job) => Err(RepositoryError::Conflict(format!(
                "job {} is {} and no longer leased by {}",
                id, job.status, lock_token
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl From<job_entity::Model> for AnalysisJob {
    fn from(model: job_entity::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            url: model.url,
            options: serde_json::from_value(model.options).unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            attempt_count: model.attempt_count,
            max_attempts: model.max_attempts,
            lock_token: model.lock_token,
            lock_expires_at: model.lock_expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<AnalysisJob> for job_entity::ActiveModel {
    fn from(job: AnalysisJob) -> Self {
        Self {
            id: Set(job.id),
            owner_id: Set(job.owner_id),
            url: Set(job.url.clone()),
            options: Set(serde_json::to_value(&job.options).unwrap_or_default()),
            status: Set(job.status.to_string()),
            attempt_count: Set(job.attempt_count),
            max_attempts: Set(job.max_attempts),
            lock_token: Set(job.lock_token),
            lock_expires_at: Set(job.lock_expires_at),
            created_at: Set(job.created_at),
            updated_at: Set(job.updated_at),
        }
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn create(&self, job: &AnalysisJob) -> Result<AnalysisJob, RepositoryError> {
        let model: job_entity::ActiveModel = job.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(job.clone())
    }

    async fn acquire_next(
        &self,
        worker_id: Uuid,
        lease: Duration,
    ) -> Result<Option<AnalysisJob>, RepositoryError> {
        let txn = self.db.begin().await?;

        let job = job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::Queued.to_string()))
            .order_by_asc(job_entity::Column::CreatedAt)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        if let Some(job) = job {
            let now = Utc::now();
            let mut active: job_entity::ActiveModel = job.into();
            active.status = Set(JobStatus::Active.to_string());
            active.lock_token = Set(Some(worker_id));
            active.lock_expires_at = Set(Some((now + lease).into()));
            active.updated_at = Set(now.into());
            let current_attempt = *active.attempt_count.as_ref();
            active.attempt_count = Set(current_attempt + 1);

            let updated = active.update(&txn).await?;

            txn.commit().await?;

            return Ok(Some(updated.into()));
        } else {
            txn.commit().await?;
        }

        Ok(None)
    }

    async fn mark_completed(&self, id: Uuid, lock_token: Uuid) -> Result<(), RepositoryError> {
        self.release(id, lock_token, JobStatus::Completed).await
    }

    async fn mark_failed(&self, id: Uuid, lock_token: Uuid) -> Result<(), RepositoryError> {
        self.release(id, lock_token, JobStatus::Failed).await
    }

    async fn requeue_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<RequeueOutcome, RepositoryError> {
        let txn = self.db.begin().await?;

        let expired = job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::Active.to_string()))
            .filter(job_entity::Column::LockExpiresAt.lte(now))
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(&txn)
            .await?;

        let (exhausted, retryable): (Vec<AnalysisJob>, Vec<AnalysisJob>) = expired
            .into_iter()
            .map(AnalysisJob::from)
            .partition(AnalysisJob::attempts_exhausted);

        let mut outcome = RequeueOutcome::default();

        if !retryable.is_empty() {
            let ids: Vec<Uuid> = retryable.iter().map(|job| job.id).collect();
            let result = job_entity::Entity::update_many()
                .col_expr(
                    job_entity::Column::Status,
                    Expr::value(JobStatus::Queued.to_string()),
                )
                .col_expr(job_entity::Column::LockToken, Expr::value(Option::<Uuid>::None))
                .col_expr(
                    job_entity::Column::LockExpiresAt,
                    Expr::value(Option::<DateTime<FixedOffset>>::None),
                )
                .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
                .filter(job_entity::Column::Id.is_in(ids))
                .exec(&txn)
                .await?;
            outcome.requeued = result.rows_affected;
        }

        // Exhausted jobs keep their lease until the reaper has failed the record.
        outcome.exhausted = exhausted;

        txn.commit().await?;
        Ok(outcome)
    }
}
