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

use crate::domain::models::analysis::AnalysisRecord;
use crate::domain::models::progress::ProgressEvent;
use crate::domain::models::report::AnalysisReport;
use crate::domain::repositories::analysis_repository::{
    AnalysisRepository, AnalysisUpdate, HistoryOrder, RepositoryError, SortDirection,
};
use crate::infrastructure::database::entities::{
    analysis as analysis_entity, analysis_event as event_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 分析仓库实现
///
/// 基于SeaORM实现的分析记录与进度事件数据访问层
#[derive(Clone)]
pub struct AnalysisRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl AnalysisRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_json<T: Serialize>(value: &Option<T>) -> Option<serde_json::Value> {
    value.as_ref().and_then(|v| serde_json::to_value(v).ok())
}

fn from_json<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Option<T> {
    value.and_then(|v| match serde_json::from_value(v) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Discarding unreadable analysis section: {}", e);
            None
        }
    })
}

impl From<analysis_entity::Model> for AnalysisRecord {
    fn from(model: analysis_entity::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            url: model.url,
            options: serde_json::from_value(model.options).unwrap_or_default(),
            status: model.status.parse().unwrap_or_default(),
            progress: model.progress,
            report: AnalysisReport {
                title: model.title,
                basic: from_json(model.basic),
                technologies: from_json(model.technologies),
                performance: from_json(model.performance),
                seo: from_json(model.seo),
                accessibility: from_json(model.accessibility),
                security: from_json(model.security),
                ai_insights: from_json(model.ai_insights),
                business_recommendations: from_json(model.business_recommendations),
                technical_recommendations: from_json(model.technical_recommendations),
                risk_assessment: from_json(model.risk_assessment),
            },
            confidence_score: model.confidence_score,
            error_message: model.error_message,
            created_at: model.created_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            duration_ms: model.duration_ms,
            updated_at: model.updated_at,
        }
    }
}

impl From<AnalysisRecord> for analysis_entity::ActiveModel {
    fn from(record: AnalysisRecord) -> Self {
        let mut model = Self {
            id: Set(record.id),
            owner_id: Set(record.owner_id),
            url: Set(record.url.clone()),
            options: Set(serde_json::to_value(&record.options).unwrap_or_default()),
            status: Set(record.status.to_string()),
            progress: Set(record.progress),
            confidence_score: Set(record.confidence_score),
            error_message: Set(record.error_message.clone()),
            created_at: Set(record.created_at),
            started_at: Set(record.started_at),
            completed_at: Set(record.completed_at),
            duration_ms: Set(record.duration_ms),
            updated_at: Set(record.updated_at),
            ..Default::default()
        };
        set_report(&mut model, &record.report);
        model
    }
}

fn set_report(model: &mut analysis_entity::ActiveModel, report: &AnalysisReport) {
    model.title = Set(report.title.clone());
    model.basic = Set(to_json(&report.basic));
    model.technologies = Set(to_json(&report.technologies));
    model.performance = Set(to_json(&report.performance));
    model.seo = Set(to_json(&report.seo));
    model.accessibility = Set(to_json(&report.accessibility));
    model.security = Set(to_json(&report.security));
    model.ai_insights = Set(to_json(&report.ai_insights));
    model.business_recommendations = Set(to_json(&report.business_recommendations));
    model.technical_recommendations = Set(to_json(&report.technical_recommendations));
    model.risk_assessment = Set(to_json(&report.risk_assessment));
}

impl From<event_entity::Model> for ProgressEvent {
    fn from(model: event_entity::Model) -> Self {
        Self {
            id: model.id,
            analysis_id: model.analysis_id,
            sequence: model.sequence,
            status: model.status.parse().unwrap_or_default(),
            progress: model.progress,
            stage: model
                .stage
                .parse()
                .unwrap_or(crate::domain::models::progress::ProgressStage::Queued),
            message: model.message,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl AnalysisRepository for AnalysisRepositoryImpl {
    async fn create(&self, record: &AnalysisRecord) -> Result<AnalysisRecord, RepositoryError> {
        let model: analysis_entity::ActiveModel = record.clone().into();

        model.insert(self.db.as_ref()).await?;
        Ok(record.clone())
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let model = analysis_entity::Entity::find_by_id(id)
            .filter(analysis_entity::Column::OwnerId.eq(owner_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn update(
        &self,
        id: Uuid,
        update: AnalysisUpdate,
    ) -> Result<AnalysisRecord, RepositoryError> {
        let sources: Vec<String> = update
            .allowed_sources()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut active = analysis_entity::ActiveModel {
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if let Some(status) = update.status {
            active.status = Set(status.to_string());
        }
        if let Some(progress) = update.progress {
            active.progress = Set(progress.clamp(0, 100));
        }
        if let Some(report) = &update.report {
            set_report(&mut active, report);
        }
        if let Some(score) = update.confidence_score {
            active.confidence_score = Set(Some(score.clamp(0.0, 1.0)));
        }
        if let Some(message) = update.error_message {
            active.error_message = Set(Some(message));
        }
        if let Some(started_at) = update.started_at {
            active.started_at = Set(Some(started_at));
        }
        if let Some(completed_at) = update.completed_at {
            active.completed_at = Set(Some(completed_at));
        }
        if let Some(duration_ms) = update.duration_ms {
            active.duration_ms = Set(Some(duration_ms));
        }

        // Single conditional statement: the source-status filter is what keeps
        // terminal records immutable under concurrent writers.
        let result = analysis_entity::Entity::update_many()
            .set(active)
            .filter(analysis_entity::Column::Id.eq(id))
            .filter(analysis_entity::Column::Status.is_in(sources))
            .exec(self.db.as_ref())
            .await?;

        let model = analysis_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::Conflict(format!(
                "analysis {} is {}",
                id, model.status
            )));
        }

        Ok(model.into())
    }

    async fn list_paginated(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
        order_by: HistoryOrder,
        direction: SortDirection,
    ) -> Result<(Vec<AnalysisRecord>, u64), RepositoryError> {
        let column = match order_by {
            HistoryOrder::CreatedAt => analysis_entity::Column::CreatedAt,
            HistoryOrder::CompletedAt => analysis_entity::Column::CompletedAt,
        };
        let order = match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };

        let query = analysis_entity::Entity::find()
            .filter(analysis_entity::Column::OwnerId.eq(owner_id));

        let total = query.clone().count(self.db.as_ref()).await?;

        let offset = page
            .saturating_sub(1)
            .checked_mul(limit)
            .filter(|offset| *offset < total);
        let Some(offset) = offset else {
            return Ok((Vec::new(), total));
        };

        let models = query
            .order_by(column, order.clone())
            .order_by(analysis_entity::Column::Id, order)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, RepositoryError> {
        let txn = self.db.begin().await?;

        let result = analysis_entity::Entity::delete_many()
            .filter(analysis_entity::Column::Id.eq(id))
            .filter(analysis_entity::Column::OwnerId.eq(owner_id))
            .exec(&txn)
            .await?;

        if result.rows_affected > 0 {
            event_entity::Entity::delete_many()
                .filter(event_entity::Column::AnalysisId.eq(id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn append_event(&self, event: &ProgressEvent) -> Result<ProgressEvent, RepositoryError> {
        let txn = self.db.begin().await?;

        // Row lock on the parent so a concurrent delete cannot strand the event.
        let parent = analysis_entity::Entity::find_by_id(event.analysis_id)
            .lock_exclusive()
            .one(&txn)
            .await?;
        if parent.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let last = event_entity::Entity::find()
            .filter(event_entity::Column::AnalysisId.eq(event.analysis_id))
            .order_by_desc(event_entity::Column::Sequence)
            .one(&txn)
            .await?;
        let sequence = last.map(|m| m.sequence + 1).unwrap_or(1);

        let model = event_entity::ActiveModel {
            id: Set(event.id),
            analysis_id: Set(event.analysis_id),
            sequence: Set(sequence),
            status: Set(event.status.to_string()),
            progress: Set(event.progress),
            stage: Set(event.stage.to_string()),
            message: Set(event.message.clone()),
            created_at: Set(event.created_at),
        };
        let inserted = model.insert(&txn).await?;

        txn.commit().await?;
        Ok(inserted.into())
    }

    async fn list_events(
        &self,
        analysis_id: Uuid,
        after: Option<i32>,
    ) -> Result<Vec<ProgressEvent>, RepositoryError> {
        let mut query = event_entity::Entity::find()
            .filter(event_entity::Column::AnalysisId.eq(analysis_id))
            .order_by_asc(event_entity::Column::Sequence);

        if let Some(after) = after {
            query = query.filter(event_entity::Column::Sequence.gt(after));
        }

        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
