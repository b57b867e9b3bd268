// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::analysis::AnalysisStatus;
use crate::domain::models::progress::{ProgressEvent, ProgressStage};
use crate::domain::repositories::analysis_repository::{
    AnalysisRepository, AnalysisUpdate, RepositoryError,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 单次执行内的进度跟踪器
///
/// 进度值只增不减；每次进度或阶段变化都会追加一条进度事件。
/// 事件写入失败只记录日志，不影响流水线。
pub struct ProgressTracker<R: AnalysisRepository> {
    repository: Arc<R>,
    analysis_id: Uuid,
    last_progress: i32,
    last_stage: Option<ProgressStage>,
}

impl<R: AnalysisRepository> ProgressTracker<R> {
    pub fn new(repository: Arc<R>, analysis_id: Uuid) -> Self {
        Self {
            repository,
            analysis_id,
            last_progress: 0,
            last_stage: None,
        }
    }

    /// 推进进度
    ///
    /// 低于当前值的进度按当前值处理。记录已被删除或已进入终态时返回
    /// `NotFound` / `Conflict`，由调用方决定如何处理。
    pub async fn advance(
        &mut self,
        progress: i32,
        stage: ProgressStage,
        message: Option<String>,
    ) -> Result<(), RepositoryError> {
        let progress = progress.clamp(0, 100).max(self.last_progress);
        if progress == self.last_progress && self.last_stage == Some(stage) {
            return Ok(());
        }

        if progress != self.last_progress {
            self.repository
                .update(self.analysis_id, AnalysisUpdate::progress(progress))
                .await?;
        }
        self.last_progress = progress;
        self.last_stage = Some(stage);

        debug!(analysis_id = %self.analysis_id, progress, stage = %stage, "Progress advanced");
        self.append(AnalysisStatus::Running, stage, message).await;
        Ok(())
    }

    /// 记录终态事件，状态本身由调用方写入记录
    pub async fn finish(&mut self, status: AnalysisStatus, message: Option<String>) {
        let stage = match status {
            AnalysisStatus::Completed => {
                self.last_progress = 100;
                ProgressStage::Completed
            }
            _ => ProgressStage::Failed,
        };
        self.last_stage = Some(stage);
        self.append(status, stage, message).await;
    }

    async fn append(&self, status: AnalysisStatus, stage: ProgressStage, message: Option<String>) {
        let event = ProgressEvent::new(
            self.analysis_id,
            status,
            self.last_progress,
            stage,
            message,
        );
        if let Err(e) = self.repository.append_event(&event).await {
            warn!(analysis_id = %self.analysis_id, "Failed to append progress event: {}", e);
        }
    }
}
