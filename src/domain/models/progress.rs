// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::models::analysis::AnalysisStatus;

/// 进度事件
///
/// 只追加的离散事件，按 `sequence` 排序即可重放一次分析的完整过程。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub id: Uuid,
    pub analysis_id: Uuid,
    /// 同一分析内单调递增，由仓库在写入时分配
    pub sequence: i32,
    pub status: AnalysisStatus,
    pub progress: i32,
    pub stage: ProgressStage,
    pub message: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl ProgressEvent {
    pub fn new(
        analysis_id: Uuid,
        status: AnalysisStatus,
        progress: i32,
        stage: ProgressStage,
        message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            analysis_id,
            sequence: 0,
            status,
            progress,
            stage,
            message,
            created_at: Utc::now().into(),
        }
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Queued,
    Fetching,
    Scanning,
    Enriching,
    Completed,
    Failed,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ProgressStage::Queued => "queued",
            ProgressStage::Fetching => "fetching",
            ProgressStage::Scanning => "scanning",
            ProgressStage::Enriching => "enriching",
            ProgressStage::Completed => "completed",
            ProgressStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for ProgressStage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ProgressStage::Queued),
            "fetching" => Ok(ProgressStage::Fetching),
            "scanning" => Ok(ProgressStage::Scanning),
            "enriching" => Ok(ProgressStage::Enriching),
            "completed" => Ok(ProgressStage::Completed),
            "failed" => Ok(ProgressStage::Failed),
            _ => Err(()),
        }
    }
}
