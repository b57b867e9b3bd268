// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::models::analysis::{AnalysisOptions, AnalysisRecord};

/// 分析任务
///
/// 队列中的工作单元，主键即分析ID，因此每个分析最多只有一个任务。
/// 租约（lock_token + lock_expires_at）保证同一时刻只有一个工作器在处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// 对应的分析ID
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub options: AnalysisOptions,
    pub status: JobStatus,
    /// 已投递次数
    pub attempt_count: i32,
    /// 最大投递次数，超过后由租约回收器判定失败
    pub max_attempts: i32,
    pub lock_token: Option<Uuid>,
    pub lock_expires_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl AnalysisJob {
    /// 为分析记录创建任务
    pub fn for_record(record: &AnalysisRecord, max_attempts: i32) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: record.id,
            owner_id: record.owner_id,
            url: record.url.clone(),
            options: record.options.clone(),
            status: JobStatus::Queued,
            attempt_count: 0,
            max_attempts,
            lock_token: None,
            lock_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Active,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Active => write!(f, "active"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}
