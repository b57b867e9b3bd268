// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// Worker错误类型
///
/// 只用于工作器循环本身（领取、确认任务）；单个分析的失败写入记录，不在此处体现。
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    QueueError(String),

    #[error("仓库错误: {0}")]
    RepositoryError(String),
}

impl From<crate::queue::job_queue::QueueError> for WorkerError {
    fn from(e: crate::queue::job_queue::QueueError) -> Self {
        WorkerError::QueueError(e.to_string())
    }
}

impl From<crate::domain::repositories::analysis_repository::RepositoryError> for WorkerError {
    fn from(e: crate::domain::repositories::analysis_repository::RepositoryError) -> Self {
        WorkerError::RepositoryError(e.to_string())
    }
}
