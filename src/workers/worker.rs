// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 后台工作器
///
/// 分析工作器和租约回收器都实现此trait；`run` 只在不可恢复的错误时返回。
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行工作器主循环
    async fn run(&self) -> Result<(), WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;

    /// 在独立任务中运行，退出原因写入日志
    fn spawn(self) -> JoinHandle<()>
    where
        Self: Sized + 'static,
    {
        tokio::spawn(async move {
            match self.run().await {
                Ok(()) => info!("Worker {} exited", self.name()),
                Err(e) => error!("Worker {} stopped: {}", self.name(), e),
            }
        })
    }
}
