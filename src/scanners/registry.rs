// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScannerSettings;
use crate::domain::models::analysis::AnalysisOptions;
use crate::scanners::accessibility::AccessibilityScanner;
use crate::scanners::performance::PerformanceScanner;
use crate::scanners::security::SecurityScanner;
use crate::scanners::seo::SeoScanner;
use crate::scanners::technology::TechnologyScanner;
use crate::scanners::traits::{ScanContext, ScanOutput, Scanner, ScannerError, ScannerKind};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

/// 单个扫描器的结算结果
pub type ScanResult = (ScannerKind, Result<ScanOutput, ScannerError>);

/// 扫描器注册表
///
/// 持有全部扫描器，按分析选项挑选启用的扫描器并发执行，每个扫描器单独计时。
#[derive(Clone)]
pub struct ScannerRegistry {
    scanners: Vec<Arc<dyn Scanner>>,
    timeout: Duration,
}

impl ScannerRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            scanners: Vec::new(),
            timeout,
        }
    }

    /// 注册内置的五个扫描器
    pub fn with_defaults(
        settings: &ScannerSettings,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(timeout)
            .register(Arc::new(PerformanceScanner::new(settings)?))
            .register(Arc::new(SeoScanner))
            .register(Arc::new(AccessibilityScanner))
            .register(Arc::new(SecurityScanner))
            .register(Arc::new(TechnologyScanner)))
    }

    pub fn register(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.scanners.push(scanner);
        self
    }

    /// 选项中启用的扫描器
    pub fn enabled(&self, options: &AnalysisOptions) -> Vec<Arc<dyn Scanner>> {
        self.scanners
            .iter()
            .filter(|s| s.kind().enabled_in(options))
            .cloned()
            .collect()
    }

    /// 启动所有启用的扫描器，结果按完成顺序产出
    pub fn launch(&self, ctx: ScanContext) -> FuturesUnordered<BoxFuture<'static, ScanResult>> {
        let timeout = self.timeout;
        self.enabled(&ctx.options)
            .into_iter()
            .map(|scanner| {
                let ctx = ctx.clone();
                let kind = scanner.kind();
                let task = tokio::spawn(async move {
                    match tokio::time::timeout(timeout, scanner.scan(&ctx)).await {
                        Ok(result) => result,
                        Err(_) => Err(ScannerError::Timeout(timeout)),
                    }
                });
                async move {
                    let result = task.await.unwrap_or_else(|e| {
                        Err(ScannerError::Other(format!("scanner task aborted: {}", e)))
                    });
                    (kind, result)
                }
                .boxed()
            })
            .collect()
    }
}
