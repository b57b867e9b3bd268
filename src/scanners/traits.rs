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

use crate::domain::models::analysis::AnalysisOptions;
use crate::domain::models::report::{
    AccessibilityReport, AnalysisReport, BasicWebsiteData, PerformanceReport, SecurityReport,
    SeoReport, TechnologyReport,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// 扫描器错误类型
#[derive(Error, Debug)]
pub enum ScannerError {
    /// 超时
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// 网络请求失败
    #[error("request failed: {0}")]
    Fetch(String),
    /// 页面内容无法解析
    #[error("parse failed: {0}")]
    Parse(String),
    /// 其他错误
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ScannerError {
    fn from(e: reqwest::Error) -> Self {
        ScannerError::Fetch(e.to_string())
    }
}

/// 扫描器类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    Performance,
    Seo,
    Accessibility,
    Security,
    Technology,
}

impl ScannerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScannerKind::Performance => "performance",
            ScannerKind::Seo => "seo",
            ScannerKind::Accessibility => "accessibility",
            ScannerKind::Security => "security",
            ScannerKind::Technology => "technologies",
        }
    }

    /// 该类别在选项中是否启用
    pub fn enabled_in(&self, options: &AnalysisOptions) -> bool {
        match self {
            ScannerKind::Performance => options.include_performance,
            ScannerKind::Seo => options.include_seo,
            ScannerKind::Accessibility => options.include_accessibility,
            ScannerKind::Security => options.include_security,
            ScannerKind::Technology => options.include_technologies,
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 扫描器产出
#[derive(Debug, Clone)]
pub enum ScanOutput {
    Performance(PerformanceReport),
    Seo(SeoReport),
    Accessibility(AccessibilityReport),
    Security(SecurityReport),
    Technology(TechnologyReport),
}

impl ScanOutput {
    /// 写入分析结果的对应部分
    pub fn apply_to(self, report: &mut AnalysisReport) {
        match self {
            ScanOutput::Performance(r) => report.performance = Some(r),
            ScanOutput::Seo(r) => report.seo = Some(r),
            ScanOutput::Accessibility(r) => report.accessibility = Some(r),
            ScanOutput::Security(r) => report.security = Some(r),
            ScanOutput::Technology(r) => report.technologies = Some(r),
        }
    }
}

/// 目标页面快照
///
/// 一次抓取的结果，由所有扫描器共享。响应头的键统一为小写。
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub requested_url: Url,
    pub final_url: Url,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    /// 每个 `Set-Cookie` 头单独保存
    pub set_cookies: Vec<String>,
    pub content_type: String,
    pub body: String,
    pub response_time_ms: u64,
    /// 响应体超过上限被截断
    pub truncated: bool,
}

impl PageSnapshot {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_https(&self) -> bool {
        self.final_url.scheme() == "https"
    }

    pub fn redirected(&self) -> bool {
        self.final_url != self.requested_url
    }

    pub fn basic(&self) -> BasicWebsiteData {
        BasicWebsiteData {
            final_url: self.final_url.to_string(),
            status_code: self.status_code,
            content_type: self.content_type.clone(),
            content_length: self.body.len(),
            response_time_ms: self.response_time_ms,
            redirected: self.redirected(),
        }
    }
}

/// 扫描上下文
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub page: Arc<PageSnapshot>,
    pub options: AnalysisOptions,
}

/// 扫描器特质
///
/// 每个扫描器只负责一个维度，失败只影响自己的结果部分。
#[async_trait]
pub trait Scanner: Send + Sync {
    fn kind(&self) -> ScannerKind;

    async fn scan(&self, ctx: &ScanContext) -> Result<ScanOutput, ScannerError>;
}
