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

use crate::config::settings::ScannerSettings;
use crate::scanners::traits::PageSnapshot;
use crate::scanners::validators::{self, TargetError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 目标地址被拒绝
    #[error(transparent)]
    Blocked(#[from] TargetError),
    /// 请求失败
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 目标返回错误状态码
    #[error("HTTP {0}")]
    Status(u16),
    /// URL 无效
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// 页面抓取器
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError>;
}

/// 基于 reqwest 的页面抓取器
pub struct HttpFetcher {
    client: reqwest::Client,
    settings: ScannerSettings,
}

impl HttpFetcher {
    pub fn new(settings: ScannerSettings) -> Result<Self, reqwest::Error> {
        let client = validators::client_builder(&settings).build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let requested = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if !self.settings.allow_private_targets {
            validators::validate_target(&requested).await?;
        }

        let start = Instant::now();
        // redirect hops are checked by the client's policy and resolver
        let mut response = self.client.get(requested.clone()).send().await?;
        let final_url = response.url().clone();

        let status_code = response.status().as_u16();
        if status_code >= 400 {
            return Err(FetchError::Status(status_code));
        }

        let mut headers = HashMap::new();
        let mut set_cookies = Vec::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            if name == reqwest::header::SET_COOKIE {
                set_cookies.push(value.to_string());
            }
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let content_type = headers
            .get("content-type")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "text/html".to_string());

        let limit = self.settings.max_body_bytes;
        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await? {
            let remaining = limit.saturating_sub(body.len());
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let response_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            url = %final_url,
            status_code,
            bytes = body.len(),
            truncated,
            "Fetched target page"
        );

        Ok(PageSnapshot {
            requested_url: requested,
            final_url,
            status_code,
            headers,
            set_cookies,
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
            response_time_ms,
            truncated,
        })
    }
}
