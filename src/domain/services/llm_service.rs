// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::settings::LlmSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMServiceTrait: Send + Sync {
    /// 请求一次 JSON 格式的补全
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<(Value, TokenUsage)>;

    /// 使用的模型名称
    fn model(&self) -> &str;
}

/// LLM服务 - 处理与LLM提供商的交互
///
/// 调用 OpenAI 兼容的 `chat/completions` 接口。配置来自 [`LlmSettings`]，
/// 未配置 API 密钥时每次调用都返回错误。
pub struct LLMService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
}

#[async_trait]
impl LLMServiceTrait for LLMService {
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<(Value, TokenUsage)> {
        LLMService::complete_json(self, system, prompt).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl LLMService {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build LLM HTTP client")?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// 请求 LLM 并把回复解析为 JSON
    ///
    /// # 错误
    /// * 当LLM API密钥未配置时返回错误
    /// * 当LLM服务调用失败或回复不是合法 JSON 时返回错误
    pub async fn complete_json(&self, system: &str, prompt: &str) -> Result<(Value, TokenUsage)> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("LLM API key not configured"))?;

        let request_body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" }
        });

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "LLM API returned error: {} - {}",
                status,
                error_text
            ));
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse LLM API response")?;

        let usage = if let Some(usage_val) = body.get("usage") {
            TokenUsage {
                prompt_tokens: usage_val["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage_val["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage_val["total_tokens"].as_u64().unwrap_or(0) as u32,
            }
        } else {
            TokenUsage::default()
        };

        if let Some(content) = body["choices"][0]["message"]["content"].as_str() {
            // Clean up potential markdown code blocks
            let clean_content = content
                .trim()
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```");

            let data = serde_json::from_str::<Value>(clean_content)
                .context("Failed to parse JSON content returned by the LLM")?;
            Ok((data, usage))
        } else {
            Err(anyhow::anyhow!("Invalid response format from LLM API"))
        }
    }
}
