// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::models::analysis::{AiProfile, AnalysisOptions};
use crate::utils::url_utils;

/// 单个校验问题，原样返回给调用方
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 分析请求数据传输对象
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AnalyzeRequestDto {
    /// 目标URL，必须带 http/https 协议
    #[validate(
        length(min = 1, max = 2048, message = "url must be 1-2048 characters"),
        custom(function = "validate_http_url")
    )]
    pub url: String,
    /// 分析选项，未提供的字段使用默认值
    #[serde(default)]
    pub options: Option<AnalysisOptionsDto>,
}

/// 分析选项
///
/// 所有字段可选；布尔字段类型错误在反序列化阶段就会被拒绝。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptionsDto {
    pub include_screenshots: Option<bool>,
    pub deep_analysis: Option<bool>,
    pub ai_profile: Option<String>,
    #[serde(alias = "includeLighthouse")]
    pub include_performance: Option<bool>,
    #[serde(alias = "includeSEO")]
    pub include_seo: Option<bool>,
    pub include_accessibility: Option<bool>,
    pub include_security: Option<bool>,
    pub include_technologies: Option<bool>,
    pub require_ai_insights: Option<bool>,
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    url_utils::parse_http_url(url).map(|_| ()).map_err(|reason| {
        let mut err = ValidationError::new("url");
        err.message = Some(
            format!(
                "Valid URL with protocol (http/https) is required: {}",
                reason
            )
            .into(),
        );
        err
    })
}

impl AnalysisOptionsDto {
    /// 合并默认值，返回最终选项或校验问题
    pub fn resolve(&self) -> Result<AnalysisOptions, Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let defaults = AnalysisOptions::default();

        let ai_profile = match self.ai_profile.as_deref() {
            None => defaults.ai_profile,
            Some(raw) => match raw.parse::<AiProfile>() {
                Ok(profile) => profile,
                Err(_) => {
                    issues.push(ValidationIssue::new(
                        "options.aiProfile",
                        "aiProfile must be technical, business, or mixed",
                    ));
                    defaults.ai_profile
                }
            },
        };

        let options = AnalysisOptions {
            include_screenshots: self
                .include_screenshots
                .unwrap_or(defaults.include_screenshots),
            deep_analysis: self.deep_analysis.unwrap_or(defaults.deep_analysis),
            ai_profile,
            include_performance: self
                .include_performance
                .unwrap_or(defaults.include_performance),
            include_seo: self.include_seo.unwrap_or(defaults.include_seo),
            include_accessibility: self
                .include_accessibility
                .unwrap_or(defaults.include_accessibility),
            include_security: self.include_security.unwrap_or(defaults.include_security),
            include_technologies: self
                .include_technologies
                .unwrap_or(defaults.include_technologies),
            require_ai_insights: self
                .require_ai_insights
                .unwrap_or(defaults.require_ai_insights),
        };

        if options.enabled_scanner_count() == 0 {
            issues.push(ValidationIssue::new(
                "options",
                "At least one scanner must be enabled",
            ));
        }

        if issues.is_empty() {
            Ok(options)
        } else {
            Err(issues)
        }
    }
}

impl AnalyzeRequestDto {
    /// 完整校验请求，返回规范化后的 URL 和选项
    pub fn into_submission(self) -> Result<(String, AnalysisOptions), Vec<ValidationIssue>> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        if let Err(errors) = self.validate() {
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors.iter() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    issues.push(ValidationIssue::new(field.to_string(), message));
                }
            }
        }

        let options = match self.options.unwrap_or_default().resolve() {
            Ok(options) => Some(options),
            Err(mut option_issues) => {
                issues.append(&mut option_issues);
                None
            }
        };

        match options {
            Some(options) if issues.is_empty() => Ok((self.url.trim().to_string(), options)),
            _ => Err(issues),
        }
    }
}
