// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 增强服务（enrichment_service）：根据扫描结果生成 AI 洞察和建议
/// - 身份服务（identity_provider）：把调用方凭证解析为所有者ID
/// - LLM服务（llm_service）：与 OpenAI 兼容接口交互
pub mod enrichment_service;
pub mod identity_provider;
pub mod llm_service;
