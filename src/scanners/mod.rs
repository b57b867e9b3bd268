// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 扫描器模块
///
/// 抓取目标页面，并由各维度扫描器（性能、SEO、可访问性、安全、技术栈）
/// 基于同一份页面快照产出结构化结果
pub mod accessibility;
pub mod fetcher;
pub mod html;
pub mod performance;
pub mod registry;
pub mod security;
pub mod seo;
pub mod technology;
pub mod traits;
pub mod validators;

#[cfg(test)]
pub(crate) mod testing;
