// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::analysis_repository::{HistoryOrder, SortDirection};
use serde::Deserialize;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// 历史记录查询参数
///
/// `sortBy` 取 `createdAt` / `completedAt`，`order` 取 `asc` / `desc`，
/// 默认按创建时间倒序。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQueryDto {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<HistoryOrder>,
    pub order: Option<SortDirection>,
}

impl HistoryQueryDto {
    /// 返回规范化后的 (page, limit)：page 至少为 1，limit 限制在 1..=100
    pub fn normalized(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }

    pub fn ordering(&self) -> (HistoryOrder, SortDirection) {
        (
            self.sort_by.unwrap_or_default(),
            self.order.unwrap_or_default(),
        )
    }
}

/// 进度事件查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQueryDto {
    /// 只返回序号大于该值的事件
    pub after: Option<i32>,
}
