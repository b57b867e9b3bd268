// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 编排领域仓库和任务队列，供 HTTP 处理器调用
pub mod analysis_use_case;
