// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台分析任务处理和工作器管理功能
/// 包括流水线执行、进度跟踪、租约回收和并发控制
pub mod analysis_worker;
pub mod manager;
pub mod progress;
pub mod reaper;
pub mod worker;

pub use worker::Worker;
