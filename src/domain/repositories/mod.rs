// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 分析仓库（analysis_repository）：分析记录与进度事件的持久化
/// - 任务仓库（job_repository）：分析任务的投递、租约与回收
pub mod analysis_repository;
pub mod job_repository;
