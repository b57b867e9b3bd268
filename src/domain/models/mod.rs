// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 分析记录（analysis）：一次 URL 分析从提交到终态的完整记录
/// - 分析结果（report）：各扫描器与 AI 增强产出的结构化结果
/// - 分析任务（job）：队列中的工作单元与租约信息
/// - 进度事件（progress）：只追加的阶段事件
pub mod analysis;
pub mod job;
pub mod progress;
pub mod report;
