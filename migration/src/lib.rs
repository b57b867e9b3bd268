// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_analyses;
mod m20261001_000002_create_analysis_jobs;
mod m20261001_000003_create_analysis_events;
mod m20261001_000004_create_api_keys;

/// 数据库迁移器
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    /// 获取所有迁移
    ///
    /// # 返回值
    ///
    /// 返回迁移列表
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_analyses::Migration),
            Box::new(m20261001_000002_create_analysis_jobs::Migration),
            Box::new(m20261001_000003_create_analysis_events::Migration),
            Box::new(m20261001_000004_create_api_keys::Migration),
        ]
    }
}
