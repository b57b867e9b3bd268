// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "analyses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub options: Json,
    pub status: String,
    pub progress: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,
    pub basic: Option<Json>,
    pub technologies: Option<Json>,
    pub performance: Option<Json>,
    pub seo: Option<Json>,
    pub accessibility: Option<Json>,
    pub security: Option<Json>,
    pub ai_insights: Option<Json>,
    pub business_recommendations: Option<Json>,
    pub technical_recommendations: Option<Json>,
    pub risk_assessment: Option<Json>,
    #[sea_orm(column_type = "Double", nullable)]
    pub confidence_score: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub started_at: Option<ChronoDateTimeWithTimeZone>,
    pub completed_at: Option<ChronoDateTimeWithTimeZone>,
    pub duration_ms: Option<i64>,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
