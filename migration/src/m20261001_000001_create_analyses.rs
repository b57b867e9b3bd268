use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Analyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Analyses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Analyses::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Analyses::Url).text().not_null())
                    .col(ColumnDef::new(Analyses::Options).json().not_null())
                    .col(ColumnDef::new(Analyses::Status).string().not_null())
                    .col(ColumnDef::new(Analyses::Progress).integer().not_null().default(0))
                    .col(ColumnDef::new(Analyses::Title).text())
                    .col(ColumnDef::new(Analyses::Basic).json())
                    .col(ColumnDef::new(Analyses::Technologies).json())
                    .col(ColumnDef::new(Analyses::Performance).json())
                    .col(ColumnDef::new(Analyses::Seo).json())
                    .col(ColumnDef::new(Analyses::Accessibility).json())
                    .col(ColumnDef::new(Analyses::Security).json())
                    .col(ColumnDef::new(Analyses::AiInsights).json())
                    .col(ColumnDef::new(Analyses::BusinessRecommendations).json())
                    .col(ColumnDef::new(Analyses::TechnicalRecommendations).json())
                    .col(ColumnDef::new(Analyses::RiskAssessment).json())
                    .col(ColumnDef::new(Analyses::ConfidenceScore).double())
                    .col(ColumnDef::new(Analyses::ErrorMessage).text())
                    .col(
                        ColumnDef::new(Analyses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Analyses::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Analyses::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Analyses::DurationMs).big_integer())
                    .col(
                        ColumnDef::new(Analyses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // History listing is always owner scoped and newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_analyses_owner_created")
                    .table(Analyses::Table)
                    .col(Analyses::OwnerId)
                    .col(Analyses::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Analyses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Analyses {
    Table,
    Id,
    OwnerId,
    Url,
    Options,
    Status,
    Progress,
    Title,
    Basic,
    Technologies,
    Performance,
    Seo,
    Accessibility,
    Security,
    AiInsights,
    BusinessRecommendations,
    TechnicalRecommendations,
    RiskAssessment,
    ConfidenceScore,
    ErrorMessage,
    CreatedAt,
    StartedAt,
    CompletedAt,
    DurationMs,
    UpdatedAt,
}
