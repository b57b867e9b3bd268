use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalysisEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalysisEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnalysisEvents::AnalysisId).uuid().not_null())
                    .col(ColumnDef::new(AnalysisEvents::Sequence).integer().not_null())
                    .col(ColumnDef::new(AnalysisEvents::Status).string().not_null())
                    .col(ColumnDef::new(AnalysisEvents::Progress).integer().not_null())
                    .col(ColumnDef::new(AnalysisEvents::Stage).string().not_null())
                    .col(ColumnDef::new(AnalysisEvents::Message).text())
                    .col(
                        ColumnDef::new(AnalysisEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analysis_events_analysis_sequence")
                    .table(AnalysisEvents::Table)
                    .col(AnalysisEvents::AnalysisId)
                    .col(AnalysisEvents::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalysisEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AnalysisEvents {
    Table,
    Id,
    AnalysisId,
    Sequence,
    Status,
    Progress,
    Stage,
    Message,
    CreatedAt,
}
