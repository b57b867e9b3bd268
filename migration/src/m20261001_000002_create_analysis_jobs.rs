use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalysisJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalysisJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnalysisJobs::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(AnalysisJobs::Url).text().not_null())
                    .col(ColumnDef::new(AnalysisJobs::Options).json().not_null())
                    .col(ColumnDef::new(AnalysisJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(AnalysisJobs::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AnalysisJobs::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(ColumnDef::new(AnalysisJobs::LockToken).uuid())
                    .col(ColumnDef::new(AnalysisJobs::LockExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AnalysisJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AnalysisJobs::UpdatedAt)
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
                    .name("idx_analysis_jobs_status_created")
                    .table(AnalysisJobs::Table)
                    .col(AnalysisJobs::Status)
                    .col(AnalysisJobs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalysisJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AnalysisJobs {
    Table,
    Id,
    OwnerId,
    Url,
    Options,
    Status,
    AttemptCount,
    MaxAttempts,
    LockToken,
    LockExpiresAt,
    CreatedAt,
    UpdatedAt,
}
