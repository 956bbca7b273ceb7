//! Create the snapshot tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FeatureReleases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeatureReleases::Version)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FeatureReleases::Payload).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SnapshotState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SnapshotState::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SnapshotState::Checksum).string().not_null())
                    .col(
                        ColumnDef::new(SnapshotState::StructuralHash)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SnapshotState::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SnapshotState::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeatureReleases::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum FeatureReleases {
    Table,
    Version,
    Payload,
}

#[derive(DeriveIden)]
enum SnapshotState {
    Table,
    Id,
    Checksum,
    StructuralHash,
    UpdatedAt,
}
