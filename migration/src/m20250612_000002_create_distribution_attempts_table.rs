use crate::shared_enums::{DistributionAttempts, MigrationEvents};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Journal of submitted destination transfers, written before confirmation.
        manager
            .create_table(
                Table::create()
                    .table(DistributionAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DistributionAttempts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DistributionAttempts::MigrationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DistributionAttempts::SourceTxHash).string_len(100))
                    .col(
                        ColumnDef::new(DistributionAttempts::DestinationTxHash)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DistributionAttempts::TokenAddress)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistributionAttempts::AmountBaseUnits)
                            .string_len(80)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistributionAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_distribution_attempts_migration")
                            .from(DistributionAttempts::Table, DistributionAttempts::MigrationId)
                            .to(MigrationEvents::Table, MigrationEvents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distribution_attempts_migration")
                    .table(DistributionAttempts::Table)
                    .col(DistributionAttempts::MigrationId)
                    .col(DistributionAttempts::SourceTxHash)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DistributionAttempts::Table).to_owned())
            .await
    }
}
