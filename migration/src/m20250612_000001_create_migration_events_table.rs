use crate::shared_enums::MigrationEvents;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MigrationEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MigrationEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MigrationEvents::AcknowledgementId).string_len(100))
                    .col(
                        ColumnDef::new(MigrationEvents::WalletAddress)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MigrationEvents::TokenType)
                            .string_len(50)
                            .not_null(),
                    )
                    // Human-readable decimal, scaled by the token's decimals at send time.
                    .col(ColumnDef::new(MigrationEvents::Amount).text().not_null())
                    .col(ColumnDef::new(MigrationEvents::OldContractAddress).string_len(100))
                    .col(ColumnDef::new(MigrationEvents::NewContractAddress).string_len(100))
                    .col(ColumnDef::new(MigrationEvents::TransactionHash).string_len(100))
                    .col(ColumnDef::new(MigrationEvents::BlockNumber).big_integer())
                    .col(
                        ColumnDef::new(MigrationEvents::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(MigrationEvents::DistributionStatus).string_len(20))
                    .col(ColumnDef::new(MigrationEvents::DistributionTxHash).string_len(100))
                    .col(
                        ColumnDef::new(MigrationEvents::DistributionSentAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(MigrationEvents::DistributionTokenAddress).string_len(100),
                    )
                    .col(
                        ColumnDef::new(MigrationEvents::DistributionClaimedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(MigrationEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(MigrationEvents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_migration_events_status")
                    .table(MigrationEvents::Table)
                    .col(MigrationEvents::Status)
                    .col(MigrationEvents::DistributionStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_migration_events_wallet")
                    .table(MigrationEvents::Table)
                    .col(MigrationEvents::WalletAddress)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_migration_events_created_at")
                    .table(MigrationEvents::Table)
                    .col(MigrationEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MigrationEvents::Table).to_owned())
            .await
    }
}
