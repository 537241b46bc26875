use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub enum MigrationEvents {
    Table,
    Id,
    AcknowledgementId,
    WalletAddress,
    TokenType,
    Amount,
    OldContractAddress,
    NewContractAddress,
    TransactionHash,
    BlockNumber,
    Status,
    DistributionStatus,
    DistributionTxHash,
    DistributionSentAt,
    DistributionTokenAddress,
    DistributionClaimedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum DistributionAttempts {
    Table,
    Id,
    MigrationId,
    SourceTxHash,
    DestinationTxHash,
    TokenAddress,
    AmountBaseUnits,
    CreatedAt,
}
