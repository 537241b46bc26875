use super::sea_orm_active_enums::{DistributionStatus, MigrationStatus};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "migration_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub acknowledgement_id: Option<String>,
    pub wallet_address: String,
    pub token_type: String,
    pub amount: String,
    pub old_contract_address: Option<String>,
    pub new_contract_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub block_number: Option<i64>,
    pub status: MigrationStatus,
    pub distribution_status: Option<DistributionStatus>,
    pub distribution_tx_hash: Option<String>,
    pub distribution_sent_at: Option<DateTimeWithTimeZone>,
    pub distribution_token_address: Option<String>,
    pub distribution_claimed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::distribution_attempts::Entity")]
    DistributionAttempts,
}

impl Related<super::distribution_attempts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DistributionAttempts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
