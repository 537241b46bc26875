use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "distribution_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub migration_id: i64,
    pub source_tx_hash: Option<String>,
    pub destination_tx_hash: String,
    pub token_address: String,
    pub amount_base_units: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::migration_events::Entity",
        from = "Column::MigrationId",
        to = "super::migration_events::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    MigrationEvents,
}

impl Related<super::migration_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MigrationEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
