use chrono::Utc;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::error;

use crate::{client::DbClient, entities::distribution_attempts};

/// A destination-chain transfer that has been submitted but not necessarily mined.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub migration_id: i64,
    pub source_tx_hash: Option<String>,
    pub destination_tx_hash: String,
    pub token_address: String,
    pub amount_base_units: String,
}

impl DbClient {
    pub async fn record_attempt(&self, attempt: NewAttempt) -> eyre::Result<()> {
        let model = distribution_attempts::ActiveModel {
            migration_id: Set(attempt.migration_id),
            source_tx_hash: Set(attempt.source_tx_hash),
            destination_tx_hash: Set(attempt.destination_tx_hash),
            token_address: Set(attempt.token_address),
            amount_base_units: Set(attempt.amount_base_units),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        distribution_attempts::Entity::insert(model)
            .exec(&self.primary)
            .await
            .map_err(|e| {
                error!(
                    migration_id = attempt.migration_id,
                    "Failed to record distribution attempt: {:?}", e
                );
                eyre::eyre!("Failed to record distribution attempt: {:?}", e)
            })?;

        Ok(())
    }

    /// Every journaled transfer for one migration, oldest first.
    pub async fn attempts_for(
        &self,
        migration_id: i64,
    ) -> eyre::Result<Vec<distribution_attempts::Model>> {
        distribution_attempts::Entity::find()
            .filter(distribution_attempts::Column::MigrationId.eq(migration_id))
            .order_by_asc(distribution_attempts::Column::Id)
            .all(&self.primary)
            .await
            .map_err(|e| eyre::eyre!("Failed to fetch attempts for {}: {:?}", migration_id, e))
    }
}
