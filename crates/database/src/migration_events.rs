use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Func},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    client::DbClient,
    entities::{
        migration_events,
        sea_orm_active_enums::{DistributionStatus, MigrationStatus},
    },
};

/// Audit fields written together with the move into `sent`.
#[derive(Debug, Clone)]
pub struct SentDistribution {
    pub tx_hash: String,
    pub token_address: String,
    pub sent_at: DateTimeWithTimeZone,
}

/// Keyset position in the `created_at DESC, id DESC` order of confirmed migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedCursor {
    pub created_at: DateTimeWithTimeZone,
    pub id: i64,
}

impl From<&migration_events::Model> for ConfirmedCursor {
    fn from(model: &migration_events::Model) -> Self {
        Self {
            created_at: model.created_at,
            id: model.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchMigrationsParams {
    pub items_count: u64,
    pub cursor_id: Option<i64>,
    pub distribution_status: Option<DistributionStatus>,
}

/// Distribution counts over confirmed migrations. NULL statuses count as pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionStats {
    pub total: u64,
    pub pending: u64,
    pub in_flight: u64,
    pub sent: u64,
    pub failed: u64,
}

impl DistributionStats {
    pub fn from_counts(rows: &[(Option<DistributionStatus>, i64)]) -> Self {
        let mut stats = Self::default();
        for (status, count) in rows {
            let count = (*count).max(0) as u64;
            stats.total += count;
            match status {
                None | Some(DistributionStatus::Pending) => stats.pending += count,
                Some(DistributionStatus::InFlight) => stats.in_flight += count,
                Some(DistributionStatus::Sent) => stats.sent += count,
                Some(DistributionStatus::Failed) => stats.failed += count,
            }
        }
        stats
    }
}

fn claimable() -> Condition {
    Condition::any()
        .add(migration_events::Column::DistributionStatus.is_null())
        .add(
            migration_events::Column::DistributionStatus
                .is_in([DistributionStatus::Pending, DistributionStatus::Failed]),
        )
}

impl DbClient {
    /// One page of confirmed migrations, newest first, starting after `after`.
    pub async fn list_confirmed(
        &self,
        limit: u64,
        after: Option<ConfirmedCursor>,
    ) -> eyre::Result<Vec<migration_events::Model>> {
        let mut query = migration_events::Entity::find()
            .filter(migration_events::Column::Status.eq(MigrationStatus::Confirmed));

        if let Some(cursor) = after {
            query = query.filter(
                Condition::any()
                    .add(migration_events::Column::CreatedAt.lt(cursor.created_at))
                    .add(
                        Condition::all()
                            .add(migration_events::Column::CreatedAt.eq(cursor.created_at))
                            .add(migration_events::Column::Id.lt(cursor.id)),
                    ),
            );
        }

        query
            .order_by_desc(migration_events::Column::CreatedAt)
            .order_by_desc(migration_events::Column::Id)
            .limit(limit)
            .all(&self.primary)
            .await
            .map_err(|e| {
                error!("Failed to fetch confirmed migrations: {:?}", e);
                eyre::eyre!("Failed to fetch confirmed migrations: {:?}", e)
            })
    }

    pub async fn find_migration(&self, id: i64) -> eyre::Result<Option<migration_events::Model>> {
        migration_events::Entity::find_by_id(id)
            .one(&self.primary)
            .await
            .map_err(|e| eyre::eyre!("Failed to fetch migration {}: {:?}", id, e))
    }

    /// Compare-and-swap into `in_flight`. Succeeds only when the record has not been
    /// attempted, is pending, or previously failed.
    pub async fn claim_distribution(&self, id: i64) -> eyre::Result<bool> {
        let now = Utc::now().fixed_offset();
        let result = migration_events::Entity::update_many()
            .set(migration_events::ActiveModel {
                distribution_status: Set(Some(DistributionStatus::InFlight)),
                distribution_claimed_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(migration_events::Column::Id.eq(id))
            .filter(migration_events::Column::Status.eq(MigrationStatus::Confirmed))
            .filter(claimable())
            .exec(&self.primary)
            .await
            .map_err(|e| {
                error!(id, "Failed to claim migration: {:?}", e);
                eyre::eyre!("Failed to claim migration {}: {:?}", id, e)
            })?;

        debug!(id, rows = result.rows_affected, "Claim attempted");
        Ok(result.rows_affected == 1)
    }

    /// Moves an in-flight record into `sent` and writes the audit fields in the same
    /// statement. Returns false when the record was not in flight.
    pub async fn mark_distribution_sent(
        &self,
        id: i64,
        sent: SentDistribution,
    ) -> eyre::Result<bool> {
        let result = migration_events::Entity::update_many()
            .set(migration_events::ActiveModel {
                distribution_status: Set(Some(DistributionStatus::Sent)),
                distribution_tx_hash: Set(Some(sent.tx_hash)),
                distribution_sent_at: Set(Some(sent.sent_at)),
                distribution_token_address: Set(Some(sent.token_address)),
                updated_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .filter(migration_events::Column::Id.eq(id))
            .filter(migration_events::Column::DistributionStatus.eq(DistributionStatus::InFlight))
            .exec(&self.primary)
            .await
            .map_err(|e| {
                error!(id, "Failed to mark migration as sent: {:?}", e);
                eyre::eyre!("Failed to mark migration {} as sent: {:?}", id, e)
            })?;

        Ok(result.rows_affected == 1)
    }

    /// Moves an in-flight record into `failed`. Audit fields are left untouched.
    pub async fn mark_distribution_failed(&self, id: i64) -> eyre::Result<bool> {
        let result = migration_events::Entity::update_many()
            .set(migration_events::ActiveModel {
                distribution_status: Set(Some(DistributionStatus::Failed)),
                updated_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .filter(migration_events::Column::Id.eq(id))
            .filter(migration_events::Column::DistributionStatus.eq(DistributionStatus::InFlight))
            .exec(&self.primary)
            .await
            .map_err(|e| {
                error!(id, "Failed to mark migration as failed: {:?}", e);
                eyre::eyre!("Failed to mark migration {} as failed: {:?}", id, e)
            })?;

        Ok(result.rows_affected == 1)
    }

    pub async fn fetch_migrations_paginated(
        &self,
        params: FetchMigrationsParams,
    ) -> eyre::Result<Vec<migration_events::Model>> {
        let mut query = migration_events::Entity::find()
            .filter(migration_events::Column::Status.eq(MigrationStatus::Confirmed));

        if let Some(cursor_id) = params.cursor_id {
            query = query.filter(migration_events::Column::Id.lt(cursor_id));
        }

        query = match params.distribution_status {
            Some(DistributionStatus::Pending) => query.filter(
                Condition::any()
                    .add(migration_events::Column::DistributionStatus.is_null())
                    .add(
                        migration_events::Column::DistributionStatus
                            .eq(DistributionStatus::Pending),
                    ),
            ),
            Some(status) => query.filter(migration_events::Column::DistributionStatus.eq(status)),
            None => query,
        };

        query
            .order_by_desc(migration_events::Column::Id)
            .limit(params.items_count)
            .all(&self.primary)
            .await
            .map_err(|e| eyre::eyre!("Failed to fetch migrations: {:?}", e))
    }

    pub async fn fetch_wallet_migrations(
        &self,
        wallet_address: &str,
    ) -> eyre::Result<Vec<migration_events::Model>> {
        migration_events::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(migration_events::Column::WalletAddress)))
                    .eq(wallet_address.to_lowercase()),
            )
            .order_by_desc(migration_events::Column::CreatedAt)
            .all(&self.primary)
            .await
            .map_err(|e| eyre::eyre!("Failed to fetch migrations for {}: {:?}", wallet_address, e))
    }

    pub async fn distribution_stats(&self) -> eyre::Result<DistributionStats> {
        let rows: Vec<(Option<DistributionStatus>, i64)> = migration_events::Entity::find()
            .select_only()
            .column(migration_events::Column::DistributionStatus)
            .column_as(migration_events::Column::Id.count(), "count")
            .filter(migration_events::Column::Status.eq(MigrationStatus::Confirmed))
            .group_by(migration_events::Column::DistributionStatus)
            .into_tuple()
            .all(&self.primary)
            .await
            .map_err(|e| eyre::eyre!("Failed to count distributions: {:?}", e))?;

        Ok(DistributionStats::from_counts(&rows))
    }
}
