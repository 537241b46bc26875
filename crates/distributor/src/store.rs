use async_trait::async_trait;
use database::{
    attempts::NewAttempt,
    client::DbClient,
    entities::{distribution_attempts, migration_events},
    migration_events::{ConfirmedCursor, SentDistribution},
};

/// Partial update of the destination-chain leg of one record.
#[derive(Debug, Clone)]
pub enum DistributionUpdate {
    /// Status and all three audit fields, written together.
    Sent(SentDistribution),
    /// Status only; audit fields are left as they were.
    Failed,
}

/// The record store as seen by the batch controller.
///
/// Every write is conditional on the record's current status and reports whether it
/// took effect, so two runs racing on one record cannot both win.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// One page of confirmed migrations, newest first, at most `limit`, strictly after
    /// `after` in that order.
    async fn list_confirmed(
        &self,
        limit: u64,
        after: Option<ConfirmedCursor>,
    ) -> eyre::Result<Vec<migration_events::Model>>;

    /// Marks the record `in_flight` if nobody else holds it and it is not sent.
    async fn claim(&self, id: i64) -> eyre::Result<bool>;

    /// Resolves an `in_flight` record.
    async fn update_distribution(&self, id: i64, update: DistributionUpdate)
    -> eyre::Result<bool>;

    async fn record_attempt(&self, attempt: NewAttempt) -> eyre::Result<()>;

    /// All journaled transfers for the record, oldest first.
    async fn attempts_for(
        &self,
        migration_id: i64,
    ) -> eyre::Result<Vec<distribution_attempts::Model>>;
}

#[async_trait]
impl MigrationStore for DbClient {
    async fn list_confirmed(
        &self,
        limit: u64,
        after: Option<ConfirmedCursor>,
    ) -> eyre::Result<Vec<migration_events::Model>> {
        DbClient::list_confirmed(self, limit, after).await
    }

    async fn claim(&self, id: i64) -> eyre::Result<bool> {
        self.claim_distribution(id).await
    }

    async fn update_distribution(
        &self,
        id: i64,
        update: DistributionUpdate,
    ) -> eyre::Result<bool> {
        match update {
            DistributionUpdate::Sent(sent) => self.mark_distribution_sent(id, sent).await,
            DistributionUpdate::Failed => self.mark_distribution_failed(id).await,
        }
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> eyre::Result<()> {
        DbClient::record_attempt(self, attempt).await
    }

    async fn attempts_for(
        &self,
        migration_id: i64,
    ) -> eyre::Result<Vec<distribution_attempts::Model>> {
        DbClient::attempts_for(self, migration_id).await
    }
}
