use std::{str::FromStr, time::Duration};

use alloy::primitives::{Address, B256};
use bigdecimal::BigDecimal;
use chrono::Utc;
use common::config::DistributorConfig;
use database::{
    attempts::NewAttempt,
    entities::{migration_events, sea_orm_active_enums::DistributionStatus},
    migration_events::{ConfirmedCursor, SentDistribution},
};
use providers::TokenTransferProvider;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    cancel::CancelSignal,
    classify::classify,
    error::DistributionError,
    state::transition,
    store::{DistributionUpdate, MigrationStore},
};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub page_size: u64,
    /// Throttle between records to stay under the RPC provider's rate limits.
    pub inter_record_delay: Duration,
    pub expected_chain_id: u64,
    /// Refuse the batch when the signer holds less than the pending total.
    pub check_balance: bool,
}

impl From<&DistributorConfig> for BatchSettings {
    fn from(config: &DistributorConfig) -> Self {
        Self {
            page_size: config.settings.page_size,
            inter_record_delay: Duration::from_millis(config.settings.inter_record_delay_ms),
            expected_chain_id: config.destination.chain_id,
            check_balance: config.settings.check_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySent,
    /// Another run holds the record, or it settled after this run fetched it.
    ClaimedElsewhere,
    NotDistributable(Option<DistributionStatus>),
    /// The claim write itself errored. The record was left as it was.
    ClaimFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// `recovered` is set when an earlier run's transfer was found mined and nothing
    /// new was sent.
    Sent { tx_hash: B256, recovered: bool },
    Failed { reason: String },
    Skipped(SkipReason),
    /// The transfer is on chain but the store did not take the `sent` write. The record
    /// stays `in_flight` until reconciled.
    Unresolved { tx_hash: B256, reason: String },
}

#[derive(Debug, Clone)]
pub struct RecordReport {
    pub id: i64,
    pub wallet_address: String,
    pub amount: String,
    pub outcome: RecordOutcome,
}

impl RecordReport {
    fn new(record: &migration_events::Model, outcome: RecordOutcome) -> Self {
        Self {
            id: record.id,
            wallet_address: record.wallet_address.clone(),
            amount: record.amount.clone(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub confirmed: usize,
    pub pending: usize,
    pub already_sent: usize,
    pub in_flight: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub cancelled: bool,
    pub total_sent_amount: BigDecimal,
    pub reports: Vec<RecordReport>,
}

impl BatchSummary {
    /// Records that went past the claim step.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed + self.unresolved
    }

    /// No record was eligible when the run started.
    pub fn is_noop(&self) -> bool {
        self.pending == 0
    }

    fn push(&mut self, report: RecordReport) {
        match &report.outcome {
            RecordOutcome::Sent { .. } => {
                self.succeeded += 1;
                if let Ok(amount) = BigDecimal::from_str(report.amount.trim()) {
                    self.total_sent_amount += amount;
                }
            }
            RecordOutcome::Failed { .. } => self.failed += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
            RecordOutcome::Unresolved { .. } => self.unresolved += 1,
        }
        self.reports.push(report);
    }
}

/// A destination-chain transfer known to be mined for a claimed record.
struct Delivery {
    tx_hash: B256,
    token_address: String,
    recovered: bool,
}

pub(crate) fn parse_token_address(
    token_address: Option<&str>,
) -> Result<Address, DistributionError> {
    let raw = token_address
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DistributionError::MissingTokenAddress)?;

    match Address::from_str(raw) {
        Ok(address) if !address.is_zero() => Ok(address),
        _ => Err(DistributionError::InvalidTokenAddress(raw.to_string())),
    }
}

/// Drives one operator-triggered batch over all pending distributions.
///
/// Records are processed strictly one after another with the same signer session.
/// Each record is claimed in the store before any transfer and resolved before the
/// next record starts.
pub struct BatchController<S, T> {
    store: S,
    session: T,
    settings: BatchSettings,
}

impl<S, T> BatchController<S, T>
where
    S: MigrationStore,
    T: TokenTransferProvider,
{
    pub fn new(store: S, session: T, settings: BatchSettings) -> Self {
        Self {
            store,
            session,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &T {
        &self.session
    }

    pub(crate) fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub(crate) fn ensure_chain(&self) -> Result<(), DistributionError> {
        let actual = self.session.chain_id();
        if actual != self.settings.expected_chain_id {
            return Err(DistributionError::WrongChain {
                expected: self.settings.expected_chain_id,
                actual,
            });
        }
        Ok(())
    }

    #[instrument(skip_all, fields(token = token_address.unwrap_or_default()))]
    pub async fn run(
        &self,
        token_address: Option<&str>,
        cancel: &CancelSignal,
    ) -> Result<BatchSummary, DistributionError> {
        let token = parse_token_address(token_address)?;
        self.ensure_chain()?;

        let records = self.load_confirmed().await?;
        let classification = classify(records);

        let mut summary = BatchSummary {
            confirmed: classification.total(),
            pending: classification.pending.len(),
            already_sent: classification.sent.len(),
            in_flight: classification.in_flight.len(),
            ..Default::default()
        };

        if !classification.in_flight.is_empty() {
            warn!(
                count = classification.in_flight.len(),
                "Records are still in flight from an earlier run, reconcile them before retrying"
            );
        }

        if classification.pending.is_empty() {
            info!(
                sent = summary.already_sent,
                "No pending distributions, nothing to do"
            );
            return Ok(summary);
        }

        if self.settings.check_balance {
            self.ensure_balance(token, &classification.pending).await?;
        }

        info!(
            pending = summary.pending,
            signer = %self.session.signer_address(),
            "Starting distribution batch"
        );

        let last = classification.pending.len() - 1;
        for (index, record) in classification.pending.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(remaining = summary.pending - index, "Batch cancelled by operator");
                summary.cancelled = true;
                break;
            }

            let outcome = self.distribute(token, record).await;
            summary.push(RecordReport::new(record, outcome));

            if index < last && !self.settings.inter_record_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.settings.inter_record_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            total_sent = %summary.total_sent_amount,
            "Batch complete"
        );

        Ok(summary)
    }

    /// Walks every page of confirmed migrations, newest first. Sent records never leave
    /// the set, so stopping at the first page would starve older pending records.
    pub(crate) async fn load_confirmed(
        &self,
    ) -> Result<Vec<migration_events::Model>, DistributionError> {
        let page_size = self.settings.page_size.max(1);
        let mut records = Vec::new();
        let mut cursor: Option<ConfirmedCursor> = None;

        loop {
            let page = self
                .store
                .list_confirmed(page_size, cursor)
                .await
                .map_err(DistributionError::Store)?;
            let full = page.len() as u64 == page_size;
            cursor = page.last().map(ConfirmedCursor::from);
            records.extend(page);

            if !full {
                break;
            }
            debug!(loaded = records.len(), "Confirmed page full, fetching the next one");
        }

        Ok(records)
    }

    async fn ensure_balance(
        &self,
        token: Address,
        pending: &[migration_events::Model],
    ) -> Result<(), DistributionError> {
        let required: BigDecimal = pending
            .iter()
            .filter_map(|record| BigDecimal::from_str(record.amount.trim()).ok())
            .sum();

        let decimals = self
            .session
            .token_decimals(token)
            .await
            .map_err(DistributionError::Chain)?;
        let balance = self
            .session
            .token_balance(token)
            .await
            .map_err(DistributionError::Chain)?;
        let available = BigDecimal::from_str(&format!("{}e-{}", balance, decimals))
            .map_err(|e| DistributionError::Chain(eyre::eyre!("Unreadable balance: {}", e)))?;

        if available < required {
            return Err(DistributionError::InsufficientBalance {
                required,
                available,
            });
        }

        Ok(())
    }

    #[instrument(
        skip_all,
        fields(id = record.id, wallet = %record.wallet_address, amount = %record.amount)
    )]
    async fn distribute(&self, token: Address, record: &migration_events::Model) -> RecordOutcome {
        if record.distribution_status == Some(DistributionStatus::Sent) {
            info!("Skipping record, already sent");
            return RecordOutcome::Skipped(SkipReason::AlreadySent);
        }
        if let Err(e) = transition(record.distribution_status, DistributionStatus::InFlight) {
            warn!("Skipping record: {}", e);
            return RecordOutcome::Skipped(SkipReason::NotDistributable(record.distribution_status));
        }

        match self.store.claim(record.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Record was claimed by another run or settled since it was fetched");
                return RecordOutcome::Skipped(SkipReason::ClaimedElsewhere);
            }
            Err(e) => {
                error!("Failed to claim record: {:?}", e);
                return RecordOutcome::Skipped(SkipReason::ClaimFailed(e.to_string()));
            }
        }

        // Claimed: from here every path writes `sent` or `failed`.
        match self.deliver(token, record).await {
            Ok(delivery) => self.settle_sent(record, delivery).await,
            Err(reason) => self.settle_failed(record, reason).await,
        }
    }

    async fn deliver(
        &self,
        token: Address,
        record: &migration_events::Model,
    ) -> Result<Delivery, String> {
        if let Some(delivery) = self.previous_delivery(record).await? {
            return Ok(delivery);
        }

        let recipient = Address::from_str(record.wallet_address.trim())
            .map_err(|e| format!("invalid wallet address: {}", e))?;

        let submitted = self
            .session
            .submit_transfer(token, recipient, &record.amount)
            .await
            .map_err(|e| format!("transfer submission failed: {}", e))?;

        let attempt = NewAttempt {
            migration_id: record.id,
            source_tx_hash: record.transaction_hash.clone(),
            destination_tx_hash: submitted.tx_hash.to_string(),
            token_address: token.to_string(),
            amount_base_units: submitted.amount_base_units.to_string(),
        };
        if let Err(e) = self.store.record_attempt(attempt).await {
            warn!(tx_hash = %submitted.tx_hash, "Failed to journal distribution attempt: {:?}", e);
        }

        let tx_hash = self
            .session
            .wait_for_confirmation(submitted.tx_hash)
            .await
            .map_err(|e| format!("transfer not confirmed: {}", e))?;

        Ok(Delivery {
            tx_hash,
            token_address: token.to_string(),
            recovered: false,
        })
    }

    /// Checks every journaled transfer of this record for one that made it on chain, so
    /// a record whose `sent` write was lost is not paid twice. A later reverted retry does
    /// not hide an earlier attempt that mined.
    async fn previous_delivery(
        &self,
        record: &migration_events::Model,
    ) -> Result<Option<Delivery>, String> {
        let attempts = self
            .store
            .attempts_for(record.id)
            .await
            .map_err(|e| format!("attempt lookup failed: {}", e))?;

        let mut without_receipt = 0usize;
        for attempt in attempts.into_iter().rev() {
            let tx_hash = B256::from_str(&attempt.destination_tx_hash)
                .map_err(|e| format!("journaled hash is unreadable: {}", e))?;
            let status = self
                .session
                .receipt_status(tx_hash)
                .await
                .map_err(|e| format!("receipt lookup failed: {}", e))?;

            match status {
                Some(true) => {
                    info!(%tx_hash, "Earlier transfer for this record is mined, not sending again");
                    return Ok(Some(Delivery {
                        tx_hash,
                        token_address: attempt.token_address,
                        recovered: true,
                    }));
                }
                Some(false) => {}
                None => without_receipt += 1,
            }
        }

        if without_receipt > 0 {
            warn!(without_receipt, "Earlier transfers have no receipt, sending again");
        }
        Ok(None)
    }

    async fn settle_sent(
        &self,
        record: &migration_events::Model,
        delivery: Delivery,
    ) -> RecordOutcome {
        let tx_hash = delivery.tx_hash;
        let update = DistributionUpdate::Sent(SentDistribution {
            tx_hash: tx_hash.to_string(),
            token_address: delivery.token_address,
            sent_at: Utc::now().fixed_offset(),
        });

        match self.store.update_distribution(record.id, update).await {
            Ok(true) => {
                info!(%tx_hash, recovered = delivery.recovered, "Distribution sent");
                RecordOutcome::Sent {
                    tx_hash,
                    recovered: delivery.recovered,
                }
            }
            Ok(false) => {
                error!(%tx_hash, "Transfer mined but the record was no longer in flight");
                RecordOutcome::Unresolved {
                    tx_hash,
                    reason: "record was no longer in flight".to_string(),
                }
            }
            Err(e) => {
                error!(%tx_hash, "Transfer mined but the sent status was not written: {:?}", e);
                RecordOutcome::Unresolved {
                    tx_hash,
                    reason: format!("status write failed: {}", e),
                }
            }
        }
    }

    async fn settle_failed(
        &self,
        record: &migration_events::Model,
        reason: String,
    ) -> RecordOutcome {
        error!("Distribution failed: {}", reason);

        match self
            .store
            .update_distribution(record.id, DistributionUpdate::Failed)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!("Failed status not written, record was no longer in flight"),
            Err(e) => error!("Failed status not written, record stays in flight: {:?}", e),
        }

        RecordOutcome::Failed { reason }
    }
}
