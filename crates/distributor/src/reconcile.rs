use std::str::FromStr;

use alloy::primitives::B256;
use chrono::Utc;
use database::{
    entities::{migration_events, sea_orm_active_enums::DistributionStatus},
    migration_events::SentDistribution,
};
use providers::TokenTransferProvider;
use tracing::{error, info, instrument, warn};

use crate::{
    classify::classify,
    controller::BatchController,
    error::DistributionError,
    state::transition,
    store::{DistributionUpdate, MigrationStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Sent { tx_hash: B256 },
    Failed { tx_hash: B256 },
    /// No journaled transfer, or the chain has no receipt for it yet.
    NeedsReview { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    pub resolved_sent: usize,
    pub resolved_failed: usize,
    pub needs_review: Vec<(i64, String)>,
    pub outcomes: Vec<(i64, ReconcileOutcome)>,
}

impl ReconcileSummary {
    fn push(&mut self, id: i64, outcome: ReconcileOutcome) {
        match &outcome {
            ReconcileOutcome::Sent { .. } => self.resolved_sent += 1,
            ReconcileOutcome::Failed { .. } => self.resolved_failed += 1,
            ReconcileOutcome::NeedsReview { reason } => {
                self.needs_review.push((id, reason.clone()))
            }
        }
        self.outcomes.push((id, outcome));
    }
}

impl<S, T> BatchController<S, T>
where
    S: MigrationStore,
    T: TokenTransferProvider,
{
    /// Resolves records left `in_flight` by an interrupted run using the transfer
    /// journal and on-chain receipts. Nothing is transferred.
    #[instrument(skip_all)]
    pub async fn reconcile(&self) -> Result<ReconcileSummary, DistributionError> {
        self.ensure_chain()?;

        let records = self.load_confirmed().await?;
        let in_flight = classify(records).in_flight;

        let mut summary = ReconcileSummary::default();
        if in_flight.is_empty() {
            info!("No in-flight distributions to reconcile");
            return Ok(summary);
        }

        for record in &in_flight {
            let outcome = self.reconcile_one(record).await?;
            summary.push(record.id, outcome);
        }

        info!(
            sent = summary.resolved_sent,
            failed = summary.resolved_failed,
            review = summary.needs_review.len(),
            "Reconciliation complete"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(id = record.id))]
    async fn reconcile_one(
        &self,
        record: &migration_events::Model,
    ) -> Result<ReconcileOutcome, DistributionError> {
        let attempts = self
            .store()
            .attempts_for(record.id)
            .await
            .map_err(DistributionError::Store)?;

        // Newest first. Any mined attempt wins over later reverts or pending retries.
        let mut mined = None;
        let mut without_receipt = None;
        let mut reverted = None;
        for attempt in attempts.into_iter().rev() {
            let tx_hash = match B256::from_str(&attempt.destination_tx_hash) {
                Ok(hash) => hash,
                Err(e) => {
                    return Ok(ReconcileOutcome::NeedsReview {
                        reason: format!("journaled hash is unreadable: {}", e),
                    });
                }
            };

            let status = self
                .session()
                .receipt_status(tx_hash)
                .await
                .map_err(DistributionError::Chain)?;
            match status {
                Some(true) => {
                    mined = Some((tx_hash, attempt.token_address));
                    break;
                }
                Some(false) => {
                    reverted.get_or_insert(tx_hash);
                }
                None => {
                    without_receipt.get_or_insert(tx_hash);
                }
            }
        }

        let (tx_hash, target, update) = match (mined, without_receipt, reverted) {
            (Some((tx_hash, token_address)), _, _) => (
                tx_hash,
                DistributionStatus::Sent,
                DistributionUpdate::Sent(SentDistribution {
                    tx_hash: tx_hash.to_string(),
                    token_address,
                    sent_at: Utc::now().fixed_offset(),
                }),
            ),
            (None, Some(tx_hash), _) => {
                return Ok(ReconcileOutcome::NeedsReview {
                    reason: format!("no receipt yet for {}", tx_hash),
                });
            }
            (None, None, Some(tx_hash)) => {
                (tx_hash, DistributionStatus::Failed, DistributionUpdate::Failed)
            }
            (None, None, None) => {
                warn!("In-flight record has no journaled transfer");
                return Ok(ReconcileOutcome::NeedsReview {
                    reason: "no transfer was journaled for this claim".to_string(),
                });
            }
        };
        transition(record.distribution_status, target)?;

        let written = self
            .store()
            .update_distribution(record.id, update)
            .await
            .map_err(DistributionError::Store)?;
        if !written {
            error!(%tx_hash, "Record left in-flight state while reconciling");
            return Ok(ReconcileOutcome::NeedsReview {
                reason: "record changed while reconciling".to_string(),
            });
        }

        info!(%tx_hash, status = %target, "In-flight record resolved");
        Ok(match target {
            DistributionStatus::Sent => ReconcileOutcome::Sent { tx_hash },
            _ => ReconcileOutcome::Failed { tx_hash },
        })
    }

    /// Operator override: gives up on an in-flight claim so the next run retries it.
    /// Records in any other state are left alone.
    #[instrument(skip(self))]
    pub async fn release(&self, id: i64) -> Result<bool, DistributionError> {
        let released = self
            .store()
            .update_distribution(id, DistributionUpdate::Failed)
            .await
            .map_err(DistributionError::Store)?;

        if released {
            warn!("In-flight claim released, the record will be retried");
        } else {
            info!("Record is not in flight, nothing released");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cancel::CancelSignal,
        testing::{FakeSession, InMemoryStore, TOKEN, event, settings},
    };

    #[tokio::test]
    async fn resolves_from_journal_and_receipts() {
        let mined = B256::repeat_byte(0x01);
        let reverted = B256::repeat_byte(0x02);
        let unknown = B256::repeat_byte(0x03);
        let store = InMemoryStore::new(vec![
            event(1, "5", Some(DistributionStatus::InFlight)),
            event(2, "5", Some(DistributionStatus::InFlight)),
            event(3, "5", Some(DistributionStatus::InFlight)),
            event(4, "5", Some(DistributionStatus::InFlight)),
            event(5, "5", Some(DistributionStatus::Sent)),
        ]);
        store.journal(1, mined);
        store.journal(2, reverted);
        store.journal(3, unknown);
        let session = FakeSession::new()
            .with_receipt(mined, true)
            .with_receipt(reverted, false);
        let controller = BatchController::new(store, session, settings());

        let summary = controller.reconcile().await.unwrap();

        assert_eq!(summary.resolved_sent, 1);
        assert_eq!(summary.resolved_failed, 1);
        let review: Vec<i64> = summary.needs_review.iter().map(|(id, _)| *id).collect();
        assert_eq!(review, vec![3, 4]);

        let sent = controller.store().record(1);
        assert_eq!(sent.distribution_status, Some(DistributionStatus::Sent));
        assert_eq!(sent.distribution_tx_hash, Some(mined.to_string()));
        assert!(sent.distribution_sent_at.is_some());
        assert!(sent.distribution_token_address.is_some());

        let failed = controller.store().record(2);
        assert_eq!(failed.distribution_status, Some(DistributionStatus::Failed));
        assert_eq!(failed.distribution_tx_hash, None);

        assert_eq!(
            controller.store().record(3).distribution_status,
            Some(DistributionStatus::InFlight)
        );
        assert!(controller.session().transfers().is_empty());
    }

    #[tokio::test]
    async fn lost_write_is_settled_by_reconcile() {
        let store = InMemoryStore::new(vec![event(1, "5", None)]);
        store.fail_sent_writes(true);
        let controller = BatchController::new(store, FakeSession::new(), settings());

        let first = controller
            .run(Some(TOKEN), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(first.unresolved, 1);

        controller.store().fail_sent_writes(false);
        let summary = controller.reconcile().await.unwrap();

        assert_eq!(summary.resolved_sent, 1);
        assert_eq!(
            controller.store().record(1).distribution_status,
            Some(DistributionStatus::Sent)
        );
        assert_eq!(controller.session().transfers().len(), 1);
    }

    #[tokio::test]
    async fn release_only_touches_in_flight_records() {
        let controller = BatchController::new(
            InMemoryStore::new(vec![
                event(1, "5", Some(DistributionStatus::InFlight)),
                event(2, "5", Some(DistributionStatus::Sent)),
            ]),
            FakeSession::new(),
            settings(),
        );

        assert!(controller.release(1).await.unwrap());
        assert!(!controller.release(2).await.unwrap());
        assert_eq!(
            controller.store().record(1).distribution_status,
            Some(DistributionStatus::Failed)
        );
        assert_eq!(
            controller.store().record(2).distribution_status,
            Some(DistributionStatus::Sent)
        );
    }

    #[tokio::test]
    async fn mined_attempt_wins_over_a_later_revert() {
        let mined = B256::repeat_byte(0xaa);
        let reverted = B256::repeat_byte(0xbb);
        let store = InMemoryStore::new(vec![event(1, "5", Some(DistributionStatus::InFlight))]);
        store.journal(1, mined);
        store.journal(1, reverted);
        let session = FakeSession::new()
            .with_receipt(mined, true)
            .with_receipt(reverted, false);
        let controller = BatchController::new(store, session, settings());

        let summary = controller.reconcile().await.unwrap();

        assert_eq!(summary.outcomes, vec![(1, ReconcileOutcome::Sent { tx_hash: mined })]);
        assert_eq!(
            controller.store().record(1).distribution_tx_hash,
            Some(mined.to_string())
        );
    }
}
