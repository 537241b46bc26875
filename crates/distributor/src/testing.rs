//! In-memory store and scripted signer session for controller tests.

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta};
use database::{
    attempts::NewAttempt,
    entities::{
        distribution_attempts, migration_events,
        sea_orm_active_enums::{DistributionStatus, MigrationStatus},
    },
    migration_events::ConfirmedCursor,
};
use eyre::eyre;
use providers::{SubmittedTransfer, TokenTransferProvider, evm::to_base_units};

use crate::{
    cancel::CancelHandle,
    controller::BatchSettings,
    state::is_distributable,
    store::{DistributionUpdate, MigrationStore},
};

pub const TOKEN: &str = "0x4200000000000000000000000000000000000006";
pub const CHAIN_ID: u64 = 8453;

pub fn wallet(id: i64) -> Address {
    Address::from_str(&format!("0x{:040x}", id)).unwrap()
}

/// Lower ids are newer, so `list_confirmed` returns them first.
pub fn event(id: i64, amount: &str, status: Option<DistributionStatus>) -> migration_events::Model {
    let created_at = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z").unwrap()
        - TimeDelta::minutes(id);
    migration_events::Model {
        id,
        acknowledgement_id: None,
        wallet_address: wallet(id).to_string(),
        token_type: "CIFI".to_string(),
        amount: amount.to_string(),
        old_contract_address: None,
        new_contract_address: None,
        transaction_hash: Some(format!("0x{:064x}", id)),
        block_number: Some(1_000 + id),
        status: MigrationStatus::Confirmed,
        distribution_status: status,
        distribution_tx_hash: None,
        distribution_sent_at: None,
        distribution_token_address: None,
        distribution_claimed_at: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn settings() -> BatchSettings {
    BatchSettings {
        page_size: 1000,
        inter_record_delay: Duration::ZERO,
        expected_chain_id: CHAIN_ID,
        check_balance: false,
    }
}

/// Pages confirmed records in the same `created_at DESC, id DESC` order as the database.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<migration_events::Model>>,
    attempts: Mutex<Vec<distribution_attempts::Model>>,
    stolen: Mutex<HashSet<i64>>,
    fail_sent: AtomicBool,
    fail_claims: AtomicBool,
    claims: AtomicUsize,
    updates: AtomicUsize,
    pages: AtomicUsize,
}

impl InMemoryStore {
    pub fn new(records: Vec<migration_events::Model>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn record(&self, id: i64) -> migration_events::Model {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap()
    }

    /// Makes the next claims on `id` lose, as if another run got there first.
    pub fn steal_claim(&self, id: i64) {
        self.stolen.lock().unwrap().insert(id);
    }

    pub fn fail_sent_writes(&self, fail: bool) {
        self.fail_sent.store(fail, Ordering::SeqCst);
    }

    pub fn fail_claim_writes(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    pub fn journal(&self, migration_id: i64, tx_hash: B256) {
        let mut attempts = self.attempts.lock().unwrap();
        let id = attempts.len() as i64 + 1;
        attempts.push(distribution_attempts::Model {
            id,
            migration_id,
            source_tx_hash: None,
            destination_tx_hash: tx_hash.to_string(),
            token_address: TOKEN.to_string(),
            amount_base_units: "5".to_string(),
            created_at: DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z").unwrap(),
        });
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of `list_confirmed` calls served.
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationStore for InMemoryStore {
    async fn list_confirmed(
        &self,
        limit: u64,
        after: Option<ConfirmedCursor>,
    ) -> eyre::Result<Vec<migration_events::Model>> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        let mut confirmed: Vec<migration_events::Model> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == MigrationStatus::Confirmed)
            .cloned()
            .collect();
        confirmed.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(confirmed
            .into_iter()
            .filter(|r| match after {
                Some(cursor) => (r.created_at, r.id) < (cursor.created_at, cursor.id),
                None => true,
            })
            .take(limit as usize)
            .collect())
    }

    async fn claim(&self, id: i64) -> eyre::Result<bool> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(eyre!("pool timed out"));
        }
        if self.stolen.lock().unwrap().contains(&id) {
            return Ok(false);
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if record.status != MigrationStatus::Confirmed
            || !is_distributable(record.distribution_status)
        {
            return Ok(false);
        }

        let now = DateTime::parse_from_rfc3339("2025-06-02T00:00:00Z").unwrap();
        record.distribution_status = Some(DistributionStatus::InFlight);
        record.distribution_claimed_at = Some(now);
        Ok(true)
    }

    async fn update_distribution(
        &self,
        id: i64,
        update: DistributionUpdate,
    ) -> eyre::Result<bool> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if matches!(update, DistributionUpdate::Sent(_)) && self.fail_sent.load(Ordering::SeqCst) {
            return Err(eyre!("connection reset by peer"));
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if record.distribution_status != Some(DistributionStatus::InFlight) {
            return Ok(false);
        }

        match update {
            DistributionUpdate::Sent(sent) => {
                record.distribution_status = Some(DistributionStatus::Sent);
                record.distribution_tx_hash = Some(sent.tx_hash);
                record.distribution_sent_at = Some(sent.sent_at);
                record.distribution_token_address = Some(sent.token_address);
            }
            DistributionUpdate::Failed => {
                record.distribution_status = Some(DistributionStatus::Failed);
            }
        }
        Ok(true)
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> eyre::Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        let id = attempts.len() as i64 + 1;
        attempts.push(distribution_attempts::Model {
            id,
            migration_id: attempt.migration_id,
            source_tx_hash: attempt.source_tx_hash,
            destination_tx_hash: attempt.destination_tx_hash,
            token_address: attempt.token_address,
            amount_base_units: attempt.amount_base_units,
            created_at: DateTime::parse_from_rfc3339("2025-06-02T00:00:00Z").unwrap(),
        });
        Ok(())
    }

    async fn attempts_for(
        &self,
        migration_id: i64,
    ) -> eyre::Result<Vec<distribution_attempts::Model>> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.migration_id == migration_id)
            .cloned()
            .collect())
    }
}

/// Signer session whose transfers succeed unless scripted otherwise.
pub struct FakeSession {
    chain_id: u64,
    decimals: u8,
    balance: U256,
    fail_submit: HashSet<Address>,
    fail_confirm: HashSet<Address>,
    cancel_after_first: Option<CancelHandle>,
    receipts: Mutex<HashMap<B256, bool>>,
    submitted: Mutex<HashMap<B256, Address>>,
    transfers: Mutex<Vec<(Address, String)>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            chain_id: CHAIN_ID,
            decimals: 18,
            balance: U256::MAX,
            fail_submit: HashSet::new(),
            fail_confirm: HashSet::new(),
            cancel_after_first: None,
            receipts: Mutex::new(HashMap::new()),
            submitted: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn on_chain(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_balance(mut self, balance: U256, decimals: u8) -> Self {
        self.balance = balance;
        self.decimals = decimals;
        self
    }

    pub fn fail_submit_for(mut self, id: i64) -> Self {
        self.fail_submit.insert(wallet(id));
        self
    }

    pub fn fail_confirm_for(mut self, id: i64) -> Self {
        self.fail_confirm.insert(wallet(id));
        self
    }

    pub fn with_receipt(self, tx_hash: B256, success: bool) -> Self {
        self.receipts.lock().unwrap().insert(tx_hash, success);
        self
    }

    pub fn cancel_after_first_transfer(mut self, handle: CancelHandle) -> Self {
        self.cancel_after_first = Some(handle);
        self
    }

    /// Submitted transfers as `(recipient, amount)`.
    pub fn transfers(&self) -> Vec<(Address, String)> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenTransferProvider for FakeSession {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> Address {
        Address::repeat_byte(0x11)
    }

    async fn token_decimals(&self, _token: Address) -> eyre::Result<u8> {
        Ok(self.decimals)
    }

    async fn token_balance(&self, _token: Address) -> eyre::Result<U256> {
        Ok(self.balance)
    }

    async fn submit_transfer(
        &self,
        _token: Address,
        recipient: Address,
        amount: &str,
    ) -> eyre::Result<SubmittedTransfer> {
        if self.fail_submit.contains(&recipient) {
            return Err(eyre!("insufficient funds for gas"));
        }
        let amount_base_units = to_base_units(amount, self.decimals)?;

        let mut transfers = self.transfers.lock().unwrap();
        transfers.push((recipient, amount.to_string()));
        let tx_hash = B256::with_last_byte(transfers.len() as u8);
        self.submitted.lock().unwrap().insert(tx_hash, recipient);

        Ok(SubmittedTransfer {
            tx_hash,
            amount_base_units,
        })
    }

    async fn wait_for_confirmation(&self, tx_hash: B256) -> eyre::Result<B256> {
        let recipient = self
            .submitted
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| eyre!("unknown transaction {}", tx_hash))?;

        if self.fail_confirm.contains(&recipient) {
            self.receipts.lock().unwrap().insert(tx_hash, false);
            return Err(eyre!("transaction {} reverted", tx_hash));
        }

        self.receipts.lock().unwrap().insert(tx_hash, true);
        if let Some(handle) = &self.cancel_after_first {
            handle.cancel();
        }
        Ok(tx_hash)
    }

    async fn receipt_status(&self, tx_hash: B256) -> eyre::Result<Option<bool>> {
        Ok(self.receipts.lock().unwrap().get(&tx_hash).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_submits_then_waits_for_confirmation() {
        let session = FakeSession::new().fail_confirm_for(2);
        let token = Address::from_str(TOKEN).unwrap();

        let tx_hash = session.transfer(token, wallet(1), "5").await.unwrap();
        assert_eq!(session.receipt_status(tx_hash).await.unwrap(), Some(true));

        assert!(session.transfer(token, wallet(2), "5").await.is_err());
        assert_eq!(session.transfers().len(), 2);
    }
}
