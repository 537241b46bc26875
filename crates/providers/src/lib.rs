use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

pub mod evm;

/// A transfer that the node accepted but that may not be mined yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub tx_hash: B256,
    pub amount_base_units: U256,
}

/// Destination-chain token operations performed with one operator signer.
///
/// Implementations never retry; every RPC error, revert and timeout is returned to the
/// caller.
#[async_trait]
pub trait TokenTransferProvider: Send + Sync {
    /// Chain id reported by the connected node.
    fn chain_id(&self) -> u64;

    fn signer_address(&self) -> Address;

    async fn token_decimals(&self, token: Address) -> eyre::Result<u8>;

    /// Token balance held by the signer.
    async fn token_balance(&self, token: Address) -> eyre::Result<U256>;

    /// Converts `amount` using the token's decimals and submits `transfer(recipient, amount)`.
    async fn submit_transfer(
        &self,
        token: Address,
        recipient: Address,
        amount: &str,
    ) -> eyre::Result<SubmittedTransfer>;

    /// Waits for one confirmation. Reverted receipts and timeouts are errors.
    async fn wait_for_confirmation(&self, tx_hash: B256) -> eyre::Result<B256>;

    /// `Some(true)` for a successful receipt, `Some(false)` for a revert, `None` when the
    /// node has no receipt for the hash.
    async fn receipt_status(&self, tx_hash: B256) -> eyre::Result<Option<bool>>;

    /// Submits and waits for confirmation in one call.
    async fn transfer(
        &self,
        token: Address,
        recipient: Address,
        amount: &str,
    ) -> eyre::Result<B256> {
        let submitted = self.submit_transfer(token, recipient, amount).await?;
        self.wait_for_confirmation(submitted.tx_hash).await
    }
}
