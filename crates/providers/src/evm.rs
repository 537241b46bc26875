use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{
        Address, B256, U256,
        utils::{ParseUnits, parse_units},
    },
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use async_trait::async_trait;
use common::config::{DestinationChainConfig, SignerConfig};
use eyre::eyre;
use tracing::{debug, info, instrument};

use crate::{SubmittedTransfer, TokenTransferProvider};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }
}

/// Converts a decimal string into integer base units for a token with `decimals`
/// precision. Rejects zero, negative values and amounts finer than the token supports.
pub fn to_base_units(amount: &str, decimals: u8) -> eyre::Result<U256> {
    let amount = amount.trim();
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(eyre!(
                "Amount {} has more than {} fractional digits",
                amount,
                decimals
            ));
        }
    }

    let parsed = parse_units(amount, decimals)
        .map_err(|e| eyre!("Invalid token amount {:?}: {}", amount, e))?;

    match parsed {
        ParseUnits::U256(units) if !units.is_zero() => Ok(units),
        ParseUnits::U256(_) => Err(eyre!("Amount {} is zero", amount)),
        ParseUnits::I256(_) => Err(eyre!("Amount {} is negative", amount)),
    }
}

/// The operator's signer session on the destination chain. Built once per batch and
/// shared by every transfer in the run.
#[derive(Clone)]
pub struct EvmSigner {
    provider: DynProvider,
    signer_address: Address,
    chain_id: u64,
    confirmation_timeout: Duration,
}

impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("signer_address", &self.signer_address)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl EvmSigner {
    pub async fn connect(
        config: &DestinationChainConfig,
        signer: &SignerConfig,
    ) -> eyre::Result<Self> {
        let wallet_signer: PrivateKeySigner = signer
            .private_key
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid operator private key: {}", e))?;
        let signer_address = wallet_signer.address();

        let parsed_http_url = config
            .http_rpc_url
            .parse()
            .map_err(|e| eyre!("Invalid HTTP URL: {}", e))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet_signer))
            .on_http(parsed_http_url)
            .erased();

        let chain_id = provider.get_chain_id().await?;
        info!(
            signer = %signer_address,
            chain_id,
            expected_chain_id = config.chain_id,
            "Destination signer session opened"
        );

        Ok(Self {
            provider,
            signer_address,
            chain_id,
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        })
    }
}

#[async_trait]
impl TokenTransferProvider for EvmSigner {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn token_decimals(&self, token: Address) -> eyre::Result<u8> {
        let decimals = IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await?
            ._0;
        Ok(decimals)
    }

    async fn token_balance(&self, token: Address) -> eyre::Result<U256> {
        let balance = IERC20::new(token, self.provider.clone())
            .balanceOf(self.signer_address)
            .call()
            .await?
            ._0;
        Ok(balance)
    }

    #[instrument(skip(self), fields(token = %token, recipient = %recipient))]
    async fn submit_transfer(
        &self,
        token: Address,
        recipient: Address,
        amount: &str,
    ) -> eyre::Result<SubmittedTransfer> {
        let decimals = self.token_decimals(token).await?;
        let amount_base_units = to_base_units(amount, decimals)?;

        let pending = IERC20::new(token, self.provider.clone())
            .transfer(recipient, amount_base_units)
            .send()
            .await?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, %amount_base_units, decimals, "Transfer submitted");

        Ok(SubmittedTransfer {
            tx_hash,
            amount_base_units,
        })
    }

    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn wait_for_confirmation(&self, tx_hash: B256) -> eyre::Result<B256> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(1)
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await
            .map_err(|e| eyre!("Transfer {} was not confirmed: {}", tx_hash, e))?;

        if !receipt.status() {
            return Err(eyre!("Transfer {} reverted", tx_hash));
        }

        Ok(receipt.transaction_hash)
    }

    async fn receipt_status(&self, tx_hash: B256) -> eyre::Result<Option<bool>> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;
        Ok(receipt.map(|r| r.status()))
    }
}
