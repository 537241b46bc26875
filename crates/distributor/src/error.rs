use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::state::InvalidTransition;

/// Conditions that refuse or abort a whole batch. Per-record failures never surface
/// here; they are written to the record and reported in the summary.
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("destination token address is required")]
    MissingTokenAddress,

    #[error("invalid destination token address {0:?}")]
    InvalidTokenAddress(String),

    #[error("signer session is on chain {actual}, expected chain {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("signer balance {available} is below the pending total {required}")]
    InsufficientBalance {
        required: BigDecimal,
        available: BigDecimal,
    },

    #[error("record store error: {0}")]
    Store(eyre::Report),

    #[error("destination chain error: {0}")]
    Chain(eyre::Report),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}
