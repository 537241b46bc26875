pub mod cancel;
pub mod classify;
pub mod controller;
pub mod error;
pub mod reconcile;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use cancel::{CancelHandle, CancelSignal};
pub use classify::{Classification, classify};
pub use controller::{BatchController, BatchSettings, BatchSummary, RecordOutcome, RecordReport};
pub use error::DistributionError;
pub use reconcile::{ReconcileOutcome, ReconcileSummary};
pub use store::{DistributionUpdate, MigrationStore};
