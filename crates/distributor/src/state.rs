use database::entities::sea_orm_active_enums::DistributionStatus;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal distribution transition {} -> {to}", status_label(.from))]
pub struct InvalidTransition {
    pub from: Option<DistributionStatus>,
    pub to: DistributionStatus,
}

fn status_label(status: &Option<DistributionStatus>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

/// Validates a move of the destination-chain leg.
///
/// The only legal moves are a claim (`none`, `pending` or `failed` into `in_flight`)
/// and the resolution of a claim (`in_flight` into `sent` or `failed`). `sent` is
/// terminal.
pub fn transition(
    from: Option<DistributionStatus>,
    to: DistributionStatus,
) -> Result<DistributionStatus, InvalidTransition> {
    use DistributionStatus::*;

    match (from, to) {
        (None | Some(Pending) | Some(Failed), InFlight) => Ok(InFlight),
        (Some(InFlight), Sent | Failed) => Ok(to),
        _ => Err(InvalidTransition { from, to }),
    }
}

/// Whether a record may be picked up by a batch run.
pub fn is_distributable(status: Option<DistributionStatus>) -> bool {
    transition(status, DistributionStatus::InFlight).is_ok()
}
