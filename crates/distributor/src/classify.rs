use database::entities::{migration_events, sea_orm_active_enums::DistributionStatus};

/// Confirmed migrations partitioned by where their destination-chain leg stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Never attempted, pending, or failed. Failed records are retried on every run.
    pub pending: Vec<migration_events::Model>,
    /// Claimed by a run that has not recorded the result yet.
    pub in_flight: Vec<migration_events::Model>,
    pub sent: Vec<migration_events::Model>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.pending.len() + self.in_flight.len() + self.sent.len()
    }
}

pub fn classify(records: Vec<migration_events::Model>) -> Classification {
    let mut classification = Classification::default();

    for record in records {
        match record.distribution_status {
            None | Some(DistributionStatus::Pending) | Some(DistributionStatus::Failed) => {
                classification.pending.push(record)
            }
            Some(DistributionStatus::InFlight) => classification.in_flight.push(record),
            Some(DistributionStatus::Sent) => classification.sent.push(record),
        }
    }

    classification
}
