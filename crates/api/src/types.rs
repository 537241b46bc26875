use common::config::ExplorerConfig;
use database::entities::{
    migration_events,
    sea_orm_active_enums::{DistributionStatus, MigrationStatus},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MigrationResponse {
    pub id: i64,
    pub wallet_address: String,
    pub token_type: String,
    pub amount: String,
    pub source_tx_hash: Option<String>,
    pub source_tx_url: Option<String>,
    pub source_block_number: Option<i64>,
    pub status: MigrationStatus,
    /// Records that were never attempted are reported as `pending`.
    pub distribution_status: DistributionStatus,
    pub distribution_tx_hash: Option<String>,
    pub distribution_tx_url: Option<String>,
    pub distribution_token_address: Option<String>,
    pub distribution_sent_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

fn explorer_link(base: Option<&str>, tx_hash: Option<&str>) -> Option<String> {
    let base = base?.trim_end_matches('/');
    let tx_hash = tx_hash?;
    Some(format!("{}/{}", base, tx_hash))
}

impl MigrationResponse {
    pub fn from_model(model: migration_events::Model, explorers: &ExplorerConfig) -> Self {
        let source_tx_url = explorer_link(
            explorers.source_tx_url.as_deref(),
            model.transaction_hash.as_deref(),
        );
        let distribution_tx_url = explorer_link(
            explorers.destination_tx_url.as_deref(),
            model.distribution_tx_hash.as_deref(),
        );

        Self {
            id: model.id,
            wallet_address: model.wallet_address,
            token_type: model.token_type,
            amount: model.amount,
            source_tx_hash: model.transaction_hash,
            source_tx_url,
            source_block_number: model.block_number,
            status: model.status,
            distribution_status: model
                .distribution_status
                .unwrap_or(DistributionStatus::Pending),
            distribution_tx_hash: model.distribution_tx_hash,
            distribution_tx_url,
            distribution_token_address: model.distribution_token_address,
            distribution_sent_at: model.distribution_sent_at,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn model() -> migration_events::Model {
        let created_at = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z").unwrap();
        migration_events::Model {
            id: 42,
            acknowledgement_id: Some("ack-1".into()),
            wallet_address: "0x00000000000000000000000000000000000000aa".into(),
            token_type: "CIFI".into(),
            amount: "100".into(),
            old_contract_address: None,
            new_contract_address: None,
            transaction_hash: Some("0xsource".into()),
            block_number: Some(7),
            status: MigrationStatus::Confirmed,
            distribution_status: None,
            distribution_tx_hash: None,
            distribution_sent_at: None,
            distribution_token_address: None,
            distribution_claimed_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn links_both_legs_when_explorers_are_configured() {
        let explorers = ExplorerConfig {
            source_tx_url: Some("https://explorer.xinfin.network/tx/".into()),
            destination_tx_url: Some("https://basescan.org/tx".into()),
        };
        let mut model = model();
        model.distribution_status = Some(DistributionStatus::Sent);
        model.distribution_tx_hash = Some("0xdest".into());

        let response = MigrationResponse::from_model(model, &explorers);

        assert_eq!(
            response.source_tx_url.as_deref(),
            Some("https://explorer.xinfin.network/tx/0xsource")
        );
        assert_eq!(
            response.distribution_tx_url.as_deref(),
            Some("https://basescan.org/tx/0xdest")
        );
        assert_eq!(response.distribution_status, DistributionStatus::Sent);
    }

    #[test]
    fn unattempted_distribution_reads_as_pending() {
        let response = MigrationResponse::from_model(model(), &ExplorerConfig::default());

        assert_eq!(response.distribution_status, DistributionStatus::Pending);
        assert!(response.source_tx_url.is_none());
        assert!(response.distribution_tx_url.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["distribution_status"], "pending");
        assert_eq!(json["status"], "confirmed");
    }
}
