use common::config::{DistributorConfig, LoadFromEnv};
use database::client::DbClient;
use distributor::{
    BatchController, BatchSettings, BatchSummary, CancelHandle, RecordOutcome, ReconcileSummary,
};
use eyre::{bail, eyre, Result};
use providers::evm::EvmSigner;
use tracing::{error, info, warn};

const USAGE: &str =
    "usage: distributor <send-all <token-address> | reconcile | release <migration-id> | stats>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    SendAll { token_address: String },
    Reconcile,
    Release { id: i64 },
    Stats,
}

impl Command {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            Some("send-all") => {
                let token_address = args
                    .next()
                    .ok_or_else(|| eyre!("send-all needs the destination token address\n{USAGE}"))?;
                Command::SendAll { token_address }
            }
            Some("reconcile") => Command::Reconcile,
            Some("release") => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("release needs a migration id\n{USAGE}"))?;
                let id = raw
                    .parse()
                    .map_err(|_| eyre!("{:?} is not a migration id", raw))?;
                Command::Release { id }
            }
            Some("stats") => Command::Stats,
            Some(other) => bail!("unknown command {:?}\n{USAGE}", other),
            None => bail!("{USAGE}"),
        };

        if let Some(extra) = args.next() {
            bail!("unexpected argument {:?}\n{USAGE}", extra);
        }
        Ok(command)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let command = Command::parse(std::env::args().skip(1))?;
    let cfg = DistributorConfig::load()?;

    let db_conn = database::connect::connect(&cfg.database.url).await?;
    info!("Connected to migrations DB");
    let db_client = DbClient::new(db_conn);

    match command {
        Command::Stats => {
            let stats = db_client.distribution_stats().await?;
            info!(
                total = stats.total,
                pending = stats.pending,
                in_flight = stats.in_flight,
                sent = stats.sent,
                failed = stats.failed,
                "Distribution stats"
            );
        }
        Command::SendAll { token_address } => {
            let controller = open_controller(db_client, &cfg).await?;
            let (handle, signal) = CancelHandle::pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current record");
                    handle.cancel();
                }
            });

            let summary = controller.run(Some(&token_address), &signal).await?;
            log_batch(&summary, cfg.explorers.destination_tx_url.as_deref());
        }
        Command::Reconcile => {
            let controller = open_controller(db_client, &cfg).await?;
            let summary = controller.reconcile().await?;
            log_reconcile(&summary);
        }
        Command::Release { id } => {
            let controller = open_controller(db_client, &cfg).await?;
            if controller.release(id).await? {
                info!(id, "Released in-flight distribution back to failed");
            } else {
                warn!(id, "Nothing released, the record is not in flight");
            }
        }
    }

    Ok(())
}

async fn open_controller(
    db_client: DbClient,
    cfg: &DistributorConfig,
) -> Result<BatchController<DbClient, EvmSigner>> {
    let signer = EvmSigner::connect(&cfg.destination, &cfg.signer).await?;
    Ok(BatchController::new(
        db_client,
        signer,
        BatchSettings::from(cfg),
    ))
}

fn log_batch(summary: &BatchSummary, explorer: Option<&str>) {
    for report in &summary.reports {
        match &report.outcome {
            RecordOutcome::Sent { tx_hash, recovered } => {
                let link = explorer
                    .map(|base| format!("{}/{}", base.trim_end_matches('/'), tx_hash))
                    .unwrap_or_default();
                info!(
                    id = report.id,
                    wallet = %report.wallet_address,
                    amount = %report.amount,
                    %tx_hash,
                    recovered,
                    link,
                    "Sent"
                );
            }
            RecordOutcome::Failed { reason } => {
                error!(id = report.id, wallet = %report.wallet_address, reason, "Failed");
            }
            RecordOutcome::Unresolved { tx_hash, reason } => {
                error!(
                    id = report.id,
                    %tx_hash,
                    reason,
                    "Sent on chain but not recorded, run reconcile"
                );
            }
            RecordOutcome::Skipped(reason) => {
                info!(id = report.id, ?reason, "Skipped");
            }
        }
    }

    if summary.is_noop() {
        info!(
            confirmed = summary.confirmed,
            already_sent = summary.already_sent,
            in_flight = summary.in_flight,
            "No pending distributions"
        );
        return;
    }

    info!(
        confirmed = summary.confirmed,
        pending = summary.pending,
        succeeded = summary.succeeded,
        failed = summary.failed,
        unresolved = summary.unresolved,
        skipped = summary.skipped,
        total_sent = %summary.total_sent_amount,
        cancelled = summary.cancelled,
        "Batch finished"
    );
}

fn log_reconcile(summary: &ReconcileSummary) {
    for (id, reason) in &summary.needs_review {
        warn!(id, reason, "Needs operator review");
    }
    info!(
        sent = summary.resolved_sent,
        failed = summary.resolved_failed,
        needs_review = summary.needs_review.len(),
        "Reconcile finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        Command::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse(&["send-all", "0x4200000000000000000000000000000000000006"]).unwrap(),
            Command::SendAll {
                token_address: "0x4200000000000000000000000000000000000006".into()
            }
        );
        assert_eq!(parse(&["reconcile"]).unwrap(), Command::Reconcile);
        assert_eq!(parse(&["release", "17"]).unwrap(), Command::Release { id: 17 });
        assert_eq!(parse(&["stats"]).unwrap(), Command::Stats);
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["send-all"]).is_err());
        assert!(parse(&["release", "abc"]).is_err());
        assert!(parse(&["stats", "extra"]).is_err());
        assert!(parse(&["airdrop"]).is_err());
    }
}
