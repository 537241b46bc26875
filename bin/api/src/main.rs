use common::config::{ApiConfig, LoadFromEnv};
use eyre::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cfg = ApiConfig::load()?;

    let db_conn = database::connect::connect(&cfg.database.url).await?;
    info!("Connected to migrations DB");

    api_lib::start_api(db_conn, cfg.port, cfg.explorers).await
}
