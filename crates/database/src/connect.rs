use std::time::Duration;

use eyre::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the record store pool. The distributor works one record at a time, so the
/// pool stays small.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(MAX_CONNECTIONS)
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let conn = Database::connect(opt)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to migration database: {:?}", e))?;
    info!(max_connections = MAX_CONNECTIONS, "Connected to migration database");

    Ok(conn)
}
