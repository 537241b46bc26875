use config::{Config, File};
use dotenv::dotenv;
use eyre::{eyre, Result};
use serde::{de::DeserializeOwned, Deserialize};

pub const DEFAULT_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_INTER_RECORD_DELAY_MS: u64 = 1000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

fn config_from_env() -> Result<AppConfig> {
    dotenv().ok();

    let settings = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(
            config::Environment::default()
                .separator("__")
                .list_separator(","),
        )
        .build()?;

    settings.try_deserialize().map_err(eyre::Error::from)
}

pub trait LoadFromEnv: Sized + DeserializeOwned {
    fn load() -> Result<Self>;
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub api: Option<ApiConfig>,
    pub distributor: Option<DistributorConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiConfig {
    pub database: DatabaseConfig,
    pub port: u16,
    #[serde(default)]
    pub explorers: ExplorerConfig,
}

/// Block explorers used to build audit links for both legs of a migration.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExplorerConfig {
    pub source_tx_url: Option<String>,
    pub destination_tx_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DestinationChainConfig {
    pub http_rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct SignerConfig {
    pub private_key: String,
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DistributionSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_inter_record_delay_ms")]
    pub inter_record_delay_ms: u64,
    #[serde(default)]
    pub check_balance: bool,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            inter_record_delay_ms: DEFAULT_INTER_RECORD_DELAY_MS,
            check_balance: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DistributorConfig {
    pub database: DatabaseConfig,
    pub destination: DestinationChainConfig,
    pub signer: SignerConfig,
    #[serde(default)]
    pub settings: DistributionSettings,
    #[serde(default)]
    pub explorers: ExplorerConfig,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_inter_record_delay_ms() -> u64 {
    DEFAULT_INTER_RECORD_DELAY_MS
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

impl LoadFromEnv for ApiConfig {
    fn load() -> Result<Self> {
        config_from_env()?
            .api
            .ok_or_else(|| eyre!("Configuration for the 'api' service is missing."))
    }
}

impl LoadFromEnv for DistributorConfig {
    fn load() -> Result<Self> {
        config_from_env()?
            .distributor
            .ok_or_else(|| eyre!("Configuration for the 'distributor' service is missing."))
    }
}
