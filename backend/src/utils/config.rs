use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use crate::constants::*;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    pub confirmations: u64,
    pub poll_interval_secs: u64,
    pub batch_size: u64,
    pub registry_address: String,
    pub start_block: Option<u64>,
    pub state_file: PathBuf,
    pub ipfs_gateway_url: String,
    pub subgraph_url: Option<String>,
    pub explorer_tx_url: String,
    pub seen_horizon_blocks: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let telegram_token = var("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;
        let telegram_chat_id = var("TELEGRAM_CHAT_ID")
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_CHAT_ID must be set"))?;

        let confirmations = parse_number(var("CONFIRMATIONS"), "CONFIRMATIONS", DEFAULT_CONFIRMATIONS as i64)?.max(0) as u64;
        let poll_interval_secs = parse_number(var("POLL_INTERVAL"), "POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS as i64)?.max(1) as u64;
        let batch_size = parse_number(var("BATCH_SIZE"), "BATCH_SIZE", DEFAULT_BATCH_SIZE as i64)?.max(1) as u64;

        let start_block = match var("START_BLOCK") {
            Some(raw) => Some(parse_number(Some(raw), "START_BLOCK", 0)?.max(0) as u64),
            None => None,
        };

        let seen_horizon_blocks = match var("SEEN_HORIZON_BLOCKS") {
            Some(raw) => parse_number(Some(raw), "SEEN_HORIZON_BLOCKS", 0)?.max(1) as u64,
            None => confirmations
                .saturating_mul(SEEN_HORIZON_CONFIRMATION_MULTIPLIER)
                .max(MIN_SEEN_HORIZON_BLOCKS),
        };

        Ok(Self {
            rpc_url: var("GNOSIS_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            telegram_token,
            telegram_chat_id,
            telegram_api_url: var("TELEGRAM_API_URL").unwrap_or_else(|| TELEGRAM_API_URL.to_string()),
            confirmations,
            poll_interval_secs,
            batch_size,
            registry_address: var("REGISTRY_ADDRESS").unwrap_or_else(|| DEFAULT_REGISTRY_ADDRESS.to_string()),
            start_block,
            state_file: var("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            ipfs_gateway_url: var("IPFS_GATEWAY_URL").unwrap_or_else(|| DEFAULT_IPFS_GATEWAY_URL.to_string()),
            subgraph_url: var("SUBGRAPH_URL"),
            explorer_tx_url: var("EXPLORER_TX_URL").unwrap_or_else(|| DEFAULT_EXPLORER_TX_URL.to_string()),
            seen_horizon_blocks,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_number(raw: Option<String>, key: &str, default: i64) -> Result<i64> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be an integer, got '{}': {}", key, value, e)),
        None => Ok(default),
    }
}
