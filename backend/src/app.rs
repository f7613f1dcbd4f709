use crate::services::{CurateSubgraph, IpfsGateway, TelegramClient};
use crate::watcher::correlation::CorrelationEngine;
use crate::watcher::market::MarketResolver;
use crate::watcher::notification::NotificationBuilder;
use crate::watcher::pipeline::{DeliveryMode, Pipeline};
use crate::watcher::runner::WatcherSettings;
use crate::Config;
use alloy::primitives::Address;
use anyhow::{Context, Result};

pub type LivePipeline = Pipeline<TelegramClient, IpfsGateway, CurateSubgraph>;

pub fn registry_address(config: &Config) -> Result<Address> {
    config
        .registry_address
        .trim()
        .parse()
        .with_context(|| format!("REGISTRY_ADDRESS '{}' is not a valid address", config.registry_address))
}

/// Wires the production collaborators into a pipeline.
pub fn build_pipeline(config: &Config, registry: Address, engine: CorrelationEngine, mode: DeliveryMode) -> LivePipeline {
    let markets = MarketResolver::new(
        IpfsGateway::new(config.ipfs_gateway_url.clone()),
        CurateSubgraph::new(config.subgraph_url.clone()),
    );

    Pipeline::new(
        engine,
        markets,
        NotificationBuilder::new(registry, config.explorer_tx_url.clone()),
        TelegramClient::new(config.telegram_api_url.clone(), config.telegram_token.clone()),
        registry,
        config.telegram_chat_id.clone(),
        mode,
    )
}

pub fn watcher_settings(config: &Config) -> WatcherSettings {
    WatcherSettings {
        confirmations: config.confirmations,
        poll_interval: config.poll_interval(),
        batch_size: config.batch_size,
        start_block: config.start_block,
        seen_horizon_blocks: config.seen_horizon_blocks,
    }
}
