use curate_watch::{
    app::{build_pipeline, registry_address, watcher_settings},
    constants::GNOSIS_CHAIN_ID,
    services::connect_http,
    store::CursorStore,
    utils::init_logging,
    watcher::{CorrelationEngine, DeliveryMode, Watcher},
    Config,
};
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("🎯 Starting Curate Registry Watcher...");

    let config = Config::from_env()?;
    let registry = registry_address(&config)?;
    let settings = watcher_settings(&config);

    let source = connect_http(&config.rpc_url, registry)?;
    let chain_id = source.chain_id().await?;
    if chain_id != GNOSIS_CHAIN_ID {
        warn!("⚠️ RPC reports chain id {}, links assume Gnosis Chain ({})", chain_id, GNOSIS_CHAIN_ID);
    }

    let store = CursorStore::new(config.state_file.clone());
    info!("📁 Using state file {}", store.path().display());
    let engine = CorrelationEngine::from_snapshot(store.load_correlations());
    let pipeline = build_pipeline(&config, registry, engine, DeliveryMode::Send);

    let mut watcher = Watcher::bootstrap(source, pipeline, store, settings).await?;

    info!(
        "Watching registry {} on chain {} | confirmations={} | batch size={} | poll every {}s | cursor={:?}",
        registry.to_checksum(None),
        chain_id,
        config.confirmations,
        config.batch_size,
        config.poll_interval_secs,
        watcher.cursor()
    );

    let shutdown = listen_for_shutdown_signal();
    watcher.run(shutdown).await?;

    info!("Watcher stopped");
    Ok(())
}

fn listen_for_shutdown_signal() -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    let cancellation_token_clone = cancellation_token.clone();

    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C signal: {err}");
            return;
        }
        info!("Received Ctrl-C signal");
        cancellation_token_clone.cancel();
    });

    cancellation_token
}
