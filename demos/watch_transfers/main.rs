use alloy::{
    primitives::address,
    providers::{Provider, ProviderBuilder},
};
use event_watcher::{EventFilter, EventWatcherBuilder, source::RpcLogSource};
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Follows ERC-20 Transfer events live until interrupted.
///
/// Needs a pubsub-capable endpoint: `ETH_WS_URL=wss://... cargo run --example watch_transfers`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let endpoint =
        std::env::var("ETH_WS_URL").unwrap_or_else(|_| "ws://localhost:8545".to_owned());
    let provider = ProviderBuilder::new().connect(&endpoint).await?;

    let watcher =
        EventWatcherBuilder::new().connect(RpcLogSource::new(provider.root().clone())).await?;

    // USDC on mainnet
    let filter = EventFilter::new()
        .contract_address(address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"))
        .event("event Transfer(address indexed from, address indexed to, uint256 value)");

    let (session, mut stream) = watcher.subscribe_stream(&filter)?;

    loop {
        tokio::select! {
            maybe_record = stream.next() => match maybe_record {
                Some(record) => info!(
                    block = record.block_number(),
                    from = ?record.field("from"),
                    value = ?record.field("value"),
                    removed = record.removed(),
                    "Transfer"
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling session");
                session.cancel();
                break;
            }
        }
    }

    if let Some(e) = session.terminal_error() {
        error!(error = %e, "Session ended with an error");
    }

    Ok(())
}
