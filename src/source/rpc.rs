use std::ops::RangeInclusive;

use alloy::{
    network::{Ethereum, Network},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, warn};

use super::{LogFeed, LogSource, RawLogQuery, SourceError};

/// Capacity of the channels bridging an RPC subscription into a [`LogFeed`].
const FEED_CHANNEL_CAPACITY: usize = 256;

/// [`LogSource`] backed by an alloy provider.
///
/// Historical queries go through `eth_getLogs`; live feeds through
/// `eth_subscribe`, which requires a pubsub-capable transport (WebSocket or
/// IPC). Every failure is reported to the watcher as-is — this adapter does
/// not retry, fail over, or resubscribe.
#[derive(Clone, Debug)]
pub struct RpcLogSource<N: Network = Ethereum> {
    provider: RootProvider<N>,
}

impl<N: Network> RpcLogSource<N> {
    #[must_use]
    pub fn new(provider: RootProvider<N>) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &RootProvider<N> {
        &self.provider
    }
}

impl<N: Network> LogSource for RpcLogSource<N> {
    async fn latest_block(&self) -> Result<u64, SourceError> {
        self.provider.get_block_number().await.map_err(Into::into)
    }

    async fn query_logs(
        &self,
        query: &RawLogQuery,
        range: RangeInclusive<u64>,
    ) -> Result<Vec<Log>, SourceError> {
        let filter = to_filter(query).from_block(*range.start()).to_block(*range.end());
        self.provider.get_logs(&filter).await.map_err(Into::into)
    }

    async fn subscribe_logs(&self, query: &RawLogQuery) -> Result<LogFeed, SourceError> {
        let mut subscription = self.provider.subscribe_logs(&to_filter(query)).await?;
        let (logs_tx, logs_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(log) => {
                        if logs_tx.send(log).await.is_err() {
                            debug!("Feed dropped, releasing RPC log subscription");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // a lag gap means logs were missed; report it instead
                        // of resuming as if the feed were still complete
                        warn!(skipped, "RPC log subscription lagged");
                        _ = errors_tx.send(SourceError::Lagged(skipped)).await;
                        break;
                    }
                    Err(RecvError::Closed) => {
                        debug!("RPC log subscription closed");
                        break;
                    }
                }
            }
        });

        Ok(LogFeed { logs: logs_rx, errors: errors_rx })
    }
}

fn to_filter(query: &RawLogQuery) -> Filter {
    let mut filter = Filter::new();
    if let Some(address) = query.address {
        filter = filter.address(address);
    }
    let [selector, topic1, topic2, topic3] = query.topics.clone();
    if let Some(words) = selector {
        filter = filter.event_signature(words);
    }
    if let Some(words) = topic1 {
        filter = filter.topic1(words);
    }
    if let Some(words) = topic2 {
        filter = filter.topic2(words);
    }
    if let Some(words) = topic3 {
        filter = filter.topic3(words);
    }
    filter
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, address, b256};

    use super::*;

    #[test]
    fn conversion_keeps_address_and_topic_positions() {
        let selector =
            b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");
        let candidate =
            b256!("0x00000000000000000000000000000000000000000000000000000000000000bb");
        let contract = address!("0x00000000000000000000000000000000000000c0");

        let mut query = RawLogQuery { address: Some(contract), ..Default::default() };
        query.topics[0] = Some(vec![selector]);
        query.topics[2] = Some(vec![candidate]);

        let filter = to_filter(&query);

        assert!(filter.address.matches(&contract));
        assert!(filter.topics[0].matches(&selector));
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[2].matches(&candidate));
        assert!(!filter.topics[2].matches(&B256::ZERO));
    }
}
