#![allow(dead_code)]

use std::time::Duration;

use alloy::{
    primitives::{Address, B256, LogData, U256, address},
    rpc::types::Log,
    sol,
    sol_types::SolEvent,
};
use event_watcher::{
    EventFilter, EventWatcher, EventWatcherBuilder, test_utils::MockLogSource,
};

sol! {
    #[derive(Debug)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

pub const TRANSFER_SIGNATURE: &str =
    "event Transfer(address indexed from, address indexed to, uint256 value)";

pub const CONTRACT: Address = address!("0x00000000000000000000000000000000000000c0");
pub const ALICE: Address = address!("0x0000000000000000000000000000000000000bbb");
pub const BOB: Address = address!("0x0000000000000000000000000000000000000ccc");

/// A mined log at the given position, with synthetic but complete provenance.
pub fn mined(block: u64, index: u64, payload: LogData) -> Log {
    Log {
        inner: alloy::primitives::Log { address: CONTRACT, data: payload },
        block_number: Some(block),
        transaction_hash: Some(B256::from(U256::from(block * 1_000 + index))),
        log_index: Some(index),
        ..Default::default()
    }
}

pub fn transfer(block: u64, index: u64, from: Address, to: Address, value: u64) -> Log {
    mined(block, index, Transfer { from, to, value: U256::from(value) }.encode_log_data())
}

/// A log carrying the Transfer selector and topics but a data section that
/// cannot hold the declared `uint256`.
pub fn corrupt_transfer(block: u64, index: u64, from: Address, to: Address) -> Log {
    let payload = Transfer { from, to, value: U256::from(1u64) }.encode_log_data();
    let topics = payload.topics().to_vec();
    mined(block, index, LogData::new_unchecked(topics, alloy::primitives::Bytes::from(vec![0u8; 3])))
}

pub fn transfer_filter() -> EventFilter {
    EventFilter::new().contract_address(CONTRACT).event(TRANSFER_SIGNATURE)
}

pub async fn connect(source: MockLogSource) -> EventWatcher<MockLogSource> {
    EventWatcherBuilder::new().connect(source).await.expect("watcher should connect")
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition was not reached in time");
}
