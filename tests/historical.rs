mod common;

use alloy::dyn_abi::DynSolValue;
use event_watcher::{
    BlockRange, EventFilter, EventWatcherBuilder, WatcherError, test_utils::MockLogSource,
};

use crate::common::{
    ALICE, BOB, CONTRACT, connect, corrupt_transfer, transfer, transfer_filter,
};

#[tokio::test]
async fn drains_matching_logs_and_exhausts() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_logs([
        transfer(1, 0, ALICE, BOB, 1),
        transfer(2, 0, ALICE, BOB, 2),
        transfer(3, 0, BOB, ALICE, 3),
    ]);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;

    let mut count = 0;
    while let Some(record) = cursor.advance().await? {
        count += 1;
        assert_eq!(record.event(), Some("Transfer"));
        assert_eq!(record.address(), CONTRACT);
        assert!(!record.removed());
    }
    assert_eq!(count, 3);
    assert!(cursor.is_closed());

    // exhaustion is stable
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn delivery_order_is_block_then_log_index() -> anyhow::Result<()> {
    // inserted shuffled on purpose
    let source = MockLogSource::new().with_latest(20).with_logs([
        transfer(9, 1, ALICE, BOB, 4),
        transfer(2, 0, ALICE, BOB, 1),
        transfer(9, 0, ALICE, BOB, 3),
        transfer(4, 2, ALICE, BOB, 2),
    ]);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;

    let mut previous = (0, 0);
    while let Some(record) = cursor.advance().await? {
        assert!(record.ordering_key() >= previous, "records must not go backwards");
        previous = record.ordering_key();
    }
    assert_eq!(previous, (9, 1));

    Ok(())
}

#[tokio::test]
async fn indexed_constraint_selects_only_matching_senders() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_logs([
        transfer(1, 0, ALICE, BOB, 10),
        transfer(2, 0, BOB, ALICE, 20),
        transfer(3, 0, ALICE, BOB, 30),
    ]);
    let watcher = connect(source).await;

    let filter = transfer_filter().indexed("from", [DynSolValue::Address(ALICE)]);
    let mut cursor = watcher.open(&filter, BlockRange::all()).await?;

    let mut records = Vec::new();
    while let Some(record) = cursor.advance().await? {
        records.push(record);
    }

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.field("from"), Some(&DynSolValue::Address(ALICE)));
    }

    Ok(())
}

#[tokio::test]
async fn decode_failure_halts_the_cursor() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_logs([
        transfer(1, 0, ALICE, BOB, 1),
        corrupt_transfer(2, 0, ALICE, BOB),
        transfer(3, 0, ALICE, BOB, 3),
    ]);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;

    let first = cursor.advance().await?.expect("first log decodes");
    assert_eq!(first.ordering_key(), (1, 0));

    // the malformed entry is fail-stop, not skip-and-continue
    assert!(matches!(cursor.advance().await, Err(WatcherError::Decode(_))));
    assert!(cursor.is_closed());

    // the good log behind the bad entry is never delivered
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn close_is_idempotent() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_log(transfer(1, 0, ALICE, BOB, 1));
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;
    cursor.close();
    cursor.close();

    assert!(cursor.is_closed());
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn open_fails_when_source_is_unreachable() {
    let source = MockLogSource::new().with_connect_failure();
    let result = EventWatcherBuilder::new().connect(source).await;

    assert!(matches!(result, Err(WatcherError::Connection(_))));
}

#[tokio::test]
async fn query_failure_closes_the_cursor() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_query_failure();
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;

    assert!(matches!(cursor.advance().await, Err(WatcherError::Connection(_))));
    assert!(cursor.is_closed());
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn range_beyond_latest_is_rejected() {
    let source = MockLogSource::new().with_latest(10);
    let watcher = connect(source).await;

    let result = watcher.open(&transfer_filter(), 0..=20).await;

    match result {
        Err(WatcherError::BlockExceedsLatest("to_block", requested, latest)) => {
            assert_eq!(requested, 20);
            assert_eq!(latest, 10);
        }
        other => panic!("Expected BlockExceedsLatest for 'to_block', got {other:?}"),
    }
}

#[tokio::test]
async fn reversed_range_is_normalised() -> anyhow::Result<()> {
    let source = MockLogSource::new().with_latest(10).with_logs([
        transfer(2, 0, ALICE, BOB, 1),
        transfer(5, 0, ALICE, BOB, 2),
    ]);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::new(8, 1)).await?;

    let first = cursor.advance().await?.expect("scan ascends despite reversed bounds");
    assert_eq!(first.block_number(), 2);
    let second = cursor.advance().await?.expect("second log");
    assert_eq!(second.block_number(), 5);
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn small_chunks_cover_the_whole_range() -> anyhow::Result<()> {
    let logs: Vec<_> = (1..=5).map(|block| transfer(block, 0, ALICE, BOB, block)).collect();
    let source = MockLogSource::new().with_latest(10).with_logs(logs);
    let watcher =
        EventWatcherBuilder::new().max_block_range(2).connect(source).await?;

    let mut cursor = watcher.open(&transfer_filter(), 0..=10).await?;

    let mut blocks = Vec::new();
    while let Some(record) = cursor.advance().await? {
        blocks.push(record.block_number());
    }
    assert_eq!(blocks, [1, 2, 3, 4, 5]);

    Ok(())
}

#[tokio::test]
async fn unconstrained_filter_yields_raw_records() -> anyhow::Result<()> {
    let log = transfer(4, 1, ALICE, BOB, 7);
    let payload = log.inner.data.clone();
    let source = MockLogSource::new().with_latest(10).with_log(log);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&EventFilter::new(), BlockRange::all()).await?;

    let record = cursor.advance().await?.expect("log is delivered undecoded");
    assert_eq!(record.event(), None);
    assert!(record.fields().is_empty());
    assert_eq!(record.raw(), &payload);
    assert_eq!(record.ordering_key(), (4, 1));
    assert!(cursor.advance().await?.is_none());

    Ok(())
}

#[tokio::test]
async fn removed_flag_is_surfaced_not_hidden() -> anyhow::Result<()> {
    let mut retracted = transfer(3, 0, ALICE, BOB, 9);
    retracted.removed = true;
    let source = MockLogSource::new()
        .with_latest(10)
        .with_logs([transfer(2, 0, ALICE, BOB, 8), retracted]);
    let watcher = connect(source).await;

    let mut cursor = watcher.open(&transfer_filter(), BlockRange::all()).await?;

    let kept = cursor.advance().await?.expect("live record");
    assert!(!kept.removed());
    let gone = cursor.advance().await?.expect("retracted record is still delivered");
    assert!(gone.removed());

    Ok(())
}
