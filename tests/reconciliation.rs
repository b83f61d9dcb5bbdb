//! End-to-end reconciliation scenarios driven through the public API.
//!
//! These tests feed snapshots and deltas straight into the engine, the way
//! the feed driver does, and observe the results through subscriber
//! handles. No network involved.

use booksync::sync::{DeltaOutcome, SnapshotOutcome, SyncEngine, SyncState};
use booksync::types::messages::{Delta, Snapshot};
use booksync::types::Level;
use booksync::{Error, GapPolicy, SyncConfig};
use rust_decimal_macros::dec;

fn delta(start: u64, end: u64, bids: Vec<Level>, asks: Vec<Level>) -> Delta {
    Delta {
        start_seq: start,
        end_seq: end,
        bids,
        asks,
        timestamp: None,
    }
}

#[tokio::test]
async fn buffered_delta_is_spliced_onto_snapshot() {
    let engine = SyncEngine::new(SyncConfig::default());
    let mut handle = engine.subscribe("BTC/USD");
    engine.acknowledge("BTC/USD");

    // The delta arrives before the snapshot and removes the snapshot's
    // only bid level.
    engine
        .on_delta(
            "BTC/USD",
            delta(48, 51, vec![Level::new(dec!(100), dec!(0))], vec![]),
        )
        .unwrap();

    let outcome = engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 50,
                bids: vec![Level::new(dec!(100), dec!(1))],
                asks: vec![Level::new(dec!(101), dec!(2))],
                timestamp: Some(1_700_000_000_000),
            },
        )
        .unwrap();
    assert_eq!(outcome, SnapshotOutcome::Live { replayed: 1 });

    let book = handle.recv().await.unwrap();
    assert!(book.bids.is_empty());
    assert_eq!(book.asks, vec![Level::new(dec!(101), dec!(2))]);
    assert_eq!(book.nonce, 51);
}

#[tokio::test]
async fn gap_detection_across_the_join_window() {
    let engine = SyncEngine::new(SyncConfig::default().with_gap_policy(GapPolicy::Error));
    let _handle = engine.subscribe("BTC/USD");
    engine.acknowledge("BTC/USD");

    for (start, end) in [(95, 99), (98, 105), (106, 110)] {
        engine
            .on_delta(
                "BTC/USD",
                delta(start, end, vec![Level::new(dec!(99), dec!(1))], vec![]),
            )
            .unwrap();
    }

    // (95,99) is discarded, (98,105) joins, (106,110) is contiguous.
    let outcome = engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 100,
                bids: vec![Level::new(dec!(100), dec!(1))],
                asks: vec![Level::new(dec!(101), dec!(1))],
                timestamp: None,
            },
        )
        .unwrap();
    assert_eq!(outcome, SnapshotOutcome::Live { replayed: 2 });
    assert_eq!(engine.book("BTC/USD", None).unwrap().nonce, 110);

    // Live now; the next delta must start at 111.
    let err = engine
        .on_delta("BTC/USD", delta(108, 112, vec![], vec![]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SequenceGap {
            expected: 111,
            got: 108
        }
    ));
}

#[tokio::test]
async fn gap_surfaces_to_waiting_subscriber() {
    let engine = SyncEngine::new(SyncConfig::default().with_gap_policy(GapPolicy::Error));
    let mut handle = engine.subscribe("BTC/USD");

    engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 10,
                bids: vec![],
                asks: vec![],
                timestamp: None,
            },
        )
        .unwrap();
    // Consume the initial live view.
    assert_eq!(handle.recv().await.unwrap().nonce, 10);

    let _ = engine.on_delta("BTC/USD", delta(15, 16, vec![], vec![]));

    assert!(matches!(
        handle.recv().await,
        Err(Error::SequenceGap { .. })
    ));
}

#[tokio::test]
async fn resubscribe_policy_recovers_through_the_same_handle() {
    let engine = SyncEngine::new(SyncConfig::default());
    let mut handle = engine.subscribe("BTC/USD");

    engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 10,
                bids: vec![Level::new(dec!(100), dec!(1))],
                asks: vec![],
                timestamp: None,
            },
        )
        .unwrap();
    assert_eq!(handle.recv().await.unwrap().nonce, 10);

    // Gap restarts the cycle instead of failing it.
    let outcome = engine
        .on_delta("BTC/USD", delta(20, 21, vec![], vec![]))
        .unwrap();
    assert_eq!(outcome, DeltaOutcome::Resync);
    assert_eq!(engine.state("BTC/USD"), Some(SyncState::Subscribing));

    // The driver re-subscribes and a fresh snapshot lands; the original
    // handle picks the stream back up.
    engine.acknowledge("BTC/USD");
    engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 30,
                bids: vec![Level::new(dec!(101), dec!(2))],
                asks: vec![],
                timestamp: None,
            },
        )
        .unwrap();

    let book = handle.recv().await.unwrap();
    assert_eq!(book.nonce, 30);
    assert_eq!(book.bids, vec![Level::new(dec!(101), dec!(2))]);
}

#[tokio::test]
async fn live_stream_applies_and_republishes_each_delta() {
    let engine = SyncEngine::new(SyncConfig::default());
    let mut handle = engine.subscribe("BTC/USD");

    engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 1,
                bids: vec![Level::new(dec!(100), dec!(1))],
                asks: vec![Level::new(dec!(101), dec!(1))],
                timestamp: None,
            },
        )
        .unwrap();
    assert_eq!(handle.recv().await.unwrap().nonce, 1);

    engine
        .on_delta(
            "BTC/USD",
            Delta {
                start_seq: 2,
                end_seq: 2,
                bids: vec![Level::new(dec!(100.5), dec!(3))],
                asks: vec![],
                timestamp: Some(1_700_000_000_500),
            },
        )
        .unwrap();

    let book = handle.recv().await.unwrap();
    assert_eq!(book.nonce, 2);
    assert_eq!(book.timestamp, Some(1_700_000_000_500));
    assert_eq!(book.bids[0], Level::new(dec!(100.5), dec!(3)));

    engine
        .on_delta(
            "BTC/USD",
            delta(3, 3, vec![Level::new(dec!(100.5), dec!(0))], vec![]),
        )
        .unwrap();

    let book = handle.recv().await.unwrap();
    assert_eq!(book.nonce, 3);
    assert_eq!(book.bids[0], Level::new(dec!(100), dec!(1)));
}

#[tokio::test]
async fn failures_are_isolated_per_symbol() {
    let engine = SyncEngine::new(SyncConfig::default().with_gap_policy(GapPolicy::Error));
    let mut btc = engine.subscribe("BTC/USD");
    let mut eth = engine.subscribe("ETH/USD");

    for symbol in ["BTC/USD", "ETH/USD"] {
        engine
            .apply_snapshot(
                symbol,
                Snapshot {
                    seq: 5,
                    bids: vec![Level::new(dec!(10), dec!(1))],
                    asks: vec![],
                    timestamp: None,
                },
            )
            .unwrap();
    }
    btc.recv().await.unwrap();
    eth.recv().await.unwrap();

    // BTC gaps; ETH keeps streaming.
    let _ = engine.on_delta("BTC/USD", delta(9, 10, vec![], vec![]));
    assert!(matches!(btc.recv().await, Err(Error::SequenceGap { .. })));

    engine
        .on_delta("ETH/USD", delta(6, 6, vec![Level::new(dec!(11), dec!(2))], vec![]))
        .unwrap();
    assert_eq!(eth.recv().await.unwrap().nonce, 6);
}

#[tokio::test]
async fn unsubscribe_terminates_the_stream() {
    let engine = SyncEngine::new(SyncConfig::default());
    let mut handle = engine.subscribe("BTC/USD");

    engine.unsubscribe("BTC/USD");

    // The publisher is gone; recv reports it instead of hanging.
    assert!(matches!(
        handle.recv().await,
        Err(Error::ConnectionClosed)
    ));
}

#[tokio::test]
async fn snapshot_alone_goes_live_with_empty_buffer() {
    let engine = SyncEngine::new(SyncConfig::default());
    let mut handle = engine.subscribe("BTC/USD");

    let outcome = engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 7,
                bids: vec![Level::new(dec!(100), dec!(1))],
                asks: vec![Level::new(dec!(101), dec!(2))],
                timestamp: None,
            },
        )
        .unwrap();
    assert_eq!(outcome, SnapshotOutcome::Live { replayed: 0 });

    let book = handle.recv().await.unwrap();
    assert_eq!(book.nonce, 7);
    assert_eq!(book.bids.len(), 1);
    assert_eq!(book.asks.len(), 1);
}

#[tokio::test]
async fn sort_invariant_holds_through_a_noisy_stream() {
    let engine = SyncEngine::new(SyncConfig::default());
    let _handle = engine.subscribe("BTC/USD");

    engine
        .apply_snapshot(
            "BTC/USD",
            Snapshot {
                seq: 0,
                bids: vec![
                    Level::new(dec!(100), dec!(1)),
                    Level::new(dec!(99), dec!(2)),
                ],
                asks: vec![
                    Level::new(dec!(101), dec!(1)),
                    Level::new(dec!(102), dec!(2)),
                ],
                timestamp: None,
            },
        )
        .unwrap();

    // Interleave inserts, updates, and removals.
    let updates = [
        (1u64, dec!(99.5), dec!(4), true),
        (2, dec!(100), dec!(0), true),
        (3, dec!(101.5), dec!(1), false),
        (4, dec!(101), dec!(0), false),
        (5, dec!(98), dec!(9), true),
    ];
    for (seq, price, size, is_bid) in updates {
        let (bids, asks) = if is_bid {
            (vec![Level::new(price, size)], vec![])
        } else {
            (vec![], vec![Level::new(price, size)])
        };
        engine.on_delta("BTC/USD", delta(seq, seq, bids, asks)).unwrap();
    }

    let book = engine.book("BTC/USD", None).unwrap();
    let bid_prices: Vec<_> = book.bids.iter().map(|l| l.price).collect();
    let ask_prices: Vec<_> = book.asks.iter().map(|l| l.price).collect();
    assert_eq!(bid_prices, vec![dec!(99.5), dec!(99), dec!(98)]);
    assert_eq!(ask_prices, vec![dec!(101.5), dec!(102)]);
    assert!(book.bids.iter().all(|l| !l.size.is_zero()));
    assert!(book.asks.iter().all(|l| !l.size.is_zero()));
}
