//! The reconciliation engine: snapshot/delta splicing and live book upkeep.
//!
//! One [`SyncEngine`] owns the symbol → book registry for a connection.
//! Deltas and snapshots are routed in by the feed driver (or any embedding
//! code); subscribers observe the results through per-symbol watch channels.
//!
//! # Synchronization protocol
//!
//! 1. `subscribe` registers the symbol; deltas arriving before a baseline
//!    exists are queued in the symbol's [`DeltaBuffer`].
//! 2. `apply_snapshot` discards queued deltas the snapshot already covers
//!    (`end_seq <= snapshot.seq`), verifies the first survivor overlaps the
//!    snapshot (`start_seq <= snapshot.seq + 1`), resets the book, and
//!    replays the survivors. A snapshot older than the whole queue cannot
//!    be aligned and is refetched.
//! 3. Once live, a delta must start at exactly `nonce + 1`. Anything else
//!    is a gap, handled per the configured [`GapPolicy`].
//!
//! # Thread Safety
//!
//! The engine is safe to share via `Arc<SyncEngine>`. Each book entry sits
//! behind its own `RwLock`; a delta is applied entirely under the entry's
//! write lock, so readers never observe a half-applied update.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::book::{BookUpdate, OrderBook};
use crate::config::{GapPolicy, SyncConfig};
use crate::error::Error;
use crate::sync::buffer::DeltaBuffer;
use crate::sync::signal::{BookHandle, BookSignal, FailureReason};
use crate::sync::state::SyncState;
use crate::types::messages::{Delta, Snapshot};
use crate::types::{SeqNum, Side};

/// What happened to a delta handed to [`SyncEngine::on_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// No subscription exists for the symbol
    Untracked,
    /// Queued; the book has no baseline yet
    Buffered,
    /// Applied to the live book and republished
    Applied,
    /// Discarded: already represented in the book, or the entry is stale
    Ignored,
    /// A gap restarted the cycle; the caller should re-subscribe
    Resync,
}

/// What happened to a snapshot handed to [`SyncEngine::apply_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Book reconciled and live
    Live {
        /// Number of buffered deltas replayed on top of the snapshot
        replayed: usize,
    },
    /// Snapshot predates the buffered stream; fetch a fresh one
    Retry {
        /// Alignment attempts so far
        attempts: u32,
    },
    /// A gap among the buffered deltas restarted the cycle
    Resync,
    /// Unknown symbol, or the book is already live; snapshot discarded
    Ignored,
}

/// Per-symbol registry entry
struct BookEntry {
    book: OrderBook,
    state: SyncState,
    buffer: DeltaBuffer,
    snapshot_attempts: u32,
    /// Bumped on every restart; lets watchdogs tell cycles apart
    cycle: u64,
    publisher: watch::Sender<BookSignal>,
}

impl BookEntry {
    fn new(symbol: &str, buffer_cap: usize, publisher: watch::Sender<BookSignal>) -> Self {
        Self {
            book: OrderBook::new(symbol),
            state: SyncState::Subscribing,
            buffer: DeltaBuffer::new(buffer_cap),
            snapshot_attempts: 0,
            cycle: 0,
            publisher,
        }
    }

    fn publish_update(&self, depth: Option<usize>) {
        self.publisher
            .send_replace(BookSignal::Update(self.book.limit(depth)));
    }

    /// Re-enter the subscribe cycle after a gap, keeping the channel open
    fn restart(&mut self) {
        self.book.clear();
        self.buffer.clear();
        self.snapshot_attempts = 0;
        self.cycle += 1;
        self.state = SyncState::Subscribing;
        self.publisher.send_replace(BookSignal::Waiting);
    }
}

/// Symbol → book registry with snapshot/delta reconciliation.
///
/// # Example
///
/// ```rust
/// use booksync::sync::SyncEngine;
/// use booksync::types::messages::{Delta, Snapshot};
/// use booksync::types::Level;
/// use booksync::SyncConfig;
/// use rust_decimal_macros::dec;
///
/// let engine = SyncEngine::new(SyncConfig::default());
/// let handle = engine.subscribe("BTC/USD");
///
/// // Deltas arriving before the snapshot are buffered...
/// engine.on_delta("BTC/USD", Delta {
///     start_seq: 48,
///     end_seq: 51,
///     bids: vec![Level::new(dec!(100), dec!(0))],
///     asks: vec![],
///     timestamp: None,
/// }).unwrap();
///
/// // ...and replayed once the snapshot lands.
/// engine.apply_snapshot("BTC/USD", Snapshot {
///     seq: 50,
///     bids: vec![Level::new(dec!(100), dec!(1))],
///     asks: vec![Level::new(dec!(101), dec!(2))],
///     timestamp: None,
/// }).unwrap();
///
/// let book = engine.book("BTC/USD", None).unwrap();
/// assert_eq!(book.nonce, 51);
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    books: RwLock<FxHashMap<String, RwLock<BookEntry>>>,
}

impl SyncEngine {
    /// Create an engine with the given configuration
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            books: RwLock::new(FxHashMap::default()),
        }
    }

    /// The engine's configuration
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Register a symbol and return a handle for its book stream.
    ///
    /// The new entry starts in `Subscribing`; the transport layer is
    /// expected to send the venue's subscribe message and route the ack via
    /// [`acknowledge`](Self::acknowledge). Subscribing to an
    /// already-registered symbol returns a second handle on the same
    /// stream.
    pub fn subscribe(&self, symbol: &str) -> BookHandle {
        let mut books = self.books.write();
        if let Some(entry) = books.get(symbol) {
            return BookHandle::new(symbol, entry.read().publisher.subscribe());
        }
        debug!(symbol, "registering order book subscription");
        let (tx, rx) = watch::channel(BookSignal::Waiting);
        books.insert(
            symbol.to_string(),
            RwLock::new(BookEntry::new(symbol, self.config.max_buffered(), tx)),
        );
        BookHandle::new(symbol, rx)
    }

    /// Record the venue's subscription ack for a symbol
    pub fn acknowledge(&self, symbol: &str) {
        let books = self.books.read();
        if let Some(entry) = books.get(symbol) {
            let mut e = entry.write();
            if e.state == SyncState::Subscribing {
                e.state = SyncState::Buffering;
            }
        }
    }

    /// Record that a REST snapshot fetch is in flight for a symbol
    pub fn mark_snapshot_requested(&self, symbol: &str) {
        let books = self.books.read();
        if let Some(entry) = books.get(symbol) {
            let mut e = entry.write();
            if e.state == SyncState::Subscribing || e.state == SyncState::Buffering {
                e.state = SyncState::SnapshotRequested;
            }
        }
    }

    /// Route an inbound delta to the symbol's book.
    ///
    /// Pre-live deltas are buffered. Live deltas must start at exactly
    /// `nonce + 1`; wholly stale deltas (`end_seq <= nonce`) are discarded
    /// as already represented.
    pub fn on_delta(&self, symbol: &str, delta: Delta) -> Result<DeltaOutcome, Error> {
        let mut remove = false;
        let result = {
            let books = self.books.read();
            let Some(entry) = books.get(symbol) else {
                return Ok(DeltaOutcome::Untracked);
            };
            let mut e = entry.write();
            match e.state {
                SyncState::Live => {
                    let nonce = e.book.nonce();
                    if delta.end_seq <= nonce {
                        Ok(DeltaOutcome::Ignored)
                    } else if delta.start_seq == nonce + 1 {
                        apply_levels(&mut e.book, &delta);
                        e.publish_update(self.config.publish_depth());
                        Ok(DeltaOutcome::Applied)
                    } else {
                        self.gap(symbol, &mut e, nonce + 1, delta.start_seq, &mut remove)
                    }
                }
                SyncState::Stale => Ok(DeltaOutcome::Ignored),
                _ => {
                    if e.state == SyncState::Subscribing {
                        e.state = SyncState::Buffering;
                    }
                    e.buffer.enqueue(delta);
                    Ok(DeltaOutcome::Buffered)
                }
            }
        };
        if remove {
            self.books.write().remove(symbol);
        }
        result
    }

    /// Reconcile a REST snapshot with the buffered delta stream.
    ///
    /// Late snapshots are harmless: if the symbol was unsubscribed or the
    /// book already went live through another fetch, the snapshot is
    /// discarded.
    pub fn apply_snapshot(
        &self,
        symbol: &str,
        snapshot: Snapshot,
    ) -> Result<SnapshotOutcome, Error> {
        let mut remove = false;
        let result = {
            let books = self.books.read();
            let Some(entry) = books.get(symbol) else {
                debug!(symbol, "discarding snapshot for unknown symbol");
                return Ok(SnapshotOutcome::Ignored);
            };
            let mut e = entry.write();
            if !e.state.is_pre_live() {
                return Ok(SnapshotOutcome::Ignored);
            }
            e.state = SyncState::Reconciling;

            // Queued deltas the snapshot already covers carry nothing new.
            while let Some(front) = e.buffer.front() {
                if front.end_seq <= snapshot.seq {
                    e.buffer.pop_front();
                } else {
                    break;
                }
            }

            let stream_start = e.buffer.front().map(|d| d.start_seq);
            match stream_start {
                Some(start) if start > snapshot.seq + 1 => {
                    // The snapshot predates the buffered stream and cannot
                    // be aligned with it.
                    e.snapshot_attempts += 1;
                    let attempts = e.snapshot_attempts;
                    if attempts >= self.config.snapshot_max_attempts() {
                        e.state = SyncState::Stale;
                        e.publisher.send_replace(BookSignal::Failed(
                            FailureReason::SnapshotOutOfSync { attempts },
                        ));
                        remove = true;
                        Err(Error::SnapshotOutOfSync { attempts })
                    } else {
                        warn!(
                            symbol,
                            snapshot_seq = snapshot.seq,
                            stream_start = start,
                            attempt = attempts,
                            "snapshot predates buffered deltas, refetching"
                        );
                        e.state = SyncState::SnapshotRequested;
                        Ok(SnapshotOutcome::Retry { attempts })
                    }
                }
                _ => {
                    e.book.reset(&snapshot);
                    self.replay(symbol, &mut e, &mut remove)
                }
            }
        };
        if remove {
            self.books.write().remove(symbol);
        }
        result
    }

    /// Replay the buffered deltas onto a freshly reset book
    fn replay(
        &self,
        symbol: &str,
        e: &mut BookEntry,
        remove: &mut bool,
    ) -> Result<SnapshotOutcome, Error> {
        let mut replayed = 0usize;
        let mut joining = true;
        let mut queued = e.buffer.drain();
        while let Some(delta) = queued.pop_front() {
            if delta.end_seq <= e.book.nonce() {
                continue;
            }
            let expected = e.book.nonce() + 1;
            // The first delta spliced onto the snapshot may overlap it;
            // every later one must be contiguous.
            let aligned = if joining {
                delta.start_seq <= expected
            } else {
                delta.start_seq == expected
            };
            if !aligned {
                return match self.gap(symbol, e, expected, delta.start_seq, remove) {
                    Ok(_) => Ok(SnapshotOutcome::Resync),
                    Err(err) => Err(err),
                };
            }
            apply_levels(&mut e.book, &delta);
            joining = false;
            replayed += 1;
        }
        e.state = SyncState::Live;
        e.snapshot_attempts = 0;
        e.publish_update(self.config.publish_depth());
        debug!(symbol, replayed, nonce = e.book.nonce(), "order book live");
        Ok(SnapshotOutcome::Live { replayed })
    }

    /// Handle a sequence gap per the configured policy
    fn gap(
        &self,
        symbol: &str,
        e: &mut BookEntry,
        expected: SeqNum,
        got: SeqNum,
        remove: &mut bool,
    ) -> Result<DeltaOutcome, Error> {
        match self.config.gap_policy() {
            GapPolicy::Resubscribe => {
                warn!(symbol, expected, got, "sequence gap, restarting subscription cycle");
                e.restart();
                Ok(DeltaOutcome::Resync)
            }
            GapPolicy::Error => {
                warn!(symbol, expected, got, "sequence gap, failing subscription");
                e.state = SyncState::Stale;
                e.publisher
                    .send_replace(BookSignal::Failed(FailureReason::SequenceGap {
                        expected,
                        got,
                    }));
                *remove = true;
                Err(Error::SequenceGap { expected, got })
            }
        }
    }

    /// Fail a symbol's stream and tear its entry down.
    ///
    /// Every waiting subscriber observes the failure; other symbols are
    /// unaffected.
    pub fn fail(&self, symbol: &str, reason: FailureReason) {
        let found = {
            let books = self.books.read();
            match books.get(symbol) {
                Some(entry) => {
                    let mut e = entry.write();
                    warn!(symbol, ?reason, "order book stream failed");
                    e.state = SyncState::Stale;
                    e.publisher.send_replace(BookSignal::Failed(reason));
                    true
                }
                None => false,
            }
        };
        if found {
            self.books.write().remove(symbol);
        }
    }

    /// Fail every registered symbol (connection-level teardown)
    pub fn fail_all(&self, reason: FailureReason) {
        let mut books = self.books.write();
        for (symbol, entry) in books.iter() {
            let mut e = entry.write();
            warn!(symbol = %symbol, ?reason, "order book stream failed");
            e.state = SyncState::Stale;
            e.publisher
                .send_replace(BookSignal::Failed(reason.clone()));
        }
        books.clear();
    }

    /// Drop a symbol's entry and pending buffer immediately
    pub fn unsubscribe(&self, symbol: &str) {
        let mut books = self.books.write();
        if books.remove(symbol).is_some() {
            debug!(symbol, "order book subscription dropped");
        }
    }

    /// Current lifecycle state for a symbol
    #[must_use]
    pub fn state(&self, symbol: &str) -> Option<SyncState> {
        self.books.read().get(symbol).map(|e| e.read().state)
    }

    /// Subscription cycle counter for a symbol.
    ///
    /// Starts at zero and increments each time a gap restarts the cycle.
    /// A watchdog that captured the counter at spawn time can tell whether
    /// the cycle it was guarding is still the current one.
    #[must_use]
    pub fn cycle(&self, symbol: &str) -> Option<u64> {
        self.books.read().get(symbol).map(|e| e.read().cycle)
    }

    /// Bounded view of a symbol's book, best levels first.
    ///
    /// Returns `None` until the book is live.
    #[must_use]
    pub fn book(&self, symbol: &str, depth: Option<usize>) -> Option<BookUpdate> {
        let books = self.books.read();
        let entry = books.get(symbol)?;
        let e = entry.read();
        if e.state.is_live() {
            Some(e.book.limit(depth))
        } else {
            None
        }
    }

    /// All registered symbols
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.books.read().keys().cloned().collect()
    }

    /// Number of registered symbols
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}

/// Apply one delta's levels and metadata to a book
fn apply_levels(book: &mut OrderBook, delta: &Delta) {
    for level in &delta.asks {
        book.store(Side::Ask, level.price, level.size);
    }
    for level in &delta.bids {
        book.store(Side::Bid, level.price, level.size);
    }
    book.set_nonce(delta.end_seq);
    book.set_timestamp(delta.timestamp);
}
