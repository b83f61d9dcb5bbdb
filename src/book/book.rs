//! Core order book data structure.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(1) access to best bid/ask (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries

use std::collections::BTreeMap;

use crate::types::messages::Snapshot;
use crate::types::{Level, Price, SeqNum, Side, Size, TimestampMs};

/// In-memory L2 order book for a single symbol.
///
/// # Design Decisions
///
/// 1. **Decimal prices**: Prices and sizes are `rust_decimal::Decimal`,
///    giving exact comparisons and a total order for the map keys. Venue
///    tick sizes vary too widely for a fixed integer representation.
///
/// 2. **BTreeMap per side**: Sorted price levels with O(log n) operations.
///    Best bid is `last_key_value()` on the bid map, best ask is
///    `first_key_value()` on the ask map.
///
/// 3. **Nonce tracking**: The `nonce` field records the last applied server
///    sequence. The sync engine uses it to detect gaps in the delta stream.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The sync
/// engine wraps it in `parking_lot::RwLock`.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Symbol this book belongs to
    symbol: String,

    /// Bid levels: price -> size, best bid = highest = last
    bids: BTreeMap<Price, Size>,

    /// Ask levels: price -> size, best ask = lowest = first
    asks: BTreeMap<Price, Size>,

    /// Last applied server sequence number
    nonce: SeqNum,

    /// Server time of the last snapshot or delta that carried one
    timestamp: Option<TimestampMs>,
}

/// Bounded, read-oriented view of a book, nearest-to-touch first.
///
/// This is what subscribers receive on every applied update. It is detached
/// from the live book; mutating it has no effect on the engine's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookUpdate {
    /// Symbol the view belongs to
    pub symbol: String,
    /// Bid levels, descending by price
    pub bids: Vec<Level>,
    /// Ask levels, ascending by price
    pub asks: Vec<Level>,
    /// Sequence the view is current as of
    pub nonce: SeqNum,
    /// Server time of the last update that carried one
    pub timestamp: Option<TimestampMs>,
}

impl OrderBook {
    /// Create a new empty order book for the given symbol
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            nonce: 0,
            timestamp: None,
        }
    }

    /// Get the symbol
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the last applied sequence number
    #[must_use]
    pub const fn nonce(&self) -> SeqNum {
        self.nonce
    }

    /// Get the server time of the last update that carried one
    #[must_use]
    pub const fn timestamp(&self) -> Option<TimestampMs> {
        self.timestamp
    }

    /// Upsert a price level.
    ///
    /// A size of zero (or below) removes the level; anything else replaces
    /// the resting size at that price. Sizes are absolute, not deltas.
    pub fn store(&mut self, side: Side, price: Price, size: Size) {
        let book = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        if size.is_zero() || size.is_sign_negative() {
            book.remove(&price);
        } else {
            book.insert(price, size);
        }
    }

    /// Replace the entire book state from a REST snapshot.
    ///
    /// Zero-size snapshot levels are skipped so the no-empty-levels
    /// invariant holds from the first update on.
    pub fn reset(&mut self, snapshot: &Snapshot) {
        self.bids.clear();
        self.asks.clear();
        for level in &snapshot.bids {
            if !level.size.is_zero() {
                self.bids.insert(level.price, level.size);
            }
        }
        for level in &snapshot.asks {
            if !level.size.is_zero() {
                self.asks.insert(level.price, level.size);
            }
        }
        self.nonce = snapshot.seq;
        self.timestamp = snapshot.timestamp;
    }

    /// Advance the nonce after a delta has been applied
    pub(crate) fn set_nonce(&mut self, nonce: SeqNum) {
        self.nonce = nonce;
    }

    /// Record the server time of the latest update
    pub(crate) fn set_timestamp(&mut self, timestamp: Option<TimestampMs>) {
        if timestamp.is_some() {
            self.timestamp = timestamp;
        }
    }

    /// Get the best bid (highest price on the buy side)
    #[must_use]
    pub fn best_bid(&self) -> Option<(Price, Size)> {
        self.bids.last_key_value().map(|(&p, &s)| (p, s))
    }

    /// Get the best ask (lowest price on the sell side)
    #[must_use]
    pub fn best_ask(&self) -> Option<(Price, Size)> {
        self.asks.first_key_value().map(|(&p, &s)| (p, s))
    }

    /// Get the bid-ask spread
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Get the mid price
    #[must_use]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Price::TWO),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask).
    ///
    /// A healthy book is never crossed; a crossed book usually means the
    /// feed was spliced incorrectly.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }

    /// All bid levels, best (highest) first
    pub fn bids(&self) -> impl Iterator<Item = (Price, Size)> + '_ {
        self.bids.iter().rev().map(|(&p, &s)| (p, s))
    }

    /// All ask levels, best (lowest) first
    pub fn asks(&self) -> impl Iterator<Item = (Price, Size)> + '_ {
        self.asks.iter().map(|(&p, &s)| (p, s))
    }

    /// Bounded view with at most `depth` levels per side, best first.
    ///
    /// `None` returns the full book.
    #[must_use]
    pub fn limit(&self, depth: Option<usize>) -> BookUpdate {
        let take = depth.unwrap_or(usize::MAX);
        BookUpdate {
            symbol: self.symbol.clone(),
            bids: self.bids().take(take).map(Level::from).collect(),
            asks: self.asks().take(take).map(Level::from).collect(),
            nonce: self.nonce,
            timestamp: self.timestamp,
        }
    }

    /// Number of price levels per side as `(bids, asks)`
    #[must_use]
    pub fn depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// Check if both sides are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Drop all levels and reset the nonce
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.nonce = 0;
        self.timestamp = None;
    }
}
