//! # booksync
//!
//! A reusable L2 order-book synchronization engine for exchange WebSocket
//! feeds.
//!
//! Streaming venues all ship the same protocol in different clothes: the
//! client fetches a REST snapshot of the book, buffers the WebSocket deltas
//! that arrive concurrently, splices the two together by sequence number,
//! and then maintains the book incrementally, watching for gaps. This crate
//! implements that protocol once; venue specifics (wire formats, endpoints,
//! signing) stay behind a small adapter trait.
//!
//! ## Features
//!
//! - **Local order book** - `BTreeMap`-backed bid/ask sides with
//!   delete-on-zero semantics and bounded depth views
//! - **Snapshot/delta reconciliation** - buffered replay with join-window
//!   validation and automatic snapshot refetch when the stream outruns it
//! - **Gap detection** - strict `nonce + 1` sequencing once live, with a
//!   configurable resubscribe-or-error policy
//! - **Per-symbol publication** - watch channels; subscribers see every
//!   reconciled update or a terminal error, never a silent hang
//!
//! ## Quick Start
//!
//! ```rust
//! use booksync::sync::SyncEngine;
//! use booksync::types::messages::{Delta, Snapshot};
//! use booksync::types::Level;
//! use booksync::SyncConfig;
//! use rust_decimal_macros::dec;
//!
//! let engine = SyncEngine::new(SyncConfig::default());
//! let handle = engine.subscribe("BTC/USD");
//!
//! // Deltas arriving before the snapshot are buffered per symbol...
//! engine.on_delta("BTC/USD", Delta {
//!     start_seq: 48,
//!     end_seq: 51,
//!     bids: vec![Level::new(dec!(100), dec!(0))],
//!     asks: vec![],
//!     timestamp: None,
//! })?;
//!
//! // ...and spliced onto the snapshot when it lands.
//! engine.apply_snapshot("BTC/USD", Snapshot {
//!     seq: 50,
//!     bids: vec![Level::new(dec!(100), dec!(1))],
//!     asks: vec![Level::new(dec!(101), dec!(2))],
//!     timestamp: None,
//! })?;
//!
//! let book = engine.book("BTC/USD", Some(10)).unwrap();
//! assert_eq!(book.nonce, 51);
//! assert!(book.bids.is_empty());
//! # Ok::<(), booksync::Error>(())
//! ```
//!
//! For a live feed, implement [`feed::FeedAdapter`] for your venue and
//! drive it with [`feed::BookFeed`]; see the `watch_book` example.
//!
//! ## Architecture
//!
//! - [`book`] - The local order book data structure
//! - [`sync`] - Buffering, reconciliation, and live upkeep
//! - [`feed`] - WebSocket/REST transport glue and the venue adapter trait
//! - [`types`] - Normalized message shapes and value types
//! - [`config`] - Engine and driver configuration
//! - [`error`] - Error types for the crate
//!
//! ## Sequencing rules
//!
//! A buffered delta whose `end_seq` is at or below the snapshot sequence is
//! already represented in the snapshot and is discarded. The first delta
//! spliced onto a snapshot may overlap it (`start_seq <= seq + 1`,
//! `end_seq > seq`); every delta after that must start at exactly
//! `nonce + 1`. Anything else is a gap and tears the cycle down per the
//! configured [`GapPolicy`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod book;
pub mod config;
pub mod error;
pub mod feed;
pub mod sync;
pub mod types;

// Re-export main types at crate root for convenience
pub use book::{BookUpdate, OrderBook};
pub use config::{GapPolicy, SyncConfig};
pub use error::Error;
pub use sync::{BookHandle, BookSignal, SyncEngine};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
