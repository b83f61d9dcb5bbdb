//! Transport integration.
//!
//! This module connects the sync engine to the outside world:
//!
//! - [`adapter`] - The venue seam: subscribe framing, frame decoding,
//!   snapshot fetching
//! - [`snapshot`] - reqwest helper for REST snapshot endpoints
//! - [`driver`] - The WebSocket read loop and snapshot/watchdog tasks

pub mod adapter;
pub mod driver;
pub mod snapshot;

pub use adapter::{FeedAdapter, FeedEvent};
pub use driver::BookFeed;
pub use snapshot::SnapshotClient;
