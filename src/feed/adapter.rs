//! The venue seam.
//!
//! Everything venue-specific lives behind [`FeedAdapter`]: endpoint URLs,
//! subscribe/ping framing, and the translation of raw payloads into the
//! normalized [`Delta`]/[`Snapshot`] shapes. The driver and engine never
//! see a raw venue format.

use std::future::Future;

use crate::error::Error;
use crate::types::messages::{Delta, Snapshot};

/// A decoded inbound frame, from the book engine's point of view.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The venue acknowledged the book subscription for a symbol
    Ack {
        /// Symbol the ack refers to
        symbol: String,
    },
    /// An incremental book update
    Delta {
        /// Symbol the update refers to
        symbol: String,
        /// The normalized update
        delta: Delta,
    },
    /// A payload for a tracked symbol that could not be normalized.
    ///
    /// Surfacing this fails the symbol's stream; silently skipping levels
    /// would corrupt the book.
    Broken {
        /// Symbol the payload referred to
        symbol: String,
        /// What was wrong with it
        detail: String,
    },
    /// Venue-level heartbeat that expects the adapter's pong frame
    Ping,
    /// Anything else: acks for other channels, trades, tickers
    Ignore,
}

/// Venue integration consumed by [`BookFeed`](crate::feed::BookFeed).
///
/// Implementations are plain structs holding the venue's endpoints and a
/// REST client; see the crate examples for a complete one.
pub trait FeedAdapter: Send + Sync + 'static {
    /// WebSocket endpoint to connect to
    fn ws_url(&self) -> &str;

    /// Raw frame subscribing to the book channel for `symbol`
    fn subscribe_frame(&self, symbol: &str) -> String;

    /// Raw frame tearing down the book subscription for `symbol`, if the
    /// venue has one
    fn unsubscribe_frame(&self, _symbol: &str) -> Option<String> {
        None
    }

    /// Raw frame answering a venue-level [`FeedEvent::Ping`]
    fn pong_frame(&self) -> Option<String> {
        None
    }

    /// Translate an inbound text frame into a [`FeedEvent`].
    ///
    /// Frames that are undecodable as a whole (not even attributable to a
    /// symbol) should return an error; payloads that belong to a symbol
    /// but fail normalization should return [`FeedEvent::Broken`] so only
    /// that symbol's stream is failed.
    fn decode(&self, frame: &str) -> Result<FeedEvent, Error>;

    /// Fetch a REST snapshot for `symbol`.
    ///
    /// Transport failures map to [`Error::Network`] or
    /// [`Error::ExchangeNotAvailable`]; the driver retries per its
    /// configuration, this method should not retry internally.
    fn fetch_snapshot(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<Snapshot, Error>> + Send;
}
