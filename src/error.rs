//! Error types for the booksync crate.
//!
//! This module defines the errors that can occur while establishing and
//! maintaining a synchronized order book: transport failures fetching the
//! snapshot, malformed wire data, and sequence violations in the delta
//! stream.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request for the snapshot failed at the transport level
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The venue answered the snapshot request with a server error
    #[error("exchange not available (HTTP {status})")]
    ExchangeNotAvailable {
        /// HTTP status code returned by the venue
        status: u16,
    },

    /// WebSocket error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A delta or snapshot entry could not be parsed into numeric
    /// price/size values
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// A delta's starting sequence does not line up with the book's nonce
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap {
        /// Expected starting sequence (`nonce + 1`)
        expected: u64,
        /// Starting sequence actually received
        got: u64,
    },

    /// The snapshot could not be aligned with the buffered delta stream
    /// within the configured number of fetch attempts
    #[error("snapshot out of sync with delta stream after {attempts} attempts")]
    SnapshotOutOfSync {
        /// Number of fetch attempts made
        attempts: u32,
    },

    /// The snapshot fetch kept failing at the transport level
    #[error("snapshot fetch failed: {0}")]
    SnapshotFetchFailed(String),

    /// WebSocket connection closed unexpectedly
    #[error("websocket connection closed")]
    ConnectionClosed,

    /// The snapshot did not arrive within the configured window
    #[error("timed out waiting for order book snapshot")]
    Timeout,

    /// Operation on a symbol with no active subscription
    #[error("not subscribed to {0}")]
    NotSubscribed(String),
}

impl Error {
    /// Build a [`Error::MalformedData`] from anything displayable
    pub(crate) fn malformed(detail: impl std::fmt::Display) -> Self {
        Error::MalformedData(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_gap_display() {
        let err = Error::SequenceGap {
            expected: 101,
            got: 108,
        };
        assert!(err.to_string().contains("101"));
        assert!(err.to_string().contains("108"));
    }

    #[test]
    fn test_exchange_not_available_display() {
        let err = Error::ExchangeNotAvailable { status: 503 };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_malformed_data_display() {
        let err = Error::malformed("price is not a number: \"abc\"");
        assert!(err.to_string().contains("abc"));
    }
}
