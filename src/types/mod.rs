//! Core value types shared across the crate.
//!
//! - [`messages`] - Normalized snapshot and delta message shapes
//!
//! Prices and sizes are [`rust_decimal::Decimal`]. Venues quote anything
//! from satoshis to basis points; `Decimal` gives exact comparisons and a
//! total order, which the sorted book sides rely on.

pub mod messages;

pub use messages::{Delta, Snapshot};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price of a single level
pub type Price = Decimal;

/// Aggregate resting size at a price level
pub type Size = Decimal;

/// Server-assigned sequence number identifying a book update position
pub type SeqNum = u64;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = u64;

/// Side of the book a level belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, sorted descending by price
    Bid,
    /// Sell side, sorted ascending by price
    Ask,
}

/// A single price level: all resting interest at one price on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Price of the level
    pub price: Price,
    /// Aggregate size; zero in a delta means "remove this level"
    pub size: Size,
}

impl Level {
    /// Create a new price level
    pub const fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

impl From<(Price, Size)> for Level {
    fn from((price, size): (Price, Size)) -> Self {
        Self { price, size }
    }
}
