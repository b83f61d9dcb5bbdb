//! Local order book implementation.
//!
//! This module provides the in-memory, price-indexed book maintained by the
//! sync engine:
//!
//! - Fast upserts (O(log n) per price level)
//! - Delete-on-zero-size semantics
//! - Sequence (nonce) tracking for gap detection
//!
//! # Example
//!
//! ```rust
//! use booksync::book::OrderBook;
//! use booksync::types::Side;
//! use rust_decimal_macros::dec;
//!
//! let mut book = OrderBook::new("BTC/USD");
//!
//! book.store(Side::Bid, dec!(100), dec!(1.5));
//! book.store(Side::Ask, dec!(101), dec!(2));
//!
//! if let Some((price, size)) = book.best_bid() {
//!     println!("best bid: {} @ {}", size, price);
//! }
//! ```

pub mod book;

pub use book::{BookUpdate, OrderBook};
