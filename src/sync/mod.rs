//! Order book synchronization: buffering, reconciliation, live upkeep.
//!
//! This module implements the protocol that turns a REST snapshot plus a
//! concurrent WebSocket delta stream into a gap-free live book:
//!
//! - [`buffer`] - Queue for deltas that arrive before the snapshot
//! - [`state`] - Explicit per-symbol lifecycle
//! - [`engine`] - The reconciler and live delta applier
//! - [`signal`] - Per-symbol publication and the subscriber handle

pub mod buffer;
pub mod engine;
pub mod signal;
pub mod state;

pub use buffer::DeltaBuffer;
pub use engine::{DeltaOutcome, SnapshotOutcome, SyncEngine};
pub use signal::{BookHandle, BookSignal, FailureReason};
pub use state::SyncState;
