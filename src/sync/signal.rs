//! Per-symbol publication: signals and the subscriber handle.
//!
//! Every symbol in the engine owns a `tokio::sync::watch` channel. The
//! engine publishes a [`BookSignal`] after each applied update or terminal
//! failure; subscribers hold a [`BookHandle`] and await successive updates.

use tokio::sync::watch;

use crate::book::BookUpdate;
use crate::error::Error;

/// What a subscriber observes on the symbol's channel.
#[derive(Debug, Clone)]
pub enum BookSignal {
    /// No reconciled book yet (buffering or awaiting the snapshot)
    Waiting,
    /// The book was updated; the latest bounded view
    Update(BookUpdate),
    /// The stream failed for this symbol; no further updates will arrive
    Failed(FailureReason),
}

/// Why a symbol's stream was torn down.
///
/// Carried inside [`BookSignal::Failed`] so every waiting subscriber
/// observes the same failure; convertible into the crate [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A live delta did not start at the expected sequence
    SequenceGap {
        /// Expected starting sequence
        expected: u64,
        /// Starting sequence received
        got: u64,
    },
    /// Snapshot and delta stream could not be aligned
    SnapshotOutOfSync {
        /// Fetch attempts made before giving up
        attempts: u32,
    },
    /// The snapshot fetch kept failing at the transport level
    SnapshotFetch(String),
    /// No snapshot arrived within the configured window
    Timeout,
    /// The WebSocket connection dropped
    Disconnected,
    /// A message for this symbol could not be parsed
    MalformedData(String),
}

impl FailureReason {
    /// Convert into the crate error surfaced to subscribers
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            FailureReason::SequenceGap { expected, got } => Error::SequenceGap { expected, got },
            FailureReason::SnapshotOutOfSync { attempts } => Error::SnapshotOutOfSync { attempts },
            FailureReason::SnapshotFetch(detail) => Error::SnapshotFetchFailed(detail),
            FailureReason::Timeout => Error::Timeout,
            FailureReason::Disconnected => Error::ConnectionClosed,
            FailureReason::MalformedData(detail) => Error::MalformedData(detail),
        }
    }
}

/// Subscriber side of a symbol's book stream.
///
/// Obtained from `SyncEngine::subscribe` (or `BookFeed::watch_order_book`).
/// [`recv`](BookHandle::recv) yields each newly published book view and
/// terminates with an error when the stream fails or the subscription is
/// dropped; a caller never hangs silently.
#[derive(Debug)]
pub struct BookHandle {
    symbol: String,
    rx: watch::Receiver<BookSignal>,
}

impl BookHandle {
    pub(crate) fn new(symbol: impl Into<String>, rx: watch::Receiver<BookSignal>) -> Self {
        Self {
            symbol: symbol.into(),
            rx,
        }
    }

    /// The symbol this handle watches
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Wait for the next published book view.
    ///
    /// Skips over the pre-snapshot `Waiting` phase. Returns an error once
    /// the stream fails or the subscription is torn down.
    pub async fn recv(&mut self) -> Result<BookUpdate, Error> {
        loop {
            // `changed` still yields an unseen value published right before
            // the sender dropped, so a terminal `Failed` is never lost.
            self.rx
                .changed()
                .await
                .map_err(|_| Error::ConnectionClosed)?;
            let signal = self.rx.borrow_and_update().clone();
            match signal {
                BookSignal::Update(update) => return Ok(update),
                BookSignal::Failed(reason) => return Err(reason.into_error()),
                BookSignal::Waiting => continue,
            }
        }
    }

    /// Latest published view without waiting, if the book is live
    #[must_use]
    pub fn latest(&self) -> Option<BookUpdate> {
        match &*self.rx.borrow() {
            BookSignal::Update(update) => Some(update.clone()),
            _ => None,
        }
    }
}
