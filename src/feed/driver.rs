//! WebSocket feed driver.
//!
//! [`BookFeed`] glues a venue adapter to the sync engine: it owns the
//! WebSocket connection, routes decoded events into the engine, runs the
//! snapshot fetch with retries, and enforces the pre-snapshot timeout.
//!
//! # Usage
//!
//! ```rust,no_run
//! use booksync::feed::BookFeed;
//! use booksync::SyncConfig;
//! # use booksync::feed::{FeedAdapter, FeedEvent};
//! # use booksync::types::messages::Snapshot;
//! # use booksync::Error;
//! # struct Venue;
//! # impl FeedAdapter for Venue {
//! #     fn ws_url(&self) -> &str { "wss://example.invalid/ws" }
//! #     fn subscribe_frame(&self, _: &str) -> String { String::new() }
//! #     fn decode(&self, _: &str) -> Result<FeedEvent, Error> { Ok(FeedEvent::Ignore) }
//! #     async fn fetch_snapshot(&self, _: &str) -> Result<Snapshot, Error> { unimplemented!() }
//! # }
//!
//! # async fn example() -> Result<(), booksync::Error> {
//! let mut feed = BookFeed::connect(Venue, SyncConfig::default()).await?;
//! let mut handle = feed.watch_order_book("BTC/USD").await?;
//!
//! tokio::spawn(async move {
//!     while let Ok(book) = handle.recv().await {
//!         println!("best bid: {:?}", book.bids.first());
//!     }
//! });
//!
//! feed.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `BookFeed` itself is single-owner: one task drives `run()`. The engine
//! behind it is shared (`Arc`), so handles and snapshot tasks live on
//! their own tasks.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Error;
use crate::feed::adapter::{FeedAdapter, FeedEvent};
use crate::sync::engine::{DeltaOutcome, SnapshotOutcome, SyncEngine};
use crate::sync::signal::{BookHandle, FailureReason};
use crate::sync::state::SyncState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket driver for synchronized order books.
pub struct BookFeed<A: FeedAdapter> {
    adapter: Arc<A>,
    engine: Arc<SyncEngine>,
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    resub_tx: mpsc::UnboundedSender<String>,
    resub_rx: mpsc::UnboundedReceiver<String>,
}

impl<A: FeedAdapter> BookFeed<A> {
    /// Connect to the adapter's WebSocket endpoint
    pub async fn connect(adapter: A, config: SyncConfig) -> Result<Self, Error> {
        let (ws, _response) = tokio_tungstenite::connect_async(adapter.ws_url()).await?;
        let (write, read) = ws.split();
        let (resub_tx, resub_rx) = mpsc::unbounded_channel();
        info!(url = adapter.ws_url(), "feed connected");
        Ok(Self {
            adapter: Arc::new(adapter),
            engine: Arc::new(SyncEngine::new(config)),
            write,
            read,
            resub_tx,
            resub_rx,
        })
    }

    /// Shared handle to the sync engine
    #[must_use]
    pub fn engine(&self) -> Arc<SyncEngine> {
        Arc::clone(&self.engine)
    }

    /// Subscribe to a symbol's order book.
    ///
    /// Sends the venue subscribe frame, starts the snapshot fetch and the
    /// pre-snapshot watchdog, and returns a handle on the book stream.
    /// Updates flow while [`run`](Self::run) is being polled.
    pub async fn watch_order_book(&mut self, symbol: &str) -> Result<BookHandle, Error> {
        let handle = self.engine.subscribe(symbol);
        self.write
            .send(Message::Text(self.adapter.subscribe_frame(symbol)))
            .await?;
        self.spawn_sync_tasks(symbol);
        Ok(handle)
    }

    /// Tear down a symbol's subscription and drop its book
    pub async fn unsubscribe(&mut self, symbol: &str) -> Result<(), Error> {
        if let Some(frame) = self.adapter.unsubscribe_frame(symbol) {
            self.write.send(Message::Text(frame)).await?;
        }
        self.engine.unsubscribe(symbol);
        Ok(())
    }

    /// Drive the connection until it closes.
    ///
    /// Dispatches inbound frames to the engine, answers pings, and handles
    /// resubscription after sequence gaps. When the connection drops, every
    /// registered symbol is failed with
    /// [`Error::ConnectionClosed`]; reconnecting is the caller's decision.
    pub async fn run(&mut self) -> Result<(), Error> {
        loop {
            tokio::select! {
                maybe_frame = self.read.next() => {
                    match maybe_frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text).await?,
                        Some(Ok(Message::Ping(payload))) => {
                            self.write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            self.engine.fail_all(FailureReason::Disconnected);
                            return Err(e.into());
                        }
                    }
                }
                Some(symbol) = self.resub_rx.recv() => {
                    self.resubscribe(&symbol).await?;
                }
            }
        }
        self.engine.fail_all(FailureReason::Disconnected);
        Err(Error::ConnectionClosed)
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<(), Error> {
        self.write.close().await?;
        Ok(())
    }

    async fn handle_frame(&mut self, text: &str) -> Result<(), Error> {
        let event = match self.adapter.decode(text) {
            Ok(event) => event,
            Err(e) => {
                // Not attributable to any symbol; nothing to fail.
                warn!(error = %e, "dropping undecodable frame");
                return Ok(());
            }
        };
        match event {
            FeedEvent::Ack { symbol } => self.engine.acknowledge(&symbol),
            FeedEvent::Delta { symbol, delta } => {
                match self.engine.on_delta(&symbol, delta) {
                    Ok(DeltaOutcome::Resync) => self.resubscribe(&symbol).await?,
                    Ok(_) => {}
                    // Already published to the symbol's subscribers; the
                    // connection and other symbols keep going.
                    Err(e) => warn!(symbol = %symbol, error = %e, "order book stream failed"),
                }
            }
            FeedEvent::Broken { symbol, detail } => {
                self.engine
                    .fail(&symbol, FailureReason::MalformedData(detail));
            }
            FeedEvent::Ping => {
                if let Some(pong) = self.adapter.pong_frame() {
                    self.write.send(Message::Text(pong)).await?;
                }
            }
            FeedEvent::Ignore => {}
        }
        Ok(())
    }

    async fn resubscribe(&mut self, symbol: &str) -> Result<(), Error> {
        if self.engine.state(symbol) != Some(SyncState::Subscribing) {
            return Ok(());
        }
        info!(symbol, "re-subscribing order book");
        self.write
            .send(Message::Text(self.adapter.subscribe_frame(symbol)))
            .await?;
        self.spawn_sync_tasks(symbol);
        Ok(())
    }

    /// Start the snapshot fetch and pre-snapshot watchdog for one cycle
    fn spawn_sync_tasks(&self, symbol: &str) {
        let symbol = symbol.to_string();

        tokio::spawn(snapshot_task(
            Arc::clone(&self.engine),
            Arc::clone(&self.adapter),
            symbol.clone(),
            self.resub_tx.clone(),
        ));

        let engine = Arc::clone(&self.engine);
        let timeout = engine.config().snapshot_timeout();
        let cycle = engine.cycle(&symbol);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let stalled = matches!(engine.state(&symbol), Some(s) if s.is_pre_live())
                && engine.cycle(&symbol) == cycle;
            if stalled {
                engine.fail(&symbol, FailureReason::Timeout);
            }
        });
    }
}

/// Fetch the snapshot for one subscription cycle, retrying on transport
/// failures and on snapshots that predate the buffered stream.
async fn snapshot_task<A: FeedAdapter>(
    engine: Arc<SyncEngine>,
    adapter: Arc<A>,
    symbol: String,
    resub_tx: mpsc::UnboundedSender<String>,
) {
    let delay = engine.config().snapshot_delay();
    let max_attempts = engine.config().snapshot_max_attempts();
    let mut fetch_failures = 0u32;
    loop {
        tokio::time::sleep(delay).await;
        match engine.state(&symbol) {
            Some(state) if state.is_pre_live() => {}
            // Unsubscribed, failed, or already live through another cycle.
            _ => return,
        }
        engine.mark_snapshot_requested(&symbol);
        match adapter.fetch_snapshot(&symbol).await {
            Ok(snapshot) => match engine.apply_snapshot(&symbol, snapshot) {
                Ok(SnapshotOutcome::Retry { attempts }) => {
                    debug!(symbol = %symbol, attempts, "refetching snapshot");
                }
                Ok(SnapshotOutcome::Resync) => {
                    // Gap among the buffered deltas; hand the cycle back to
                    // the driver task, which owns the write half.
                    let _ = resub_tx.send(symbol);
                    return;
                }
                Ok(SnapshotOutcome::Live { replayed }) => {
                    debug!(symbol = %symbol, replayed, "order book synchronized");
                    return;
                }
                Ok(SnapshotOutcome::Ignored) | Err(_) => return,
            },
            Err(e) => {
                fetch_failures += 1;
                if fetch_failures >= max_attempts {
                    engine.fail(&symbol, FailureReason::SnapshotFetch(e.to_string()));
                    return;
                }
                warn!(
                    symbol = %symbol,
                    error = %e,
                    attempt = fetch_failures,
                    "snapshot fetch failed, retrying"
                );
            }
        }
    }
}
