//! Streams a live synchronized order book for one symbol.
//!
//! Usage:
//!   BOOK_WS_URL=wss://... BOOK_REST_URL=https://... cargo run --example watch_book
//!
//! Optional:
//!   BOOK_SYMBOL=BTC/USD   # symbol to watch (default: BTC/USD)
//!
//! The adapter below targets a generic level2-style feed:
//!
//!   ack:    {"type":"subscribed","symbol":"BTC/USD"}
//!   delta:  {"type":"l2update","symbol":"BTC/USD","start":101,"end":105,
//!            "bids":[["100.5","2"]],"asks":[],"ts":1700000000000}
//!   ping:   {"op":"ping"}
//!
//! and a REST depth endpoint answering
//!
//!   {"sequence":100,"bids":[["100","1"]],"asks":[["101","2"]],"ts":...}
//!
//! Adjust the field names to your venue.

use std::time::Duration;

use booksync::feed::{BookFeed, FeedAdapter, FeedEvent, SnapshotClient};
use booksync::types::messages::{parse_levels, Delta, Snapshot};
use booksync::{Error, SyncConfig};
use url::Url;

struct Level2Adapter {
    ws_url: String,
    rest_url: Url,
    snapshots: SnapshotClient,
}

impl Level2Adapter {
    fn new(ws_url: String, rest_url: Url) -> Result<Self, Error> {
        Ok(Self {
            ws_url,
            rest_url,
            snapshots: SnapshotClient::new(Duration::from_secs(10))?,
        })
    }
}

impl FeedAdapter for Level2Adapter {
    fn ws_url(&self) -> &str {
        &self.ws_url
    }

    fn subscribe_frame(&self, symbol: &str) -> String {
        format!(r#"{{"op":"subscribe","channel":"level2","symbol":"{symbol}"}}"#)
    }

    fn unsubscribe_frame(&self, symbol: &str) -> Option<String> {
        Some(format!(
            r#"{{"op":"unsubscribe","channel":"level2","symbol":"{symbol}"}}"#
        ))
    }

    fn pong_frame(&self) -> Option<String> {
        Some(r#"{"op":"pong"}"#.to_string())
    }

    fn decode(&self, frame: &str) -> Result<FeedEvent, Error> {
        let value: serde_json::Value = serde_json::from_str(frame)?;

        if value.get("op").and_then(|v| v.as_str()) == Some("ping") {
            return Ok(FeedEvent::Ping);
        }

        let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
            return Ok(FeedEvent::Ignore);
        };
        match kind {
            "subscribed" => {
                let symbol = value
                    .get("symbol")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(FeedEvent::Ack { symbol })
            }
            "l2update" => {
                let Some(symbol) = value.get("symbol").and_then(|v| v.as_str()) else {
                    return Err(Error::MalformedData("l2update without symbol".into()));
                };
                let symbol = symbol.to_string();
                match decode_delta(&value) {
                    Ok(delta) => Ok(FeedEvent::Delta { symbol, delta }),
                    Err(e) => Ok(FeedEvent::Broken {
                        symbol,
                        detail: e.to_string(),
                    }),
                }
            }
            _ => Ok(FeedEvent::Ignore),
        }
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, Error> {
        let mut url = self.rest_url.clone();
        url.query_pairs_mut().append_pair("symbol", symbol);
        let body = self.snapshots.get_json(&url).await?;

        let seq = body
            .get("sequence")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::MalformedData("snapshot without sequence".into()))?;
        Ok(Snapshot {
            seq,
            bids: parse_levels(body.get("bids").unwrap_or(&serde_json::Value::Null))?,
            asks: parse_levels(body.get("asks").unwrap_or(&serde_json::Value::Null))?,
            timestamp: body.get("ts").and_then(|v| v.as_u64()),
        })
    }
}

fn decode_delta(value: &serde_json::Value) -> Result<Delta, Error> {
    let start_seq = value
        .get("start")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::MalformedData("l2update without start".into()))?;
    let end_seq = value
        .get("end")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::MalformedData("l2update without end".into()))?;
    Ok(Delta {
        start_seq,
        end_seq,
        bids: parse_levels(value.get("bids").unwrap_or(&serde_json::Value::Null))?,
        asks: parse_levels(value.get("asks").unwrap_or(&serde_json::Value::Null))?,
        timestamp: value.get("ts").and_then(|v| v.as_u64()),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("booksync=debug".parse()?),
        )
        .init();

    let ws_url = std::env::var("BOOK_WS_URL").expect("Set BOOK_WS_URL environment variable");
    let rest_url: Url = std::env::var("BOOK_REST_URL")
        .expect("Set BOOK_REST_URL environment variable")
        .parse()?;
    let symbol = std::env::var("BOOK_SYMBOL").unwrap_or_else(|_| "BTC/USD".to_string());

    let adapter = Level2Adapter::new(ws_url, rest_url)?;
    let config = SyncConfig::default().with_publish_depth(Some(10));

    println!("Connecting...");
    let mut feed = BookFeed::connect(adapter, config).await?;

    println!("Watching {symbol}");
    let mut handle = feed.watch_order_book(&symbol).await?;

    tokio::spawn(async move {
        loop {
            match handle.recv().await {
                Ok(book) => {
                    let bid = book.bids.first();
                    let ask = book.asks.first();
                    println!(
                        "[{}] nonce={} bid={:?} ask={:?}",
                        book.symbol, book.nonce, bid, ask
                    );
                }
                Err(e) => {
                    eprintln!("stream ended: {e}");
                    break;
                }
            }
        }
    });

    feed.run().await?;
    Ok(())
}
