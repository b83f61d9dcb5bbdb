//! Normalized snapshot and delta message shapes.
//!
//! No wire format is shared between venues, so the engine does not consume
//! raw frames. Each venue's adapter translates its own payloads into these
//! two shapes; the reconciliation logic only ever sees them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Level, SeqNum, TimestampMs};
use crate::error::Error;

/// Incremental book update carrying a sequence range.
///
/// `start_seq`/`end_seq` cover the venue's update ids for this message.
/// Venues that tag messages with a single update id set both to that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    /// First sequence number covered by this message
    pub start_seq: SeqNum,
    /// Last sequence number covered by this message
    pub end_seq: SeqNum,
    /// Changed bid levels; size zero removes the level
    pub bids: Vec<Level>,
    /// Changed ask levels; size zero removes the level
    pub asks: Vec<Level>,
    /// Server time of the update, when the venue includes one
    pub timestamp: Option<TimestampMs>,
}

impl Delta {
    /// Create a delta with a single update id (`start_seq == end_seq`)
    pub fn with_id(id: SeqNum, bids: Vec<Level>, asks: Vec<Level>) -> Self {
        Self {
            start_seq: id,
            end_seq: id,
            bids,
            asks,
            timestamp: None,
        }
    }
}

/// Full point-in-time book state fetched over REST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sequence number the snapshot is current as of
    pub seq: SeqNum,
    /// All bid levels
    pub bids: Vec<Level>,
    /// All ask levels
    pub asks: Vec<Level>,
    /// Server time of the snapshot, when the venue includes one
    pub timestamp: Option<TimestampMs>,
}

/// Parse a raw `[price, size]` wire entry into a [`Level`].
///
/// Accepts the two encodings seen in the wild: JSON strings (`["100.5","2"]`)
/// and JSON numbers (`[100.5, 2]`). Anything else is malformed and is
/// reported rather than dropped, since a silently skipped level corrupts
/// the book.
pub fn parse_level(raw: &Value) -> Result<Level, Error> {
    let pair = raw
        .as_array()
        .ok_or_else(|| Error::malformed(format!("level is not an array: {raw}")))?;
    if pair.len() < 2 {
        return Err(Error::malformed(format!("level has fewer than 2 fields: {raw}")));
    }
    let price = parse_decimal(&pair[0], "price")?;
    let size = parse_decimal(&pair[1], "size")?;
    if size.is_sign_negative() {
        return Err(Error::malformed(format!("negative size {size} at price {price}")));
    }
    Ok(Level { price, size })
}

/// Parse an array of raw `[price, size]` entries.
pub fn parse_levels(raw: &Value) -> Result<Vec<Level>, Error> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => entries.iter().map(parse_level).collect(),
        other => Err(Error::malformed(format!("level list is not an array: {other}"))),
    }
}

fn parse_decimal(raw: &Value, field: &str) -> Result<Decimal, Error> {
    match raw {
        Value::String(s) => s
            .parse::<Decimal>()
            .map_err(|e| Error::malformed(format!("{field} {s:?}: {e}"))),
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .map_err(|e| Error::malformed(format!("{field} {n}: {e}"))),
        other => Err(Error::malformed(format!("{field} is not numeric: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_level_strings() {
        let level = parse_level(&json!(["100.5", "2.25"])).unwrap();
        assert_eq!(level.price, dec!(100.5));
        assert_eq!(level.size, dec!(2.25));
    }

    #[test]
    fn test_parse_level_numbers() {
        let level = parse_level(&json!([101, 0])).unwrap();
        assert_eq!(level.price, dec!(101));
        assert!(level.size.is_zero());
    }

    #[test]
    fn test_parse_level_extra_fields_ignored() {
        // kucoin-style entries carry a per-level sequence as a third field
        let level = parse_level(&json!(["6", "1", "1545896669105"])).unwrap();
        assert_eq!(level.price, dec!(6));
        assert_eq!(level.size, dec!(1));
    }

    #[test]
    fn test_parse_level_rejects_garbage() {
        assert!(parse_level(&json!(["abc", "1"])).is_err());
        assert!(parse_level(&json!("100.5")).is_err());
        assert!(parse_level(&json!(["100.5"])).is_err());
        assert!(parse_level(&json!(["100.5", "-1"])).is_err());
    }

    #[test]
    fn test_parse_levels_null_is_empty() {
        assert!(parse_levels(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_levels_propagates_malformed() {
        let err = parse_levels(&json!([["100", "1"], ["x", "2"]])).unwrap_err();
        assert!(matches!(err, Error::MalformedData(_)));
    }

    #[test]
    fn test_delta_roundtrip() {
        let delta = Delta {
            start_seq: 48,
            end_seq: 51,
            bids: vec![Level::new(dec!(100), dec!(0))],
            asks: vec![],
            timestamp: Some(1_700_000_000_000),
        };
        let json = serde_json::to_string(&delta).unwrap();
        let back: Delta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_seq, 48);
        assert_eq!(back.end_seq, 51);
        assert_eq!(back.bids[0].price, dec!(100));
    }

    #[test]
    fn test_delta_with_id() {
        let delta = Delta::with_id(7, vec![], vec![Level::new(dec!(1), dec!(2))]);
        assert_eq!(delta.start_seq, 7);
        assert_eq!(delta.end_seq, 7);
    }
}
