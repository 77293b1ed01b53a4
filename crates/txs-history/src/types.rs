//! History data model shared by providers and the reconciler.
//!
//! A [`TxRecord`] is opaque apart from its `txid` and confirmation status.
//! Everything else the indexer sends is kept verbatim in `extra` so callers
//! applying the transactions see the full record.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::provider::ProviderError;

// ---------------------------------------------------------------------------
// Block / tip
// ---------------------------------------------------------------------------

/// Block a confirmed transaction was mined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockMeta {
    pub height: i32,
    /// Block hash as hex; empty when the indexer omitted it.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Block timestamp, UTC epoch seconds (0 when omitted).
    pub timestamp: i64,
}

/// Chain tip a page was served from.
///
/// Used as a snapshot consistency token: two pages served from the same
/// snapshot carry the same tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainTip {
    pub hash: String,
    pub height: i32,
}

// ---------------------------------------------------------------------------
// Transaction record
// ---------------------------------------------------------------------------

/// A single transaction as returned by the history provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxRecord {
    pub txid: String,
    /// `None` while the transaction is unconfirmed (mempool).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockMeta>,
    /// Remaining indexer fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TxRecord {
    pub fn unconfirmed(txid: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            block: None,
            extra: Map::new(),
        }
    }

    pub fn confirmed(txid: impl Into<String>, height: i32) -> Self {
        Self {
            txid: txid.into(),
            block: Some(BlockMeta {
                height,
                hash: String::new(),
                timestamp: 0,
            }),
            extra: Map::new(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }

    pub fn height(&self) -> Option<i32> {
        self.block.as_ref().map(|b| b.height)
    }

    /// Decode one indexer JSON transaction object.
    ///
    /// `block` may be absent or `null` (unconfirmed). When it is present it
    /// must carry a non-negative integer `height` (number or decimal string);
    /// anything else is [`ProviderError::Malformed`] rather than being read as
    /// unconfirmed.
    pub fn from_json(mut obj: Map<String, Value>) -> Result<Self, ProviderError> {
        let txid = match obj.remove("txid") {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => {
                return Err(ProviderError::Malformed {
                    txid: None,
                    reason: "transaction without a txid".to_string(),
                })
            }
        };

        let block = match obj.remove("block") {
            None | Some(Value::Null) => None,
            Some(Value::Object(b)) => Some(decode_block(&txid, b)?),
            Some(other) => {
                return Err(ProviderError::Malformed {
                    txid: Some(txid),
                    reason: format!("block must be an object, got {other}"),
                })
            }
        };

        Ok(Self {
            txid,
            block,
            extra: obj,
        })
    }
}

fn decode_block(txid: &str, b: Map<String, Value>) -> Result<BlockMeta, ProviderError> {
    let malformed = |reason: String| ProviderError::Malformed {
        txid: Some(txid.to_string()),
        reason,
    };

    let height = match b.get("height") {
        Some(v) => int_field(v)
            .and_then(|h| i32::try_from(h).ok())
            .filter(|h| *h >= 0)
            .ok_or_else(|| malformed(format!("invalid block height {v}")))?,
        None => return Err(malformed("confirmed block without height".to_string())),
    };

    let hash = match b.get("hash") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let timestamp = b.get("timestamp").and_then(int_field).unwrap_or(0);

    Ok(BlockMeta {
        height,
        hash,
        timestamp,
    })
}

/// Indexers encode 64-bit integers either as JSON numbers or decimal strings.
fn int_field(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One page of an identifier's history, newest-first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub txs: Vec<TxRecord>,
    /// Total page count for the identifier's current history size.
    pub num_pages: u32,
    /// Snapshot token, when the provider supplies one.
    pub tip: Option<ChainTip>,
}

impl HistoryPage {
    pub fn new(txs: Vec<TxRecord>, num_pages: u32) -> Self {
        Self {
            txs,
            num_pages,
            tip: None,
        }
    }

    pub fn with_tip(mut self, tip: ChainTip) -> Self {
        self.tip = Some(tip);
        self
    }

    /// Last (oldest) transaction on the page.
    pub fn oldest(&self) -> Option<&TxRecord> {
        self.txs.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn decodes_confirmed_with_string_integers() {
        let tx = TxRecord::from_json(obj(json!({
            "txid": "aa",
            "block": { "height": "812345", "hash": "00ff", "timestamp": "1700000000" },
            "size": 225
        })))
        .unwrap();

        assert_eq!(tx.height(), Some(812_345));
        let block = tx.block.as_ref().unwrap();
        assert_eq!(block.hash, "00ff");
        assert_eq!(block.timestamp, 1_700_000_000);
        assert_eq!(tx.extra.get("size"), Some(&json!(225)));
    }

    #[test]
    fn null_block_is_unconfirmed() {
        let tx = TxRecord::from_json(obj(json!({ "txid": "bb", "block": null }))).unwrap();
        assert!(!tx.is_confirmed());
        assert_eq!(tx.height(), None);
    }

    #[test]
    fn block_without_height_is_malformed() {
        let err = TxRecord::from_json(obj(json!({ "txid": "cc", "block": { "hash": "00" } })))
            .unwrap_err();
        match err {
            ProviderError::Malformed { txid, .. } => assert_eq!(txid.as_deref(), Some("cc")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn negative_height_is_malformed() {
        let err = TxRecord::from_json(obj(json!({ "txid": "dd", "block": { "height": -1 } })))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }

    #[test]
    fn missing_txid_is_malformed() {
        let err = TxRecord::from_json(obj(json!({ "block": null }))).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { txid: None, .. }));
    }

    #[test]
    fn serializes_extra_fields_flat() {
        let mut tx = TxRecord::confirmed("ee", 10);
        tx.extra.insert("isCoinbase".to_string(), json!(false));
        let v = serde_json::to_value(&tx).unwrap();
        assert_eq!(v["txid"], "ee");
        assert_eq!(v["block"]["height"], 10);
        assert_eq!(v["isCoinbase"], false);
    }
}
