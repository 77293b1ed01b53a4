//! Chronik-style HTTP indexer provider.
//!
//! Endpoint: `GET {base}/script/{type}/{payloadhex}/history?page={n}&page_size={k}`
//! where the indexer's `page` is 0-based. Response body:
//!
//! ```json
//! { "txs": [ { "txid": "..", "block": { "height": 1, "hash": "..", "timestamp": 0 } } ],
//!   "numPages": 3 }
//! ```
//!
//! Indexers that expose their tip send it as `x-chain-tip-hash` /
//! `x-chain-tip-height` response headers; it becomes the page's snapshot token.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::provider::{HistoryProvider, ProviderError};
use crate::script::ScriptRef;
use crate::types::{ChainTip, HistoryPage, TxRecord};

pub const TIP_HASH_HEADER: &str = "x-chain-tip-hash";
pub const TIP_HEIGHT_HEADER: &str = "x-chain-tip-height";
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP history provider with ordered endpoint failover.
///
/// Endpoints are tried in order; only transport failures move on to the next
/// one. An HTTP error status from a reachable indexer is returned as is.
/// The API key (if any) is sent as a header and never logged.
#[derive(Clone)]
pub struct ChronikHistoryProvider {
    base_urls: Vec<String>,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl std::fmt::Debug for ChronikHistoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChronikHistoryProvider")
            .field("base_urls", &self.base_urls)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ChronikHistoryProvider {
    pub fn new(base_urls: Vec<String>, timeout: Duration) -> Result<Self, ProviderError> {
        if base_urls.is_empty() {
            return Err(ProviderError::Config(
                "at least one indexer url is required".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            base_urls: base_urls
                .into_iter()
                .map(|u| u.trim_end_matches('/').to_string())
                .collect(),
            http,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn base_urls(&self) -> &[String] {
        &self.base_urls
    }

    fn build_history_url(base: &str, identifier: &ScriptRef) -> String {
        format!(
            "{}/script/{}/{}/history",
            base,
            identifier.script_type().as_str(),
            identifier.payload_hex()
        )
    }

    async fn fetch_from(
        &self,
        base: &str,
        identifier: &ScriptRef,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, ProviderError> {
        let url = Self::build_history_url(base, identifier);

        let mut req = self.http.get(&url).query(&[
            ("page", (page - 1).to_string()),
            ("page_size", page_size.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let tip = tip_from_headers(resp.headers())?;
        let body: HistoryResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("history response json: {e}")))?;

        let num_pages = parse_num_pages(&body.num_pages)?;
        let txs = body
            .txs
            .into_iter()
            .map(TxRecord::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage {
            txs,
            num_pages,
            tip,
        })
    }
}

#[async_trait::async_trait]
impl HistoryProvider for ChronikHistoryProvider {
    fn name(&self) -> &'static str {
        "chronik"
    }

    async fn fetch_page(
        &self,
        identifier: &ScriptRef,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, ProviderError> {
        if page == 0 {
            return Err(ProviderError::Config("page numbers start at 1".to_string()));
        }
        if page_size == 0 {
            return Err(ProviderError::Config("page_size must be >= 1".to_string()));
        }

        let mut last_err = None;
        for (i, base) in self.base_urls.iter().enumerate() {
            debug!(%identifier, page, page_size, endpoint = i, "fetching history page");
            match self.fetch_from(base, identifier, page, page_size).await {
                Ok(p) => return Ok(p),
                Err(e) if e.is_transport() => {
                    warn!(endpoint = i, error = %e, "indexer unreachable, trying next endpoint");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Config("no indexer urls".to_string())))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    #[serde(default)]
    txs: Vec<Map<String, Value>>,
    #[serde(default)]
    num_pages: Value,
}

fn parse_num_pages(v: &Value) -> Result<u32, ProviderError> {
    let n = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ProviderError::Decode(format!("invalid numPages {v}")))
}

/// `None` when the indexer sends no tip. A hash without a usable height is a
/// decode error, not a tip.
fn tip_from_headers(headers: &HeaderMap) -> Result<Option<ChainTip>, ProviderError> {
    let Some(hash) = headers.get(TIP_HASH_HEADER) else {
        return Ok(None);
    };
    let hash = hash
        .to_str()
        .map_err(|_| ProviderError::Decode(format!("{TIP_HASH_HEADER} is not ascii")))?
        .trim()
        .to_string();
    let height = headers
        .get(TIP_HEIGHT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i32>().ok())
        .filter(|h| *h >= 0)
        .ok_or_else(|| {
            ProviderError::Decode(format!(
                "{TIP_HASH_HEADER} present without a valid {TIP_HEIGHT_HEADER}"
            ))
        })?;
    Ok(Some(ChainTip { hash, height }))
}
