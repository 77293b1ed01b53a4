//! Provider boundary for paginated transaction history.
//!
//! This module defines **only** the error type and the provider trait.
//! Concrete providers live in `chronik.rs` (HTTP indexer) and `memory.rs`
//! (in-process fixtures). No reconciliation logic belongs here.

use std::fmt;

use crate::script::ScriptRef;
use crate::types::HistoryPage;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a [`HistoryProvider`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network, timeout or connection failure.
    Transport(String),
    /// The indexer answered with a non-success status.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A transaction record is missing fields its shape requires.
    Malformed {
        txid: Option<String>,
        reason: String,
    },
    /// Invalid provider configuration or request parameters.
    Config(String),
}

impl ProviderError {
    /// `true` for failures where another endpoint may succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "indexer api error status={status}: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Malformed {
                txid: Some(txid),
                reason,
            } => write!(f, "malformed tx {txid}: {reason}"),
            ProviderError::Malformed { txid: None, reason } => {
                write!(f, "malformed tx: {reason}")
            }
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Paginated transaction-history source.
///
/// Contract:
/// - `page` is 1-based; page 1 holds the newest transactions.
/// - Every page except the last holds exactly `page_size` transactions.
/// - Transactions are newest-first across pages: unconfirmed first, then
///   confirmed by non-increasing height.
/// - `num_pages` should be stable for the duration of one reconciliation;
///   the reconciler verifies it and fails with `NonStationaryHistory` otherwise.
///
/// Object-safe so callers can hold a `Box<dyn HistoryProvider>`.
#[async_trait::async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Short name for logs (e.g. `"chronik"`).
    fn name(&self) -> &'static str;

    async fn fetch_page(
        &self,
        identifier: &ScriptRef,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, ProviderError>;
}
