use std::fmt;

use txs_history::ProviderError;

/// Why a reconciliation pass failed. No partial result is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// A record is malformed or the history violates newest-first order.
    MalformedHistoryRecord {
        page: u32,
        txid: Option<String>,
        reason: String,
    },
    /// The provider failed to serve `page`. Not retried here.
    HistoryFetchFailed { page: u32, source: ProviderError },
    /// `page` was served from a different snapshot than page 1.
    NonStationaryHistory {
        page: u32,
        expected: String,
        got: String,
    },
    InvalidOptions(String),
}

impl ReconcileError {
    /// Map a provider failure on `page`. Malformed records surface as
    /// `MalformedHistoryRecord`, everything else as `HistoryFetchFailed`.
    pub fn from_provider(page: u32, err: ProviderError) -> Self {
        match err {
            ProviderError::Malformed { txid, reason } => {
                ReconcileError::MalformedHistoryRecord { page, txid, reason }
            }
            source => ReconcileError::HistoryFetchFailed { page, source },
        }
    }

    /// `true` when re-running the whole pass may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::NonStationaryHistory { .. } => true,
            ReconcileError::HistoryFetchFailed { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::MalformedHistoryRecord {
                page,
                txid: Some(txid),
                reason,
            } => write!(f, "malformed history record on page {page} (tx {txid}): {reason}"),
            ReconcileError::MalformedHistoryRecord {
                page,
                txid: None,
                reason,
            } => write!(f, "malformed history record on page {page}: {reason}"),
            ReconcileError::HistoryFetchFailed { page, source } => {
                write!(f, "history fetch failed on page {page}: {source}")
            }
            ReconcileError::NonStationaryHistory {
                page,
                expected,
                got,
            } => write!(
                f,
                "history changed during reconciliation at page {page}: expected {expected}, got {got}"
            ),
            ReconcileError::InvalidOptions(msg) => write!(f, "invalid reconcile options: {msg}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::HistoryFetchFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_malformed_maps_to_malformed_record() {
        let e = ReconcileError::from_provider(
            2,
            ProviderError::Malformed {
                txid: Some("ab".to_string()),
                reason: "confirmed block without height".to_string(),
            },
        );
        assert!(matches!(
            e,
            ReconcileError::MalformedHistoryRecord { page: 2, .. }
        ));
        assert!(!e.is_retryable());
    }

    #[test]
    fn fetch_failure_display_names_page() {
        let e = ReconcileError::from_provider(3, ProviderError::Transport("timed out".to_string()));
        assert_eq!(
            e.to_string(),
            "history fetch failed on page 3: transport error: timed out"
        );
        assert!(e.is_retryable());
        assert!(std::error::Error::source(&e).is_some());
    }
}
