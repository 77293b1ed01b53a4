//! Pure reconciliation decisions. No IO, no clock.

use txs_history::{HistoryPage, TxRecord};

use crate::{FetchPlan, ProcessedState, ReconcileError};

/// Does page 1 alone already contain every potentially unprocessed tx?
///
/// - empty page: yes, there is nothing to reconcile
/// - oldest tx unconfirmed: no, it has no height to compare
/// - nothing processed yet: only when page 1 is the whole history
/// - otherwise: oldest height <= processed height
pub fn first_page_is_sufficient(first: &HistoryPage, processed: &ProcessedState) -> bool {
    let Some(oldest) = first.oldest() else {
        return true;
    };
    let Some(oldest_height) = oldest.height() else {
        return false;
    };
    match processed.processed_blockheight {
        None => first.num_pages <= 1,
        Some(processed_height) => oldest_height <= processed_height,
    }
}

/// Worst-case page budget for the insufficient path.
///
/// `num_pages_to_fetch` is the minimal integer with
/// `page_size * num_pages_to_fetch >= max_unprocessed_tx_count`.
pub fn plan_fetch(page_size: u32, num_pages: u32, processed_tx_count: u64) -> FetchPlan {
    let page_size = u64::from(page_size.max(1));
    let max_txs = page_size * u64::from(num_pages);
    let max_unprocessed_tx_count = max_txs.saturating_sub(processed_tx_count);
    let num_pages_to_fetch =
        u32::try_from(max_unprocessed_tx_count.div_ceil(page_size)).unwrap_or(u32::MAX);
    FetchPlan {
        max_txs,
        max_unprocessed_tx_count,
        num_pages_to_fetch,
    }
}

/// Leading newest-first run of txs that are unconfirmed or above the
/// processed height. With no processed height every tx is kept.
pub fn trim_unprocessed(txs: Vec<TxRecord>, processed_blockheight: Option<i32>) -> Vec<TxRecord> {
    let Some(boundary) = processed_blockheight else {
        return txs;
    };
    let keep = txs
        .iter()
        .take_while(|tx| tx.height().map_or(true, |h| h > boundary))
        .count();
    let mut txs = txs;
    txs.truncate(keep);
    txs
}

/// Walks a newest-first sequence and rejects order violations:
/// an unconfirmed tx after a confirmed one, or a height above its predecessor.
///
/// Carries state across pages so each page can be checked as it arrives.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderCursor {
    last_height: Option<i32>,
}

impl OrderCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_page(&mut self, page: u32, txs: &[TxRecord]) -> Result<(), ReconcileError> {
        for tx in txs {
            let reason = match (self.last_height, tx.height()) {
                (Some(prev), None) => Some(format!(
                    "unconfirmed tx listed after confirmed height {prev}"
                )),
                (Some(prev), Some(h)) if h > prev => {
                    Some(format!("height {h} listed after older height {prev}"))
                }
                _ => None,
            };
            if let Some(reason) = reason {
                return Err(ReconcileError::MalformedHistoryRecord {
                    page,
                    txid: Some(tx.txid.clone()),
                    reason,
                });
            }
            if let Some(h) = tx.height() {
                self.last_height = Some(h);
            }
        }
        Ok(())
    }
}
