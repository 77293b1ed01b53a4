//! Snapshot consistency guard
//!
//! # Purpose
//!
//! One reconciliation pass reads several pages. If transactions arrive (or a
//! block connects) between those reads, the pages are windows over different
//! histories and the concatenation is meaningless. This guard pins the
//! snapshot seen on page 1 and rejects any later page served from another one.
//!
//! # Invariants
//!
//! - The mark is taken once, from page 1, and never moves.
//! - `num_pages` must match the mark on every page.
//! - The tip must match when both the mark and the page carry one; a page
//!   without a tip is checked on `num_pages` only.

use txs_history::{ChainTip, HistoryPage};

use crate::ReconcileError;

/// Snapshot identity taken from page 1.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SnapshotMark {
    num_pages: u32,
    tip: Option<ChainTip>,
}

#[derive(Clone, Debug)]
pub struct SnapshotGuard {
    mark: SnapshotMark,
}

impl SnapshotGuard {
    pub fn from_first_page(page: &HistoryPage) -> Self {
        Self {
            mark: SnapshotMark {
                num_pages: page.num_pages,
                tip: page.tip.clone(),
            },
        }
    }

    /// Check page `page_number` against the mark.
    pub fn check(&self, page_number: u32, page: &HistoryPage) -> Result<(), ReconcileError> {
        if page.num_pages != self.mark.num_pages {
            return Err(ReconcileError::NonStationaryHistory {
                page: page_number,
                expected: format!("num_pages={}", self.mark.num_pages),
                got: format!("num_pages={}", page.num_pages),
            });
        }
        if let (Some(want), Some(got)) = (&self.mark.tip, &page.tip) {
            if want != got {
                return Err(ReconcileError::NonStationaryHistory {
                    page: page_number,
                    expected: format!("tip={}@{}", want.hash, want.height),
                    got: format!("tip={}@{}", got.hash, got.height),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txs_history::TxRecord;

    fn tip(h: &str, height: i32) -> ChainTip {
        ChainTip {
            hash: h.to_string(),
            height,
        }
    }

    fn page(num_pages: u32, tip: Option<ChainTip>) -> HistoryPage {
        HistoryPage {
            txs: vec![TxRecord::confirmed("a", 1)],
            num_pages,
            tip,
        }
    }

    #[test]
    fn same_snapshot_passes() {
        let g = SnapshotGuard::from_first_page(&page(3, Some(tip("aa", 9))));
        assert!(g.check(2, &page(3, Some(tip("aa", 9)))).is_ok());
    }

    #[test]
    fn num_pages_drift_is_rejected() {
        let g = SnapshotGuard::from_first_page(&page(3, None));
        let err = g.check(3, &page(4, None)).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::NonStationaryHistory {
                page: 3,
                expected: "num_pages=3".to_string(),
                got: "num_pages=4".to_string(),
            }
        );
    }

    #[test]
    fn tip_drift_is_rejected() {
        let g = SnapshotGuard::from_first_page(&page(3, Some(tip("aa", 9))));
        assert!(g.check(2, &page(3, Some(tip("bb", 10)))).is_err());
    }

    #[test]
    fn missing_tip_on_either_side_checks_num_pages_only() {
        let g = SnapshotGuard::from_first_page(&page(3, None));
        assert!(g.check(2, &page(3, Some(tip("bb", 10)))).is_ok());

        let g = SnapshotGuard::from_first_page(&page(3, Some(tip("aa", 9))));
        assert!(g.check(2, &page(3, None)).is_ok());
    }
}
