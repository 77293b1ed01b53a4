use serde::Serialize;
use txs_history::TxRecord;

/// Default page size when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Default concurrency for the insufficient-path page fetches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// What the caller has already processed. Owned by the caller, passed by value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedState {
    /// Height through which processing is complete. `None`: nothing processed yet.
    pub processed_blockheight: Option<i32>,
    /// Total number of transactions already processed.
    pub processed_tx_count: u64,
}

impl ProcessedState {
    pub fn new(processed_blockheight: i32, processed_tx_count: u64) -> Self {
        Self {
            processed_blockheight: Some(processed_blockheight),
            processed_tx_count,
        }
    }

    /// No prior processing.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Page budget computed on the insufficient path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FetchPlan {
    /// `page_size * num_pages`: upper bound on remote transactions.
    pub max_txs: u64,
    /// `max_txs - processed_tx_count`, saturating at zero.
    pub max_unprocessed_tx_count: u64,
    /// Smallest page count covering `max_unprocessed_tx_count`.
    pub num_pages_to_fetch: u32,
}

impl FetchPlan {
    /// Last page number that will actually be requested.
    ///
    /// Never beyond the provider's `num_pages`, never below page 1.
    pub fn last_page(&self, num_pages: u32) -> u32 {
        self.num_pages_to_fetch.min(num_pages).max(1)
    }
}

/// Result of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Page 1 already reaches back to processed history; nothing else fetched.
    Sufficient { unprocessed_txs: Vec<TxRecord> },
    /// Additional pages were needed.
    Insufficient {
        max_txs: u64,
        max_unprocessed_tx_count: u64,
        num_pages_to_fetch: u32,
        unprocessed_txs: Vec<TxRecord>,
    },
}

impl Reconciliation {
    pub(crate) fn insufficient(plan: FetchPlan, unprocessed_txs: Vec<TxRecord>) -> Self {
        Reconciliation::Insufficient {
            max_txs: plan.max_txs,
            max_unprocessed_tx_count: plan.max_unprocessed_tx_count,
            num_pages_to_fetch: plan.num_pages_to_fetch,
            unprocessed_txs,
        }
    }

    pub fn already_have_all_potentially_unprocessed_txs(&self) -> bool {
        matches!(self, Reconciliation::Sufficient { .. })
    }

    /// Fetch-plan diagnostics; `None` on the sufficient path (not applicable).
    pub fn diagnostics(&self) -> Option<FetchPlan> {
        match self {
            Reconciliation::Sufficient { .. } => None,
            Reconciliation::Insufficient {
                max_txs,
                max_unprocessed_tx_count,
                num_pages_to_fetch,
                ..
            } => Some(FetchPlan {
                max_txs: *max_txs,
                max_unprocessed_tx_count: *max_unprocessed_tx_count,
                num_pages_to_fetch: *num_pages_to_fetch,
            }),
        }
    }

    pub fn unprocessed_txs(&self) -> &[TxRecord] {
        match self {
            Reconciliation::Sufficient { unprocessed_txs }
            | Reconciliation::Insufficient {
                unprocessed_txs, ..
            } => unprocessed_txs,
        }
    }

    pub fn into_unprocessed_txs(self) -> Vec<TxRecord> {
        match self {
            Reconciliation::Sufficient { unprocessed_txs }
            | Reconciliation::Insufficient {
                unprocessed_txs, ..
            } => unprocessed_txs,
        }
    }
}

/// How the insufficient path requests pages 2..N.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    Sequential,
    /// Up to `max_in_flight` requests outstanding; results still join in page order.
    Concurrent { max_in_flight: usize },
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Concurrent {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub page_size: u32,
    pub fetch_mode: FetchMode,
    /// Fail with `NonStationaryHistory` when pages disagree on `num_pages` / tip.
    pub verify_snapshot: bool,
}

impl ReconcileOptions {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn sequential(mut self) -> Self {
        self.fetch_mode = FetchMode::Sequential;
        self
    }

    pub fn concurrent(mut self, max_in_flight: usize) -> Self {
        self.fetch_mode = FetchMode::Concurrent { max_in_flight };
        self
    }

    pub fn verify_snapshot(mut self, on: bool) -> Self {
        self.verify_snapshot = on;
        self
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_mode: FetchMode::default(),
            verify_snapshot: true,
        }
    }
}
