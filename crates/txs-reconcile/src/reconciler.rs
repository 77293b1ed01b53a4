//! Async reconciliation driver.
//!
//! Fetches page 1, decides whether it suffices, and if not fetches the
//! worst-case number of further pages before trimming to the unprocessed
//! prefix. All state is local to one call; a single `HistoryReconciler` may
//! serve any number of concurrent passes.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};
use txs_history::{HistoryPage, HistoryProvider, ScriptRef};

use crate::engine::{first_page_is_sufficient, plan_fetch, trim_unprocessed, OrderCursor};
use crate::guard::SnapshotGuard;
use crate::{FetchMode, ProcessedState, ReconcileError, ReconcileOptions, Reconciliation};

#[derive(Clone, Debug)]
pub struct HistoryReconciler {
    opts: ReconcileOptions,
}

impl HistoryReconciler {
    pub fn new(opts: ReconcileOptions) -> Result<Self, ReconcileError> {
        if opts.page_size == 0 {
            return Err(ReconcileError::InvalidOptions(
                "page_size must be >= 1".to_string(),
            ));
        }
        if let FetchMode::Concurrent { max_in_flight: 0 } = opts.fetch_mode {
            return Err(ReconcileError::InvalidOptions(
                "max_in_flight must be >= 1".to_string(),
            ));
        }
        Ok(Self { opts })
    }

    /// Determine which of `identifier`'s remote transactions are unprocessed.
    pub async fn reconcile(
        &self,
        identifier: &ScriptRef,
        processed: ProcessedState,
        provider: &dyn HistoryProvider,
    ) -> Result<Reconciliation, ReconcileError> {
        let page_size = self.opts.page_size;

        let first = fetch_page(provider, identifier, 1, page_size).await?;
        let mut cursor = OrderCursor::new();
        cursor.check_page(1, &first.txs)?;

        if first_page_is_sufficient(&first, &processed) {
            let unprocessed_txs = trim_unprocessed(first.txs, processed.processed_blockheight);
            info!(
                %identifier,
                provider = provider.name(),
                num_pages = first.num_pages,
                unprocessed = unprocessed_txs.len(),
                path = "sufficient",
                "history reconciled"
            );
            return Ok(Reconciliation::Sufficient { unprocessed_txs });
        }

        let plan = plan_fetch(page_size, first.num_pages, processed.processed_tx_count);
        let last_page = plan.last_page(first.num_pages);
        debug!(
            %identifier,
            max_txs = plan.max_txs,
            max_unprocessed = plan.max_unprocessed_tx_count,
            num_pages_to_fetch = plan.num_pages_to_fetch,
            last_page,
            "first page insufficient"
        );

        let guard = self
            .opts
            .verify_snapshot
            .then(|| SnapshotGuard::from_first_page(&first));

        let num_pages = first.num_pages;
        let mut all = first.txs;
        for (page_number, page) in self
            .fetch_remaining(provider, identifier, last_page, guard.as_ref())
            .await?
        {
            cursor.check_page(page_number, &page.txs)?;
            all.extend(page.txs);
        }

        let unprocessed_txs = trim_unprocessed(all, processed.processed_blockheight);
        info!(
            %identifier,
            provider = provider.name(),
            num_pages,
            pages_fetched = last_page,
            unprocessed = unprocessed_txs.len(),
            path = "insufficient",
            "history reconciled"
        );
        Ok(Reconciliation::insufficient(plan, unprocessed_txs))
    }

    /// Pages `2..=last_page`, returned in page order.
    async fn fetch_remaining(
        &self,
        provider: &dyn HistoryProvider,
        identifier: &ScriptRef,
        last_page: u32,
        guard: Option<&SnapshotGuard>,
    ) -> Result<Vec<(u32, HistoryPage)>, ReconcileError> {
        let page_size = self.opts.page_size;
        let check = |page_number: u32, page: &HistoryPage| -> Result<(), ReconcileError> {
            match guard {
                Some(g) => g.check(page_number, page).inspect_err(|e| {
                    warn!(%identifier, error = %e, "history snapshot moved mid-reconciliation");
                }),
                None => Ok(()),
            }
        };

        match self.opts.fetch_mode {
            FetchMode::Sequential => {
                let mut out = Vec::with_capacity(last_page.saturating_sub(1) as usize);
                for page_number in 2..=last_page {
                    let page = fetch_page(provider, identifier, page_number, page_size).await?;
                    check(page_number, &page)?;
                    out.push((page_number, page));
                }
                Ok(out)
            }
            FetchMode::Concurrent { max_in_flight } => {
                // `buffered` yields in input order, so the join is already page-ordered.
                let out: Vec<(u32, HistoryPage)> = stream::iter(2..=last_page)
                    .map(|page_number| async move {
                        fetch_page(provider, identifier, page_number, page_size)
                            .await
                            .map(|page| (page_number, page))
                    })
                    .buffered(max_in_flight)
                    .try_collect()
                    .await?;
                for (page_number, page) in &out {
                    check(*page_number, page)?;
                }
                Ok(out)
            }
        }
    }
}

async fn fetch_page(
    provider: &dyn HistoryProvider,
    identifier: &ScriptRef,
    page: u32,
    page_size: u32,
) -> Result<HistoryPage, ReconcileError> {
    debug!(%identifier, page, page_size, provider = provider.name(), "requesting history page");
    provider
        .fetch_page(identifier, page, page_size)
        .await
        .map_err(|e| ReconcileError::from_provider(page, e))
}

/// One reconciliation pass with default options and the given page size.
pub async fn get_unprocessed_tx_history(
    identifier: &ScriptRef,
    processed: ProcessedState,
    provider: &dyn HistoryProvider,
    page_size: u32,
) -> Result<Reconciliation, ReconcileError> {
    HistoryReconciler::new(ReconcileOptions::new(page_size))?
        .reconcile(identifier, processed, provider)
        .await
}
