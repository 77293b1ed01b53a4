//! In-memory history provider.
//!
//! Serves pages out of a fixed newest-first transaction list. Used by tests
//! and dry runs; supports fault injection (per-page failure, per-page
//! `num_pages` / tip overrides) and records which pages were requested.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::provider::{HistoryProvider, ProviderError};
use crate::script::ScriptRef;
use crate::types::{ChainTip, HistoryPage, TxRecord};

#[derive(Debug, Default)]
pub struct MemoryHistoryProvider {
    /// Full history, newest-first.
    txs: Vec<TxRecord>,
    tip: Option<ChainTip>,
    failures: BTreeMap<u32, ProviderError>,
    num_pages_overrides: BTreeMap<u32, u32>,
    tip_overrides: BTreeMap<u32, ChainTip>,
    fetched: Mutex<Vec<u32>>,
}

impl MemoryHistoryProvider {
    pub fn new(txs: Vec<TxRecord>) -> Self {
        Self {
            txs,
            ..Self::default()
        }
    }

    pub fn with_tip(mut self, tip: ChainTip) -> Self {
        self.tip = Some(tip);
        self
    }

    /// Fail every request for `page` with `err`.
    pub fn fail_page(mut self, page: u32, err: ProviderError) -> Self {
        self.failures.insert(page, err);
        self
    }

    /// Report `num_pages` instead of the computed total when serving `page`.
    pub fn override_num_pages(mut self, page: u32, num_pages: u32) -> Self {
        self.num_pages_overrides.insert(page, num_pages);
        self
    }

    /// Report `tip` instead of the configured tip when serving `page`.
    pub fn override_tip(mut self, page: u32, tip: ChainTip) -> Self {
        self.tip_overrides.insert(page, tip);
        self
    }

    pub fn txs(&self) -> &[TxRecord] {
        &self.txs
    }

    /// Pages requested so far, in request order.
    pub fn fetched_pages(&self) -> Vec<u32> {
        self.fetched
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HistoryProvider for MemoryHistoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_page(
        &self,
        _identifier: &ScriptRef,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage, ProviderError> {
        if let Ok(mut g) = self.fetched.lock() {
            g.push(page);
        }

        if page == 0 || page_size == 0 {
            return Err(ProviderError::Config(format!(
                "invalid page request page={page} page_size={page_size}"
            )));
        }
        if let Some(err) = self.failures.get(&page) {
            return Err(err.clone());
        }

        let size = page_size as usize;
        let computed_pages = self.txs.len().div_ceil(size) as u32;
        let start = (page as usize - 1).saturating_mul(size).min(self.txs.len());
        let end = start.saturating_add(size).min(self.txs.len());

        Ok(HistoryPage {
            txs: self.txs[start..end].to_vec(),
            num_pages: self
                .num_pages_overrides
                .get(&page)
                .copied()
                .unwrap_or(computed_pages),
            tip: self
                .tip_overrides
                .get(&page)
                .cloned()
                .or_else(|| self.tip.clone()),
        })
    }
}
