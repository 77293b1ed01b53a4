//! Scenario: No prior processing
//!
//! # Invariants under test
//!
//! 1. No processed height and a single remote page => `Sufficient`, every
//!    tx returned.
//! 2. No processed height and several pages => insufficient path, every
//!    page fetched, every tx returned in remote order.
//! 3. No processed height, a single page whose oldest tx is unconfirmed
//!    => still the insufficient path with a populated fetch plan.
//!
//! All tests are pure in-process; no network required.

use txs_history::{MemoryHistoryProvider, ScriptRef, TxRecord};
use txs_reconcile::{get_unprocessed_tx_history, FetchPlan, ProcessedState};

const PAGE_SIZE: u32 = 10;

fn script() -> ScriptRef {
    ScriptRef::p2pkh([0x44; 20])
}

fn history(n: usize) -> Vec<TxRecord> {
    let mut txs = vec![TxRecord::unconfirmed("pending")];
    txs.extend((1..n).map(|i| TxRecord::confirmed(format!("tx{i}"), 10_000 - i as i32)));
    txs
}

#[tokio::test]
async fn single_page_history_is_sufficient() {
    let provider = MemoryHistoryProvider::new(history(7));

    let r = get_unprocessed_tx_history(&script(), ProcessedState::none(), &provider, PAGE_SIZE)
        .await
        .unwrap();

    assert!(r.already_have_all_potentially_unprocessed_txs());
    assert_eq!(r.unprocessed_txs(), provider.txs());
}

#[tokio::test]
async fn multi_page_history_fetches_everything() {
    let provider = MemoryHistoryProvider::new(history(23));

    let r = get_unprocessed_tx_history(&script(), ProcessedState::none(), &provider, PAGE_SIZE)
        .await
        .unwrap();

    assert!(!r.already_have_all_potentially_unprocessed_txs());
    let plan = r.diagnostics().unwrap();
    assert_eq!(plan.max_txs, 30);
    assert_eq!(plan.num_pages_to_fetch, 3);

    let mut pages = provider.fetched_pages();
    pages.sort_unstable();
    assert_eq!(pages, vec![1, 2, 3]);
    assert_eq!(r.unprocessed_txs(), provider.txs());
}

#[tokio::test]
async fn all_pending_single_page_still_plans() {
    let provider = MemoryHistoryProvider::new(
        (0..3)
            .map(|i| TxRecord::unconfirmed(format!("mempool{i}")))
            .collect(),
    );

    let r = get_unprocessed_tx_history(&script(), ProcessedState::none(), &provider, PAGE_SIZE)
        .await
        .unwrap();

    assert!(!r.already_have_all_potentially_unprocessed_txs());
    assert_eq!(
        r.diagnostics(),
        Some(FetchPlan {
            max_txs: 10,
            max_unprocessed_tx_count: 10,
            num_pages_to_fetch: 1,
        })
    );
    assert_eq!(provider.fetched_pages(), vec![1]);
    assert_eq!(r.unprocessed_txs(), provider.txs());
}
