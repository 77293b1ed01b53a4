//! txs-reconcile
//!
//! History reconciliation: decide which transactions visible to a paginated
//! history provider have not yet been processed locally, fetching only as
//! many pages as needed.
//!
//! - `engine`: pure decision logic (sufficiency, fetch plan, trimming). No IO.
//! - `guard`: snapshot consistency across the pages of one pass.
//! - `reconciler`: async driver that talks to a `HistoryProvider`.
//!
//! Nothing here persists state; the caller applies `unprocessed_txs` and
//! records its new processed state.

mod engine;
mod error;
mod guard;
mod reconciler;
mod types;

pub use engine::{first_page_is_sufficient, plan_fetch, trim_unprocessed, OrderCursor};
pub use error::ReconcileError;
pub use guard::SnapshotGuard;
pub use reconciler::{get_unprocessed_tx_history, HistoryReconciler};
pub use types::*;
