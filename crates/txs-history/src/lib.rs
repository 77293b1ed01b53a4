//! txs-history
//!
//! Transaction-history boundary for indexer-backed reconciliation.
//!
//! This crate owns the history data model, the provider abstraction and the
//! concrete providers (HTTP indexer client, in-memory fixture provider).
//! It does **not** decide what is unprocessed; that lives in `txs-reconcile`.

pub mod chronik;
pub mod memory;
pub mod provider;
pub mod script;
pub mod types;

pub use chronik::ChronikHistoryProvider;
pub use memory::MemoryHistoryProvider;
pub use provider::{HistoryProvider, ProviderError};
pub use script::{ScriptRef, ScriptType};
pub use types::{BlockMeta, ChainTip, HistoryPage, TxRecord};
