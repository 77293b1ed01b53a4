//! Command handlers for txsync.
//!
//! Config -> provider/options wiring lives here so `main` stays a thin
//! argument dispatcher.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use txs_config::{report_unused_keys, FetchModeSetting, SyncConfig, UnusedKeyPolicy};
use txs_history::{ChronikHistoryProvider, ScriptRef};
use txs_reconcile::{HistoryReconciler, ProcessedState, ReconcileOptions, Reconciliation};

pub struct ReconcileArgs {
    pub config_paths: Vec<String>,
    pub script: String,
    pub processed_height: Option<i32>,
    pub processed_count: u64,
    pub strict_config: bool,
}

/// Printed by `txsync reconcile`.
#[derive(Debug, Serialize)]
pub struct ReconcileOutput {
    pub config_hash: String,
    pub script: String,
    pub processed: ProcessedState,
    pub result: Reconciliation,
}

pub async fn run_reconcile(args: ReconcileArgs) -> Result<ReconcileOutput> {
    let identifier = parse_script(&args.script)?;

    let loaded = txs_config::load_layered_yaml(&args.config_paths)?;
    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "config key is not used");
    }

    let cfg = loaded.sync_config()?;
    let provider = build_provider(&cfg)?;
    let reconciler = HistoryReconciler::new(reconcile_options(&cfg))
        .context("invalid reconcile options")?;

    let processed = ProcessedState {
        processed_blockheight: args.processed_height,
        processed_tx_count: args.processed_count,
    };

    info!(
        config_hash = %loaded.config_hash,
        identifier = %identifier,
        "starting reconciliation"
    );
    let result = reconciler
        .reconcile(&identifier, processed, &provider)
        .await
        .with_context(|| format!("reconciliation failed for {identifier}"))?;

    Ok(ReconcileOutput {
        config_hash: loaded.config_hash,
        script: identifier.to_string(),
        processed,
        result,
    })
}

/// Parse a CLI `--script` string (`<type>:<payload hex>`).
pub fn parse_script(raw: &str) -> Result<ScriptRef> {
    raw.trim()
        .parse::<ScriptRef>()
        .map_err(|e| anyhow::anyhow!("invalid --script '{}': {}", raw.trim(), e))
}

pub fn build_provider(cfg: &SyncConfig) -> Result<ChronikHistoryProvider> {
    let mut provider = ChronikHistoryProvider::new(cfg.indexer.urls.clone(), cfg.indexer.timeout())
        .context("build indexer client failed")?;
    if let Some(key) = cfg.indexer.resolve_api_key()? {
        provider = provider.with_api_key(key);
    }
    Ok(provider)
}

pub fn reconcile_options(cfg: &SyncConfig) -> ReconcileOptions {
    let opts = ReconcileOptions::new(cfg.reconcile.page_size)
        .verify_snapshot(cfg.reconcile.verify_snapshot);
    match cfg.reconcile.fetch_mode {
        FetchModeSetting::Sequential => opts.sequential(),
        FetchModeSetting::Concurrent => opts.concurrent(cfg.reconcile.max_in_flight),
    }
}
