//! Typed settings extracted from the merged config tree.
//!
//! ```yaml
//! indexer:
//!   urls: ["https://chronik.example.org"]
//!   timeout_ms: 10000
//!   api_key_env: CHRONIK_API_KEY   # env var NAME, optional
//! reconcile:
//!   page_size: 200
//!   fetch_mode: concurrent         # sequential | concurrent
//!   max_in_flight: 4
//!   verify_snapshot: true
//! ```
//!
//! Missing keys take the defaults above (except `indexer.urls`, which is
//! required). Secret values never live in the YAML; `api_key_env` names the
//! environment variable holding the key, resolved by [`IndexerConfig::resolve_api_key`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use txs_reconcile::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_PAGE_SIZE};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    pub urls: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchModeSetting {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_fetch_mode")]
    pub fetch_mode: FetchModeSetting,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_true")]
    pub verify_snapshot: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_mode: default_fetch_mode(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            verify_snapshot: true,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_fetch_mode() -> FetchModeSetting {
    FetchModeSetting::Concurrent
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_true() -> bool {
    true
}

impl SyncConfig {
    /// Deserialize and validate. Only `/indexer` and `/reconcile` are read;
    /// other top-level sections are left to `report_unused_keys`.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let mut view = serde_json::Map::new();
        for key in ["indexer", "reconcile"] {
            if let Some(v) = config_json.get(key).filter(|v| !v.is_null()) {
                view.insert(key.to_string(), v.clone());
            }
        }
        if !view.contains_key("indexer") {
            bail!("CONFIG_MISSING: /indexer section is required");
        }

        let cfg: SyncConfig =
            serde_json::from_value(Value::Object(view)).context("invalid sync config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.indexer.urls.is_empty() {
            bail!("CONFIG_INVALID: /indexer/urls must list at least one url");
        }
        for (i, url) in self.indexer.urls.iter().enumerate() {
            let u = url.trim();
            if !(u.starts_with("http://") || u.starts_with("https://")) {
                bail!("CONFIG_INVALID: /indexer/urls/{i} must be an http(s) url, got '{u}'");
            }
        }
        if self.indexer.timeout_ms == 0 {
            bail!("CONFIG_INVALID: /indexer/timeout_ms must be > 0");
        }
        if self.reconcile.page_size == 0 {
            bail!("CONFIG_INVALID: /reconcile/page_size must be >= 1");
        }
        if self.reconcile.max_in_flight == 0 {
            bail!("CONFIG_INVALID: /reconcile/max_in_flight must be >= 1");
        }
        Ok(())
    }
}

impl IndexerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read the API key from the configured env var.
    ///
    /// `Ok(None)` when no env var is configured. A configured but unset var is
    /// an error naming the variable, never a value.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        let Some(name) = self.api_key_env.as_deref() else {
            return Ok(None);
        };
        match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => Ok(Some(v)),
            _ => bail!("SECRET_MISSING: env var {name} (from /indexer/api_key_env) is not set"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = SyncConfig::from_config_json(&json!({
            "indexer": { "urls": ["https://chronik.example"] }
        }))
        .unwrap();

        assert_eq!(cfg.indexer.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.reconcile, ReconcileConfig::default());
        assert_eq!(cfg.indexer.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn reconcile_defaults_match_library_defaults() {
        let lib = txs_reconcile::ReconcileOptions::default();
        let cfg = ReconcileConfig::default();
        assert_eq!(cfg.page_size, lib.page_size);
        assert_eq!(
            txs_reconcile::FetchMode::Concurrent {
                max_in_flight: cfg.max_in_flight
            },
            lib.fetch_mode
        );
        assert_eq!(cfg.verify_snapshot, lib.verify_snapshot);
    }

    #[test]
    fn other_sections_are_ignored() {
        let cfg = SyncConfig::from_config_json(&json!({
            "indexer": { "urls": ["http://localhost:7123"] },
            "notes": { "owner": "ops" }
        }));
        assert!(cfg.is_ok());
    }

    #[test]
    fn unknown_key_inside_section_is_rejected() {
        let err = SyncConfig::from_config_json(&json!({
            "indexer": { "urls": ["http://x"], "page": 3 }
        }))
        .unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }

    #[test]
    fn missing_indexer_is_rejected() {
        let err = SyncConfig::from_config_json(&json!({ "reconcile": {} })).unwrap_err();
        assert!(err.to_string().contains("CONFIG_MISSING"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = SyncConfig::from_config_json(&json!({
            "indexer": { "urls": ["http://x"] },
            "reconcile": { "page_size": 0 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = SyncConfig::from_config_json(&json!({
            "indexer": { "urls": ["ftp://x"] }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("/indexer/urls/0"));
    }

    #[test]
    fn api_key_absent_when_not_configured() {
        let cfg = IndexerConfig {
            urls: vec!["http://x".to_string()],
            timeout_ms: 1,
            api_key_env: None,
        };
        assert_eq!(cfg.resolve_api_key().unwrap(), None);
    }

    #[test]
    fn unset_api_key_env_names_the_variable() {
        let cfg = IndexerConfig {
            urls: vec!["http://x".to_string()],
            timeout_ms: 1,
            api_key_env: Some("TXS_TEST_SURELY_UNSET_KEY_VAR".to_string()),
        };
        let err = cfg.resolve_api_key().unwrap_err();
        assert!(err.to_string().contains("TXS_TEST_SURELY_UNSET_KEY_VAR"));
    }
}
