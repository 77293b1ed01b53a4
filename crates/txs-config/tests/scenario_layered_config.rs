//! Scenario: Layered config load, hash and typed settings
//!
//! # Invariants under test
//!
//! 1. Later documents override earlier ones (deep merge).
//! 2. The config hash is stable for the same effective config, regardless of
//!    key order in the source YAML, and changes when a value changes.
//! 3. Secret-looking literals abort loading with CONFIG_SECRET_DETECTED.
//! 4. Typed settings come out of the merged tree.
//! 5. Unused keys are reported (Warn) or rejected (Fail).
//! 6. Files on disk load the same as in-memory strings.

use std::io::Write;

use txs_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, FetchModeSetting,
    UnusedKeyPolicy,
};

const BASE: &str = r#"
indexer:
  urls: ["https://chronik.example.org"]
  timeout_ms: 5000
reconcile:
  page_size: 200
  fetch_mode: concurrent
"#;

const OVERRIDE: &str = r#"
reconcile:
  page_size: 25
  fetch_mode: sequential
"#;

#[test]
fn later_documents_override_earlier() {
    let loaded = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
    let cfg = loaded.sync_config().unwrap();

    assert_eq!(cfg.reconcile.page_size, 25);
    assert_eq!(cfg.reconcile.fetch_mode, FetchModeSetting::Sequential);
    // untouched by the override
    assert_eq!(cfg.indexer.timeout_ms, 5000);
    assert_eq!(cfg.indexer.urls, vec!["https://chronik.example.org".to_string()]);
}

#[test]
fn hash_is_stable_across_key_order() {
    let a = r#"
indexer: { urls: ["http://a"], timeout_ms: 1 }
reconcile: { page_size: 10 }
"#;
    let b = r#"
reconcile: { page_size: 10 }
indexer: { timeout_ms: 1, urls: ["http://a"] }
"#;
    let ha = load_layered_yaml_from_strings(&[a]).unwrap().config_hash;
    let hb = load_layered_yaml_from_strings(&[b]).unwrap().config_hash;
    assert_eq!(ha, hb);
    assert_eq!(ha.len(), 64);
}

#[test]
fn hash_changes_when_value_changes() {
    let h1 = load_layered_yaml_from_strings(&[BASE]).unwrap().config_hash;
    let h2 = load_layered_yaml_from_strings(&[BASE, OVERRIDE])
        .unwrap()
        .config_hash;
    assert_ne!(h1, h2);
}

#[test]
fn secret_literal_is_rejected() {
    let yaml = r#"
indexer:
  urls: ["http://a"]
  api_key_env: "sk-live-abcdef0123456789"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_SECRET_DETECTED"));
    assert!(msg.contains("/indexer/api_key_env"));
    assert!(!msg.contains("abcdef0123456789"), "secret value must not leak");
}

#[test]
fn unused_keys_warn_and_fail() {
    let yaml = r#"
indexer:
  urls: ["http://a"]
legacy:
  poll_secs: 30
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/legacy/poll_secs".to_string()]);

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));

    let clean = load_layered_yaml_from_strings(&[BASE]).unwrap();
    assert!(report_unused_keys(&clean.config_json, UnusedKeyPolicy::Fail)
        .unwrap()
        .is_clean());
}

#[test]
fn files_load_like_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("override.yaml");
    std::fs::File::create(&base)
        .unwrap()
        .write_all(BASE.as_bytes())
        .unwrap();
    std::fs::File::create(&over)
        .unwrap()
        .write_all(OVERRIDE.as_bytes())
        .unwrap();

    let from_files = load_layered_yaml(&[&base, &over]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);

    let missing = dir.path().join("nope.yaml");
    assert!(load_layered_yaml(&[missing]).is_err());
}
