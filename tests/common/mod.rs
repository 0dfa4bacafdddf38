//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use reelsource::{FetchOptions, ResilientFetcher, Settings};

/// A 40-char hash made of one repeated hex digit.
pub fn hash(c: char) -> String {
    c.to_string().repeat(40)
}

/// One addon stream entry.
pub fn addon_stream(hash: &str, title: &str) -> Value {
    json!({ "name": "Test", "title": title, "infoHash": hash })
}

pub fn streams_body(entries: Vec<Value>) -> Value {
    json!({ "streams": entries })
}

pub fn manifest(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "version": "1.0.0",
        "types": ["movie", "series"],
        "resources": ["stream"],
        "idPrefixes": ["tt"],
        "catalogs": []
    })
}

/// Options with short timeouts and no backoff wait worth noticing.
pub fn fast_options() -> FetchOptions {
    FetchOptions::default()
        .with_attempt_timeout(Duration::from_secs(2))
        .with_backoff_base(Duration::from_millis(5))
}

pub fn fetcher() -> Arc<ResilientFetcher> {
    Arc::new(ResilientFetcher::new().expect("client builds"))
}

/// Settings pointing every built-in endpoint at `base`, single attempt per call.
pub fn settings_for(base: &str) -> Settings {
    Settings {
        debrid_token: Some("tok".to_string()),
        debrid_url: base.to_string(),
        aggregator_url: base.to_string(),
        aggregator_token_key: "torbox".to_string(),
        dmm_url: base.to_string(),
        attempt_timeout_secs: 2,
        direct_retries: 0,
        aggregator_timeout_secs: 5,
        dmm_timeout_secs: 5,
        provider_timeout_secs: 5,
        debrid_timeout_secs: 5,
        ..Settings::default()
    }
}
