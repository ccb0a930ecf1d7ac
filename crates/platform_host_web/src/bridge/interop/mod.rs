//! Shared transport interop for browser bridge domains.
//!
//! This module routes calls to target-specific implementations while preserving a uniform API
//! for higher-level bridge domain modules.

use platform_host::{RealtimeCallback, RealtimeQuery, RealtimeSubscription};
use serde_json::Value;

#[cfg(not(target_arch = "wasm32"))]
mod non_wasm;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
use non_wasm as imp;
#[cfg(target_arch = "wasm32")]
use wasm as imp;

pub fn runtime_backend_config() -> Option<Value> {
    imp::runtime_backend_config()
}

pub fn realtime_init(config: &Value) -> Result<(), String> {
    imp::realtime_init(config)
}

pub fn realtime_subscribe(
    path: &str,
    query: Option<&RealtimeQuery>,
    callback: RealtimeCallback,
) -> Result<RealtimeSubscription, String> {
    imp::realtime_subscribe(path, query, callback)
}

pub async fn realtime_get(path: &str) -> Result<Option<Value>, String> {
    imp::realtime_get(path).await
}

pub fn realtime_set(path: &str, value: &Value) -> Result<(), String> {
    imp::realtime_set(path, value)
}

pub fn realtime_push(path: &str, value: &Value) -> Result<String, String> {
    imp::realtime_push(path, value)
}

pub fn realtime_remove(path: &str) -> Result<(), String> {
    imp::realtime_remove(path)
}

pub fn realtime_remove_on_disconnect(path: &str) -> Result<(), String> {
    imp::realtime_remove_on_disconnect(path)
}
