use platform_host::{RealtimeCallback, RealtimeQuery, RealtimeSubscription};
use serde_json::Value;

use super::interop;

pub(crate) fn init(config: &Value) -> Result<(), String> {
    interop::realtime_init(config)
}

pub(crate) fn subscribe(
    path: &str,
    query: Option<&RealtimeQuery>,
    callback: RealtimeCallback,
) -> Result<RealtimeSubscription, String> {
    interop::realtime_subscribe(path, query, callback)
}

pub(crate) async fn get(path: &str) -> Result<Option<Value>, String> {
    interop::realtime_get(path).await
}

pub(crate) fn set(path: &str, value: &Value) -> Result<(), String> {
    interop::realtime_set(path, value)
}

pub(crate) fn push(path: &str, value: &Value) -> Result<String, String> {
    interop::realtime_push(path, value)
}

pub(crate) fn remove(path: &str) -> Result<(), String> {
    interop::realtime_remove(path)
}

pub(crate) fn remove_on_disconnect(path: &str) -> Result<(), String> {
    interop::realtime_remove_on_disconnect(path)
}
