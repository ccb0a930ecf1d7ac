use super::*;

fn unsupported() -> String {
    "Firebase realtime database is only available when compiled for wasm32".to_string()
}

pub fn runtime_backend_config() -> Option<Value> {
    None
}

pub fn realtime_init(_config: &Value) -> Result<(), String> {
    Err(unsupported())
}

pub fn realtime_subscribe(
    _path: &str,
    _query: Option<&RealtimeQuery>,
    _callback: RealtimeCallback,
) -> Result<RealtimeSubscription, String> {
    Err(unsupported())
}

pub async fn realtime_get(_path: &str) -> Result<Option<Value>, String> {
    Err(unsupported())
}

pub fn realtime_set(_path: &str, _value: &Value) -> Result<(), String> {
    Err(unsupported())
}

pub fn realtime_push(_path: &str, _value: &Value) -> Result<String, String> {
    Err(unsupported())
}

pub fn realtime_remove(_path: &str) -> Result<(), String> {
    Err(unsupported())
}

pub fn realtime_remove_on_disconnect(_path: &str) -> Result<(), String> {
    Err(unsupported())
}
