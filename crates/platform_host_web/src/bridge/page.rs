use serde_json::Value;

/// Returns the `window.firebaseConfig` object, if the page defines one.
pub(crate) fn runtime_backend_config() -> Option<Value> {
    super::interop::runtime_backend_config()
}
