//! Firebase Realtime Database implementation of [`RealtimeStore`].
//!
//! The page loads the Firebase compat SDK; this adapter initializes it from a resolved
//! [`BackendConfig`] and forwards every call through the JS bridge. Listener callbacks are
//! deferred to a microtask, so a write made inside a callback is observed after that callback
//! returns. Write failures are reported asynchronously on the browser console.

use platform_host::{
    BackendConfig, RealtimeCallback, RealtimeFuture, RealtimeQuery, RealtimeStatus, RealtimeStore,
    RealtimeSubscription,
};
use serde_json::Value;

use crate::bridge::realtime as bridge;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Realtime store backed by the page-loaded Firebase SDK.
pub struct FirebaseRealtimeStore {
    status: RealtimeStatus,
}

impl FirebaseRealtimeStore {
    /// Initializes the SDK with `config`. Initialization failures leave the store unavailable.
    pub fn connect(config: &BackendConfig) -> Self {
        let result = serde_json::to_value(config)
            .map_err(|e| e.to_string())
            .and_then(|config| bridge::init(&config));
        let status = match result {
            Ok(()) => RealtimeStatus::Available,
            Err(reason) => RealtimeStatus::Unavailable {
                reason: format!("realtime backend could not be initialized: {reason}"),
            },
        };
        Self { status }
    }

    fn ensure_available(&self) -> Result<(), String> {
        self.status.ensure_available()
    }
}

impl RealtimeStore for FirebaseRealtimeStore {
    fn status(&self) -> RealtimeStatus {
        self.status.clone()
    }

    fn subscribe(
        &self,
        path: &str,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        self.ensure_available()?;
        bridge::subscribe(path, None, callback)
    }

    fn subscribe_query(
        &self,
        path: &str,
        query: RealtimeQuery,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        self.ensure_available()?;
        bridge::subscribe(path, Some(&query), callback)
    }

    fn get<'a>(&'a self, path: &'a str) -> RealtimeFuture<'a, Result<Option<Value>, String>> {
        Box::pin(async move {
            self.ensure_available()?;
            bridge::get(path).await
        })
    }

    fn write(&self, path: &str, value: Value) -> Result<(), String> {
        self.ensure_available()?;
        bridge::set(path, &value)
    }

    fn push(&self, path: &str, value: Value) -> Result<String, String> {
        self.ensure_available()?;
        bridge::push(path, &value)
    }

    fn remove(&self, path: &str) -> Result<(), String> {
        self.ensure_available()?;
        bridge::remove(path)
    }

    fn remove_on_disconnect(&self, path: &str) -> Result<(), String> {
        self.ensure_available()?;
        bridge::remove_on_disconnect(path)
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            api_key: "key".to_string(),
            auth_domain: "multixp.firebaseapp.com".to_string(),
            database_url: "https://multixp-default-rtdb.firebaseio.com".to_string(),
            project_id: "multixp".to_string(),
            storage_bucket: "multixp.appspot.com".to_string(),
            messaging_sender_id: "123".to_string(),
            app_id: "1:123:web:abc".to_string(),
        }
    }

    #[test]
    fn native_builds_report_the_backend_unavailable() {
        let store = FirebaseRealtimeStore::connect(&config());
        assert!(!store.status().is_available());
        assert!(store.write("desktop/iconSize", json!("large")).is_err());
        assert!(store
            .subscribe("desktop/programs", std::rc::Rc::new(|_: Option<Value>| {}))
            .is_err());
        assert!(block_on(store.get("desktop")).is_err());
    }
}
