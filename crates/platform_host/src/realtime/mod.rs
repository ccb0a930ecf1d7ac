//! Realtime key-value store contracts shared by the sync runtime and backend adapters.
//!
//! A [`RealtimeStore`] exposes one replicated JSON tree addressed by `/`-separated paths with
//! last-write-wins semantics per path. Subscriptions fire once with the current value and then on
//! every change at, above, or below their path. Writes are fire-and-forget: the returned `Result`
//! only reports whether the write was accepted for delivery, never whether it won a race.

pub mod memory;
pub mod path;

use std::{fmt, future::Future, pin::Pin, rc::Rc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Object-safe boxed future used by [`RealtimeStore`] async methods.
pub type RealtimeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Listener invoked with the current value at a subscribed path (`None` when absent).
pub type RealtimeCallback = Rc<dyn Fn(Option<Value>)>;

/// Connection state reported by a realtime backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeStatus {
    /// The backend is reachable and accepts reads and writes.
    Available,
    /// The backend could not be initialized or has been disconnected.
    Unavailable {
        /// Human-readable cause surfaced on the fatal error screen.
        reason: String,
    },
}

impl RealtimeStatus {
    /// Returns whether reads and writes may proceed.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Converts the status into a `Result`, carrying the unavailability reason as the error.
    ///
    /// # Errors
    ///
    /// Returns the reason when the backend is unavailable.
    pub fn ensure_available(&self) -> Result<(), String> {
        match self {
            Self::Available => Ok(()),
            Self::Unavailable { reason } => Err(reason.clone()),
        }
    }
}

/// Bounded top-N query over the children of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeQuery {
    /// Child field used for ordering.
    pub order_by_child: String,
    /// Number of children with the greatest ordering value to keep.
    pub limit_to_last: usize,
}

impl RealtimeQuery {
    /// Builds an `orderByChild(field).limitToLast(limit)` query.
    pub fn limit_to_last(order_by_child: impl Into<String>, limit: usize) -> Self {
        Self {
            order_by_child: order_by_child.into(),
            limit_to_last: limit,
        }
    }
}

/// Handle for an installed listener. Dropping it or calling [`RealtimeSubscription::cancel`]
/// detaches the listener; no callback runs afterwards.
#[must_use = "dropping a subscription immediately unsubscribes it"]
pub struct RealtimeSubscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl RealtimeSubscription {
    /// Wraps the backend-specific unsubscribe action.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Returns a handle with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Unsubscribes now.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for RealtimeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Host service for the shared realtime JSON tree.
pub trait RealtimeStore {
    /// Returns whether the backend is usable.
    fn status(&self) -> RealtimeStatus;

    /// Installs a listener on `path`.
    ///
    /// # Errors
    ///
    /// Returns the unavailability reason when the backend is not usable.
    fn subscribe(
        &self,
        path: &str,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String>;

    /// Installs a listener on a bounded top-N query over the children of `path`.
    ///
    /// # Errors
    ///
    /// Returns the unavailability reason when the backend is not usable.
    fn subscribe_query(
        &self,
        path: &str,
        query: RealtimeQuery,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String>;

    /// Reads the value at `path` once.
    fn get<'a>(&'a self, path: &'a str) -> RealtimeFuture<'a, Result<Option<Value>, String>>;

    /// Upserts `value` at `path`. Writing `null` deletes the key.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write before sending it.
    fn write(&self, path: &str, value: Value) -> Result<(), String>;

    /// Appends `value` under a backend-generated, chronologically sortable child key of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the write before sending it.
    fn push(&self, path: &str, value: Value) -> Result<String, String>;

    /// Deletes the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the delete before sending it.
    fn remove(&self, path: &str) -> Result<(), String>;

    /// Registers a server-side delete of `path` that runs when this connection drops.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the registration.
    fn remove_on_disconnect(&self, path: &str) -> Result<(), String>;
}

/// Realtime store used when no backend could be initialized. Every operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableRealtimeStore {
    reason: String,
}

impl UnavailableRealtimeStore {
    /// Creates a store that reports `reason` for every operation.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RealtimeStore for UnavailableRealtimeStore {
    fn status(&self) -> RealtimeStatus {
        RealtimeStatus::Unavailable {
            reason: self.reason.clone(),
        }
    }

    fn subscribe(
        &self,
        _path: &str,
        _callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        Err(self.reason.clone())
    }

    fn subscribe_query(
        &self,
        _path: &str,
        _query: RealtimeQuery,
        _callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        Err(self.reason.clone())
    }

    fn get<'a>(&'a self, _path: &'a str) -> RealtimeFuture<'a, Result<Option<Value>, String>> {
        Box::pin(async move { Err(self.reason.clone()) })
    }

    fn write(&self, _path: &str, _value: Value) -> Result<(), String> {
        Err(self.reason.clone())
    }

    fn push(&self, _path: &str, _value: Value) -> Result<String, String> {
        Err(self.reason.clone())
    }

    fn remove(&self, _path: &str) -> Result<(), String> {
        Err(self.reason.clone())
    }

    fn remove_on_disconnect(&self, _path: &str) -> Result<(), String> {
        Err(self.reason.clone())
    }
}

/// Serializes and writes a typed value through a [`RealtimeStore`] implementation.
///
/// # Errors
///
/// Returns an error when serialization or the store write fails.
pub fn write_typed_with<S: RealtimeStore + ?Sized, T: Serialize>(
    store: &S,
    path: &str,
    value: &T,
) -> Result<(), String> {
    let value = serde_json::to_value(value).map_err(|e| e.to_string())?;
    store.write(path, value)
}

/// Reads and deserializes a typed value through a [`RealtimeStore`] implementation.
///
/// # Errors
///
/// Returns an error when the store read or JSON deserialization fails.
pub async fn get_typed_with<S: RealtimeStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    path: &str,
) -> Result<Option<T>, String> {
    let Some(value) = store.get(path).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn subscription_cancels_once_on_drop_or_cancel() {
        let count = Rc::new(Cell::new(0));
        let counted = count.clone();
        let sub = RealtimeSubscription::new(move || counted.set(counted.get() + 1));
        drop(sub);
        assert_eq!(count.get(), 1);

        let counted = count.clone();
        RealtimeSubscription::new(move || counted.set(counted.get() + 1)).cancel();
        assert_eq!(count.get(), 2);

        drop(RealtimeSubscription::detached());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn unavailable_store_rejects_every_operation() {
        let store = UnavailableRealtimeStore::new("missing databaseURL");
        let store_obj: &dyn RealtimeStore = &store;

        assert_eq!(
            store_obj.status().ensure_available(),
            Err("missing databaseURL".to_string())
        );
        assert!(store_obj.subscribe("desktop", Rc::new(|_: Option<Value>| {})).is_err());
        assert!(store_obj.write("desktop/iconSize", json!("small")).is_err());
        assert!(store_obj.push("system/programs", json!({})).is_err());
        assert!(store_obj.remove("cursors/u1").is_err());
        assert!(store_obj.remove_on_disconnect("cursors/u1").is_err());
        assert!(block_on(store_obj.get("desktop")).is_err());
    }
}
