//! In-memory realtime backend with several client connections over one shared tree.
//!
//! [`MemoryRealtimeBackend`] plays the role of the server; each [`MemoryRealtimeStore`] returned by
//! [`MemoryRealtimeBackend::connect`] is one client connection. Change notifications are queued
//! and drained in FIFO order, never re-entrantly: a write issued from inside a callback is
//! delivered after that callback returns. Each queued delivery carries the snapshot taken when the
//! change happened.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
    rc::{Rc, Weak},
};

use serde_json::Value;

use super::{
    path::{apply_query, path_segments, paths_overlap, set_at, value_at},
    RealtimeCallback, RealtimeFuture, RealtimeQuery, RealtimeStatus, RealtimeStore,
    RealtimeSubscription,
};
use crate::time::unix_time_ms_now;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

struct Listener {
    id: u64,
    connection: u64,
    segments: Vec<String>,
    query: Option<RealtimeQuery>,
    callback: RealtimeCallback,
}

impl Listener {
    fn snapshot(&self, root: &Value) -> Option<Value> {
        let node = value_at(root, &self.segments);
        match &self.query {
            Some(query) => apply_query(node, query),
            None => node.cloned(),
        }
    }
}

struct Delivery {
    listener_id: u64,
    callback: RealtimeCallback,
    value: Option<Value>,
}

#[derive(Default)]
struct BackendState {
    root: Value,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    next_connection_id: u64,
    disconnect_hooks: HashMap<u64, Vec<Vec<String>>>,
    closed_connections: HashSet<u64>,
    last_push_ms: u64,
    push_sequence: u64,
}

impl BackendState {
    fn next_push_key(&mut self) -> String {
        let now = unix_time_ms_now().max(self.last_push_ms);
        if now == self.last_push_ms {
            self.push_sequence += 1;
        } else {
            self.last_push_ms = now;
            self.push_sequence = 0;
        }
        let mut key = encode_push_chars(now, 8);
        key.push_str(&encode_push_chars(self.push_sequence, 12));
        key
    }
}

#[derive(Default)]
struct Shared {
    state: RefCell<BackendState>,
    queue: RefCell<VecDeque<Delivery>>,
    draining: Cell<bool>,
}

struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Shared in-memory tree acting as the server side for any number of connections.
#[derive(Clone, Default)]
pub struct MemoryRealtimeBackend {
    shared: Rc<Shared>,
}

impl MemoryRealtimeBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new client connection.
    pub fn connect(&self) -> MemoryRealtimeStore {
        let mut state = self.shared.state.borrow_mut();
        state.next_connection_id += 1;
        MemoryRealtimeStore {
            backend: self.clone(),
            connection_id: state.next_connection_id,
        }
    }

    /// Reads the current value at `path` directly from the tree.
    pub fn snapshot(&self, path: &str) -> Option<Value> {
        let segments = path_segments(path);
        value_at(&self.shared.state.borrow().root, &segments).cloned()
    }

    /// Returns how many listeners are currently installed across all connections.
    pub fn listener_count(&self) -> usize {
        self.shared.state.borrow().listeners.len()
    }

    fn apply(&self, segments: &[String], value: Option<Value>) {
        {
            let mut guard = self.shared.state.borrow_mut();
            let state = &mut *guard;
            let before: Vec<(usize, Option<Value>)> = state
                .listeners
                .iter()
                .enumerate()
                .filter(|(_, listener)| paths_overlap(&listener.segments, segments))
                .map(|(idx, listener)| (idx, listener.snapshot(&state.root)))
                .collect();

            set_at(&mut state.root, segments, value);

            let mut queue = self.shared.queue.borrow_mut();
            for (idx, old) in before {
                let listener = &state.listeners[idx];
                let new = listener.snapshot(&state.root);
                if new != old {
                    queue.push_back(Delivery {
                        listener_id: listener.id,
                        callback: listener.callback.clone(),
                        value: new,
                    });
                }
            }
        }
        self.drain();
    }

    fn add_listener(
        &self,
        connection: u64,
        path: &str,
        query: Option<RealtimeQuery>,
        callback: RealtimeCallback,
    ) -> RealtimeSubscription {
        let listener_id = {
            let mut state = self.shared.state.borrow_mut();
            state.next_listener_id += 1;
            let listener = Listener {
                id: state.next_listener_id,
                connection,
                segments: path_segments(path),
                query,
                callback,
            };
            self.shared.queue.borrow_mut().push_back(Delivery {
                listener_id: listener.id,
                callback: listener.callback.clone(),
                value: listener.snapshot(&state.root),
            });
            let id = listener.id;
            state.listeners.push(listener);
            id
        };
        self.drain();

        let shared: Weak<Shared> = Rc::downgrade(&self.shared);
        RealtimeSubscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared
                    .state
                    .borrow_mut()
                    .listeners
                    .retain(|listener| listener.id != listener_id);
            }
        })
    }

    fn drain(&self) {
        if self.shared.draining.replace(true) {
            return;
        }
        let _guard = DrainGuard(&self.shared.draining);
        loop {
            let next = self.shared.queue.borrow_mut().pop_front();
            let Some(delivery) = next else {
                break;
            };
            let live = self
                .shared
                .state
                .borrow()
                .listeners
                .iter()
                .any(|listener| listener.id == delivery.listener_id);
            if live {
                (delivery.callback)(delivery.value);
            }
        }
    }
}

/// One client connection to a [`MemoryRealtimeBackend`].
pub struct MemoryRealtimeStore {
    backend: MemoryRealtimeBackend,
    connection_id: u64,
}

impl MemoryRealtimeStore {
    /// Returns the backend this connection talks to.
    pub fn backend(&self) -> &MemoryRealtimeBackend {
        &self.backend
    }

    /// Drops the connection as if the network went away.
    ///
    /// Listeners owned by this connection are removed, registered disconnect hooks run, and
    /// every later operation reports the store as unavailable.
    pub fn disconnect(&self) {
        let hooks = {
            let mut state = self.backend.shared.state.borrow_mut();
            if !state.closed_connections.insert(self.connection_id) {
                return;
            }
            let connection = self.connection_id;
            state
                .listeners
                .retain(|listener| listener.connection != connection);
            state
                .disconnect_hooks
                .remove(&connection)
                .unwrap_or_default()
        };
        for segments in hooks {
            self.backend.apply(&segments, None);
        }
    }

    fn ensure_open(&self) -> Result<(), String> {
        self.status().ensure_available()
    }
}

impl RealtimeStore for MemoryRealtimeStore {
    fn status(&self) -> RealtimeStatus {
        let closed = self
            .backend
            .shared
            .state
            .borrow()
            .closed_connections
            .contains(&self.connection_id);
        if closed {
            RealtimeStatus::Unavailable {
                reason: "realtime connection closed".to_string(),
            }
        } else {
            RealtimeStatus::Available
        }
    }

    fn subscribe(
        &self,
        path: &str,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        self.ensure_open()?;
        Ok(self
            .backend
            .add_listener(self.connection_id, path, None, callback))
    }

    fn subscribe_query(
        &self,
        path: &str,
        query: RealtimeQuery,
        callback: RealtimeCallback,
    ) -> Result<RealtimeSubscription, String> {
        self.ensure_open()?;
        Ok(self
            .backend
            .add_listener(self.connection_id, path, Some(query), callback))
    }

    fn get<'a>(&'a self, path: &'a str) -> RealtimeFuture<'a, Result<Option<Value>, String>> {
        Box::pin(async move {
            self.ensure_open()?;
            Ok(self.backend.snapshot(path))
        })
    }

    fn write(&self, path: &str, value: Value) -> Result<(), String> {
        self.ensure_open()?;
        self.backend.apply(&path_segments(path), Some(value));
        Ok(())
    }

    fn push(&self, path: &str, value: Value) -> Result<String, String> {
        self.ensure_open()?;
        let key = self.backend.shared.state.borrow_mut().next_push_key();
        let mut segments = path_segments(path);
        segments.push(key.clone());
        self.backend.apply(&segments, Some(value));
        Ok(key)
    }

    fn remove(&self, path: &str) -> Result<(), String> {
        self.ensure_open()?;
        self.backend.apply(&path_segments(path), None);
        Ok(())
    }

    fn remove_on_disconnect(&self, path: &str) -> Result<(), String> {
        self.ensure_open()?;
        self.backend
            .shared
            .state
            .borrow_mut()
            .disconnect_hooks
            .entry(self.connection_id)
            .or_default()
            .push(path_segments(path));
        Ok(())
    }
}

fn encode_push_chars(mut value: u64, width: usize) -> String {
    let mut out = vec![PUSH_CHARS[0]; width];
    for slot in out.iter_mut().rev() {
        *slot = PUSH_CHARS[(value % 64) as usize];
        value /= 64;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Option<Value>>>>, RealtimeCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, Rc::new(move |value| sink.borrow_mut().push(value)))
    }

    #[test]
    fn subscribe_fires_immediately_then_on_change() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        let (seen, callback) = recorder();

        let _sub = store.subscribe("desktop/iconSize", callback).expect("subscribe");
        store
            .write("desktop/iconSize", json!("large"))
            .expect("write");

        assert_eq!(*seen.borrow(), vec![None, Some(json!("large"))]);
    }

    #[test]
    fn unchanged_writes_do_not_notify() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        let (seen, callback) = recorder();
        store.write("system/showDesktop", json!({"triggered": false})).expect("write");

        let _sub = store.subscribe("system/showDesktop", callback).expect("subscribe");
        store.write("system/showDesktop", json!({"triggered": false})).expect("write");

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn parent_listeners_see_child_writes_from_other_connections() {
        let backend = MemoryRealtimeBackend::new();
        let alice = backend.connect();
        let bob = backend.connect();
        let (seen, callback) = recorder();

        let _sub = alice.subscribe("cursors", callback).expect("subscribe");
        bob.write("cursors/bob", json!({"x": 4})).expect("write");

        assert_eq!(
            seen.borrow().last().cloned().flatten(),
            Some(json!({"bob": {"x": 4}}))
        );
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        let (seen, callback) = recorder();

        let sub = store.subscribe("desktop", callback).expect("subscribe");
        drop(sub);
        store.write("desktop/iconSize", json!("small")).expect("write");

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(backend.listener_count(), 0);
    }

    #[test]
    fn writes_from_callbacks_are_delivered_after_the_callback_returns() {
        let backend = MemoryRealtimeBackend::new();
        let store = Rc::new(backend.connect());
        let order = Rc::new(RefCell::new(Vec::<String>::new()));

        let writer_store = store.clone();
        let writer_order = order.clone();
        let _a = store
            .subscribe(
                "a",
                Rc::new(move |value| {
                    if value.is_some() {
                        writer_order.borrow_mut().push("a:start".to_string());
                        writer_store.write("b", json!(2)).expect("nested write");
                        writer_order.borrow_mut().push("a:end".to_string());
                    }
                }),
            )
            .expect("subscribe a");
        let reader_order = order.clone();
        let _b = store
            .subscribe(
                "b",
                Rc::new(move |value| {
                    if value.is_some() {
                        reader_order.borrow_mut().push("b".to_string());
                    }
                }),
            )
            .expect("subscribe b");

        store.write("a", json!(1)).expect("write");

        assert_eq!(*order.borrow(), vec!["a:start", "a:end", "b"]);
    }

    #[test]
    fn push_keys_sort_in_insertion_order() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        let keys: Vec<String> = (0..5)
            .map(|idx| store.push("system/programs", json!({"n": idx})).expect("push"))
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(sorted, keys);
        assert!(keys.iter().all(|key| key.len() == 20));
    }

    #[test]
    fn disconnect_runs_hooks_and_closes_the_connection() {
        let backend = MemoryRealtimeBackend::new();
        let alice = backend.connect();
        let bob = backend.connect();
        alice.write("cursors/alice", json!({"x": 1})).expect("write");
        alice.remove_on_disconnect("cursors/alice").expect("hook");
        let (seen, callback) = recorder();
        let _sub = bob.subscribe("cursors", callback).expect("subscribe");

        alice.disconnect();

        assert_eq!(seen.borrow().last().cloned(), Some(None));
        assert!(!alice.status().is_available());
        assert!(alice.write("cursors/alice", json!({"x": 2})).is_err());
        assert_eq!(backend.snapshot("cursors/alice"), None);
    }

    #[test]
    fn query_subscription_limits_to_most_recent() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        for (id, ts) in [("a", 1), ("b", 3), ("c", 2)] {
            store
                .write(&format!("cursors/{id}"), json!({"lastActive": ts}))
                .expect("write");
        }
        let (seen, callback) = recorder();
        let _sub = store
            .subscribe_query("cursors", RealtimeQuery::limit_to_last("lastActive", 2), callback)
            .expect("subscribe");

        assert_eq!(
            seen.borrow()[0],
            Some(json!({"b": {"lastActive": 3}, "c": {"lastActive": 2}}))
        );
    }

    #[test]
    fn get_reads_current_value() {
        let backend = MemoryRealtimeBackend::new();
        let store = backend.connect();
        store.write("system/taskbar", json!({"height": 40})).expect("write");

        assert_eq!(
            block_on(store.get("system/taskbar")).expect("get"),
            Some(json!({"height": 40}))
        );
        assert_eq!(block_on(store.get("missing")).expect("get"), None);
    }
}
