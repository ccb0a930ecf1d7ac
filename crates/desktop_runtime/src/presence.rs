//! Live cursor presence.
//!
//! Each client owns one ephemeral record under `cursors/{userId}`. Pointer moves are filtered by
//! distance and coalesced into at most one write per flush interval; a slower heartbeat refreshes
//! `lastActive` while idle. Peers are read through a bounded most-recent query and filtered by
//! staleness against the local clock.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use leptos::logging;
use platform_host::{
    join_path, load_or_init_pref_with, save_pref_with, unix_time_ms_now, write_typed_with,
    PrefsStore, RealtimeQuery, RealtimeStore, RealtimeSubscription,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::SyncError,
    model::{ChangeNotifier, CursorPosition, PresenceRecord, SyncSlice, CURSORS_PATH},
};

/// Maximum number of peer records fetched.
pub const MAX_USERS: usize = 10;
/// Coalescing window for pointer writes.
pub const FLUSH_INTERVAL_MS: u64 = 150;
/// Minimum pointer travel, in pixels, before a move is queued.
pub const MIN_MOVE_DISTANCE: f64 = 5.0;
/// Records idle for longer than this are hidden.
pub const STALE_AFTER_MS: u64 = 10_000;
/// Idle refresh period; must stay below [`STALE_AFTER_MS`].
pub const HEARTBEAT_INTERVAL_MS: u64 = 5_000;
/// Longest accepted display name.
pub const MAX_DISPLAY_NAME_CHARS: usize = 20;
/// Preference key of the per-profile user id.
pub const USER_ID_PREF_KEY: &str = "cursor_user_id";
/// Preference key of the display name.
pub const DISPLAY_NAME_PREF_KEY: &str = "cursor_display_name";
/// Cursor colors assigned at random.
pub const CURSOR_COLORS: [&str; 10] = [
    "#FF5733", "#33FF57", "#3357FF", "#F033FF", "#FF33F0", "#FFBD33", "#33FFBD", "#BD33FF",
    "#FF3333", "#33FF33",
];

/// Clock returning unix milliseconds.
pub type Clock = Rc<dyn Fn() -> u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Local user's presence identity.
pub struct PresenceIdentity {
    /// Stable per-profile id.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Cursor color.
    pub color: String,
}

impl PresenceIdentity {
    /// Builds an identity with a default name and a random palette color.
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            display_name: default_display_name(&user_id),
            color: random_color().to_string(),
            user_id,
        }
    }

    /// Loads the persisted id and name from `prefs`, creating them on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the prefs store cannot load or save.
    pub async fn load(prefs: &dyn PrefsStore) -> Result<Self, String> {
        let user_id: String =
            load_or_init_pref_with(prefs, USER_ID_PREF_KEY, || Uuid::new_v4().to_string())
                .await?;
        let stored: String = load_or_init_pref_with(prefs, DISPLAY_NAME_PREF_KEY, || {
            default_display_name(&user_id)
        })
        .await?;
        let mut identity = Self::new(user_id);
        if let Some(name) = normalize_display_name(&stored) {
            identity.display_name = name;
        }
        Ok(identity)
    }
}

/// `User-` followed by the first five characters of the id.
pub fn default_display_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(5).collect();
    format!("User-{prefix}")
}

/// Trims and truncates a display name; empty names are rejected.
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}

/// Palette color chosen with random uuid bytes.
pub fn random_color() -> &'static str {
    let byte = Uuid::new_v4().as_bytes()[0] as usize;
    CURSOR_COLORS[byte % CURSOR_COLORS.len()]
}

/// Persists a display name.
///
/// # Errors
///
/// Returns an error when the prefs store rejects the save.
pub async fn save_display_name(prefs: &dyn PrefsStore, name: &str) -> Result<(), String> {
    save_pref_with(prefs, DISPLAY_NAME_PREF_KEY, &name).await
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Result of feeding one pointer sample to [`MoveThrottle`].
pub enum MoveOutcome {
    /// Too close to the last sent position.
    Ignored,
    /// Held until the next flush.
    Queued,
    /// The flush interval already elapsed; send this position now.
    Send(CursorPosition),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Distance filter plus flush-interval coalescing for pointer samples.
pub struct MoveThrottle {
    last_sent: Option<CursorPosition>,
    pending: Option<CursorPosition>,
    last_flush_ms: u64,
}

impl MoveThrottle {
    /// Feeds a pointer sample observed at `now_ms`.
    pub fn on_move(&mut self, position: CursorPosition, now_ms: u64) -> MoveOutcome {
        let moved_enough = self
            .last_sent
            .map_or(true, |sent| sent.distance_to(position) >= MIN_MOVE_DISTANCE);
        if !moved_enough {
            return MoveOutcome::Ignored;
        }
        if now_ms.saturating_sub(self.last_flush_ms) >= FLUSH_INTERVAL_MS {
            self.mark_sent(position, now_ms);
            return MoveOutcome::Send(position);
        }
        self.pending = Some(position);
        MoveOutcome::Queued
    }

    /// Takes the queued position, if any, for the periodic flush.
    pub fn flush(&mut self, now_ms: u64) -> Option<CursorPosition> {
        let position = self.pending?;
        self.mark_sent(position, now_ms);
        Some(position)
    }

    /// Position the heartbeat should report.
    pub fn current(&self) -> CursorPosition {
        self.pending.or(self.last_sent).unwrap_or_default()
    }

    /// Records a write made outside the throttle.
    pub fn mark_sent(&mut self, position: CursorPosition, now_ms: u64) {
        self.last_sent = Some(position);
        self.pending = None;
        self.last_flush_ms = now_ms;
    }
}

/// Whether `record` has been idle longer than [`STALE_AFTER_MS`] at `now_ms`.
pub fn is_stale(record: &PresenceRecord, now_ms: u64) -> bool {
    now_ms.saturating_sub(record.last_active) > STALE_AFTER_MS
}

/// Decodes a query snapshot into visible peers: malformed entries, the local user, and stale
/// records are dropped.
pub fn visible_peers(value: Option<Value>, own_id: &str, now_ms: u64) -> Vec<PresenceRecord> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    let mut peers: Vec<PresenceRecord> = map
        .into_iter()
        .filter_map(|(key, entry)| match serde_json::from_value::<PresenceRecord>(entry) {
            Ok(record) => Some(record),
            Err(err) => {
                logging::warn!("skipping malformed cursor {key}: {err}");
                None
            }
        })
        .filter(|record| record.id != own_id && !is_stale(record, now_ms))
        .collect();
    peers.sort_by(|a, b| b.last_active.cmp(&a.last_active).then(a.id.cmp(&b.id)));
    peers
}

/// Presence tracker for the local user.
pub struct PresenceTracker {
    store: Rc<dyn RealtimeStore>,
    identity: RefCell<PresenceIdentity>,
    throttle: RefCell<MoveThrottle>,
    peers: RefCell<Vec<PresenceRecord>>,
    notifier: ChangeNotifier,
    clock: Clock,
}

impl PresenceTracker {
    /// Creates a tracker using the wall clock.
    pub fn new(
        store: Rc<dyn RealtimeStore>,
        identity: PresenceIdentity,
        notifier: ChangeNotifier,
    ) -> Rc<Self> {
        Self::with_clock(store, identity, notifier, Rc::new(unix_time_ms_now))
    }

    /// Creates a tracker with an injected clock.
    pub fn with_clock(
        store: Rc<dyn RealtimeStore>,
        identity: PresenceIdentity,
        notifier: ChangeNotifier,
        clock: Clock,
    ) -> Rc<Self> {
        Rc::new(Self {
            store,
            identity: RefCell::new(identity),
            throttle: RefCell::new(MoveThrottle::default()),
            peers: RefCell::new(Vec::new()),
            notifier,
            clock,
        })
    }

    /// Local identity.
    pub fn identity(&self) -> PresenceIdentity {
        self.identity.borrow().clone()
    }

    fn record_path(&self) -> String {
        join_path(CURSORS_PATH, &self.identity.borrow().user_id)
    }

    fn write_record(&self, position: CursorPosition) -> Result<(), SyncError> {
        let record = {
            let identity = self.identity.borrow();
            PresenceRecord {
                id: identity.user_id.clone(),
                position,
                display_name: identity.display_name.clone(),
                color: identity.color.clone(),
                last_active: (self.clock)(),
            }
        };
        write_typed_with(self.store.as_ref(), &self.record_path(), &record)
            .map_err(SyncError::Transport)
    }

    /// Writes the initial record at the origin and registers its server-side removal.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or rejects either write.
    pub fn start(&self) -> Result<(), SyncError> {
        self.store
            .status()
            .ensure_available()
            .map_err(SyncError::BackendUnavailable)?;
        let origin = CursorPosition::default();
        self.throttle.borrow_mut().mark_sent(origin, (self.clock)());
        self.write_record(origin)?;
        self.store
            .remove_on_disconnect(&self.record_path())
            .map_err(SyncError::Transport)
    }

    /// Removes the local record.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the delete.
    pub fn stop(&self) -> Result<(), SyncError> {
        self.store
            .remove(&self.record_path())
            .map_err(SyncError::Transport)
    }

    /// Feeds a pointer sample. Returns whether a write was made.
    ///
    /// # Errors
    ///
    /// Returns an error when the write is rejected.
    pub fn pointer_moved(&self, position: CursorPosition) -> Result<bool, SyncError> {
        let outcome = self.throttle.borrow_mut().on_move(position, (self.clock)());
        match outcome {
            MoveOutcome::Send(position) => self.write_record(position).map(|()| true),
            MoveOutcome::Ignored | MoveOutcome::Queued => Ok(false),
        }
    }

    /// Writes the queued position, if any. Driven by the flush timer.
    ///
    /// # Errors
    ///
    /// Returns an error when the write is rejected.
    pub fn flush(&self) -> Result<bool, SyncError> {
        let pending = self.throttle.borrow_mut().flush((self.clock)());
        match pending {
            Some(position) => self.write_record(position).map(|()| true),
            None => Ok(false),
        }
    }

    /// Rewrites the record to refresh `lastActive`. Driven by the heartbeat timer.
    ///
    /// # Errors
    ///
    /// Returns an error when the write is rejected.
    pub fn heartbeat(&self) -> Result<(), SyncError> {
        let position = {
            let mut throttle = self.throttle.borrow_mut();
            let position = throttle.current();
            throttle.mark_sent(position, (self.clock)());
            position
        };
        self.write_record(position)
    }

    /// Renames the local user and writes the record immediately. Returns the accepted name, or
    /// `None` when the name was empty after trimming.
    ///
    /// # Errors
    ///
    /// Returns an error when the write is rejected.
    pub fn set_display_name(&self, raw: &str) -> Result<Option<String>, SyncError> {
        let Some(name) = normalize_display_name(raw) else {
            return Ok(None);
        };
        self.identity.borrow_mut().display_name = name.clone();
        let position = self.throttle.borrow().current();
        self.write_record(position)?;
        Ok(Some(name))
    }

    /// Subscribes to the most recent peer records.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] when the store rejects the subscription.
    pub fn subscribe(self: &Rc<Self>) -> Result<RealtimeSubscription, SyncError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.store
            .subscribe_query(
                CURSORS_PATH,
                RealtimeQuery::limit_to_last("lastActive", MAX_USERS),
                Rc::new(move |value| {
                    if let Some(tracker) = weak.upgrade() {
                        tracker.apply_remote(value);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)
    }

    fn apply_remote(&self, value: Option<Value>) {
        let own_id = self.identity.borrow().user_id.clone();
        let peers = visible_peers(value, &own_id, (self.clock)());
        *self.peers.borrow_mut() = peers;
        self.notifier.notify(SyncSlice::Cursors);
    }

    /// Visible peers, re-filtered for staleness against the current clock.
    pub fn peers(&self) -> Vec<PresenceRecord> {
        let now = (self.clock)();
        self.peers
            .borrow()
            .iter()
            .filter(|record| !is_stale(record, now))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;
    use platform_host::{MemoryPrefsStore, MemoryRealtimeBackend, MemoryRealtimeStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn pos(x: f64, y: f64) -> CursorPosition {
        CursorPosition { x, y }
    }

    fn tracker_at(
        store: Rc<dyn RealtimeStore>,
        user_id: &str,
        now: Rc<Cell<u64>>,
    ) -> Rc<PresenceTracker> {
        PresenceTracker::with_clock(
            store,
            PresenceIdentity::new(user_id),
            ChangeNotifier::default(),
            Rc::new(move || now.get()),
        )
    }

    #[test]
    fn throttle_filters_jitter_and_coalesces() {
        let mut throttle = MoveThrottle::default();
        assert_eq!(throttle.on_move(pos(0.0, 0.0), 1_000), MoveOutcome::Send(pos(0.0, 0.0)));
        assert_eq!(throttle.on_move(pos(3.0, 0.0), 1_010), MoveOutcome::Ignored);
        assert_eq!(throttle.on_move(pos(3.0, 4.0), 1_020), MoveOutcome::Queued);
        assert_eq!(throttle.on_move(pos(30.0, 40.0), 1_030), MoveOutcome::Queued);
        assert_eq!(throttle.flush(1_150), Some(pos(30.0, 40.0)));
        assert_eq!(throttle.flush(1_300), None);
        assert_eq!(
            throttle.on_move(pos(60.0, 40.0), 1_300),
            MoveOutcome::Send(pos(60.0, 40.0))
        );
    }

    #[test]
    fn display_names_are_trimmed_and_capped() {
        assert_eq!(normalize_display_name("   "), None);
        assert_eq!(normalize_display_name("  Ada "), Some("Ada".to_string()));
        assert_eq!(
            normalize_display_name("abcdefghijklmnopqrstuvwxyz").map(|n| n.len()),
            Some(MAX_DISPLAY_NAME_CHARS)
        );
        assert_eq!(default_display_name("1234abcd"), "User-1234a");
        assert!(CURSOR_COLORS.contains(&random_color()));
    }

    #[test]
    fn identity_persists_across_reloads() {
        let prefs = MemoryPrefsStore::default();
        let first = block_on(PresenceIdentity::load(&prefs)).expect("first load");
        let second = block_on(PresenceIdentity::load(&prefs)).expect("second load");
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(second.display_name, default_display_name(&first.user_id));

        block_on(save_display_name(&prefs, "Grace")).expect("save");
        let third = block_on(PresenceIdentity::load(&prefs)).expect("third load");
        assert_eq!(third.display_name, "Grace");
    }

    #[test]
    fn peers_exclude_self_and_stale_records() {
        let now = 50_000;
        let value = json!({
            "me": {"id": "me", "position": {"x": 1, "y": 1}, "displayName": "Me", "color": "#FF5733", "lastActive": now},
            "fresh": {"id": "fresh", "position": {"x": 2, "y": 2}, "displayName": "F", "color": "#33FF57", "lastActive": now - 9_000},
            "stale": {"id": "stale", "position": {"x": 3, "y": 3}, "displayName": "S", "color": "#3357FF", "lastActive": now - 10_001},
            "junk": {"id": 5}
        });
        let peers = visible_peers(Some(value), "me", now);
        let ids: Vec<_> = peers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[test]
    fn start_registers_disconnect_cleanup() {
        let backend = MemoryRealtimeBackend::new();
        let connection = Rc::new(backend.connect());
        let store: Rc<dyn RealtimeStore> = connection.clone();
        let tracker = tracker_at(store, "u1", Rc::new(Cell::new(1_000)));

        tracker.start().expect("start");
        assert_eq!(
            backend.snapshot("cursors/u1/position"),
            Some(json!({"x": 0.0, "y": 0.0}))
        );

        connection.disconnect();
        assert_eq!(backend.snapshot("cursors/u1"), None);
    }

    #[test]
    fn peers_see_moves_and_age_out() {
        let backend = MemoryRealtimeBackend::new();
        let now = Rc::new(Cell::new(1_000));
        let alice = tracker_at(Rc::new(backend.connect()), "alice", now.clone());
        let bob = tracker_at(Rc::new(backend.connect()), "bob", now.clone());
        let _sub = bob.subscribe().expect("subscribe");

        alice.start().expect("start");
        now.set(1_200);
        assert_eq!(alice.pointer_moved(pos(100.0, 80.0)), Ok(true));

        let peers = bob.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].position, pos(100.0, 80.0));

        now.set(1_200 + STALE_AFTER_MS + 1);
        assert!(bob.peers().is_empty());

        alice.heartbeat().expect("heartbeat");
        assert_eq!(bob.peers().len(), 1);

        alice.stop().expect("stop");
        assert!(bob.peers().is_empty());
    }

    #[test]
    fn rename_writes_immediately() {
        let backend = MemoryRealtimeBackend::new();
        let store: Rc<MemoryRealtimeStore> = Rc::new(backend.connect());
        let tracker = tracker_at(store, "u1", Rc::new(Cell::new(5)));
        tracker.start().expect("start");

        assert_eq!(tracker.set_display_name("  "), Ok(None));
        assert_eq!(
            tracker.set_display_name(" Linus "),
            Ok(Some("Linus".to_string()))
        );
        assert_eq!(
            backend.snapshot("cursors/u1/displayName"),
            Some(json!("Linus"))
        );
    }
}
