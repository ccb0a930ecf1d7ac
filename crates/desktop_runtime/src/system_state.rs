//! Shared `system/*` state: taskbar, start menu, show-desktop trigger, and launch history.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use leptos::logging;
use platform_host::{unix_time_ms_now, write_typed_with, RealtimeStore, RealtimeSubscription};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    desktop_settings::SyncedSetting,
    error::SyncError,
    model::{
        ChangeNotifier, ProgramLaunch, ShowDesktopState, StartMenuState, SyncSlice, TaskbarState,
        PROGRAM_LAUNCHES_PATH, SHOW_DESKTOP_PATH, START_MENU_PATH, TASKBAR_PATH,
    },
    registry::SyncedRegistry,
};

/// Length of the shared launch history.
pub const LAUNCH_HISTORY_LEN: usize = 10;

/// Synced `system/*` state for one client.
pub struct SystemState {
    store: Rc<dyn RealtimeStore>,
    registry: Rc<SyncedRegistry>,
    notifier: ChangeNotifier,
    /// `system/taskbar`, materialized with its default like the desktop settings.
    pub taskbar: Rc<SyncedSetting<TaskbarState>>,
    start_menu: RefCell<StartMenuState>,
    show_desktop: RefCell<ShowDesktopState>,
}

impl SystemState {
    /// Creates the system state over `store`; show-desktop minimizes through `registry`.
    pub fn new(
        store: Rc<dyn RealtimeStore>,
        registry: Rc<SyncedRegistry>,
        notifier: ChangeNotifier,
    ) -> Rc<Self> {
        let taskbar = SyncedSetting::new(
            store.clone(),
            TASKBAR_PATH,
            TaskbarState::default(),
            SyncSlice::System,
            notifier.clone(),
        );
        Rc::new(Self {
            store,
            registry,
            notifier,
            taskbar,
            start_menu: RefCell::new(StartMenuState::default()),
            show_desktop: RefCell::new(ShowDesktopState::default()),
        })
    }

    /// Subscribes the taskbar, start menu, and show-desktop keys.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] when the store rejects a subscription.
    pub fn subscribe_all(self: &Rc<Self>) -> Result<Vec<RealtimeSubscription>, SyncError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        let start_menu = self
            .store
            .subscribe(
                START_MENU_PATH,
                Rc::new(move |value| {
                    if let Some(system) = weak.upgrade() {
                        let state = decode_or_default::<StartMenuState>(START_MENU_PATH, value);
                        *system.start_menu.borrow_mut() = state;
                        system.notifier.notify(SyncSlice::System);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)?;

        let weak: Weak<Self> = Rc::downgrade(self);
        let show_desktop = self
            .store
            .subscribe(
                SHOW_DESKTOP_PATH,
                Rc::new(move |value| {
                    if let Some(system) = weak.upgrade() {
                        system.apply_show_desktop(value);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)?;

        Ok(vec![self.taskbar.subscribe()?, start_menu, show_desktop])
    }

    fn apply_show_desktop(&self, value: Option<Value>) {
        let state = decode_or_default::<ShowDesktopState>(SHOW_DESKTOP_PATH, value);
        *self.show_desktop.borrow_mut() = state;
        self.notifier.notify(SyncSlice::System);
        if !state.triggered {
            return;
        }
        if let Err(err) = self.registry.minimize_all() {
            logging::warn!("show desktop minimize failed: {err}");
        }
        let reset = ShowDesktopState {
            triggered: false,
            timestamp: state.timestamp,
        };
        if let Err(err) = write_typed_with(self.store.as_ref(), SHOW_DESKTOP_PATH, &reset) {
            logging::warn!("show desktop reset failed: {err}");
        }
    }

    /// Current taskbar state.
    pub fn taskbar(&self) -> TaskbarState {
        self.taskbar.get()
    }

    /// Locks or unlocks the taskbar.
    ///
    /// # Errors
    ///
    /// See [`SyncedSetting::set`].
    pub fn set_taskbar_locked(&self, is_locked: bool) -> Result<(), SyncError> {
        self.taskbar.set(TaskbarState {
            is_locked,
            ..self.taskbar.get()
        })
    }

    /// Sets the taskbar height.
    ///
    /// # Errors
    ///
    /// See [`SyncedSetting::set`].
    pub fn set_taskbar_height(&self, height: f64) -> Result<(), SyncError> {
        self.taskbar.set(TaskbarState {
            height,
            ..self.taskbar.get()
        })
    }

    /// Current start menu state.
    pub fn start_menu(&self) -> StartMenuState {
        *self.start_menu.borrow()
    }

    /// Opens the start menu if closed, closes it if open.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or rejects the write.
    pub fn toggle_start_menu(&self) -> Result<(), SyncError> {
        let is_open = !self.start_menu().is_open;
        self.write_start_menu(is_open)
    }

    /// Closes the start menu.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or rejects the write.
    pub fn close_start_menu(&self) -> Result<(), SyncError> {
        self.write_start_menu(false)
    }

    fn write_start_menu(&self, is_open: bool) -> Result<(), SyncError> {
        self.ensure_available()?;
        let state = StartMenuState {
            is_open,
            last_updated: unix_time_ms_now(),
        };
        *self.start_menu.borrow_mut() = state;
        self.notifier.notify(SyncSlice::System);
        write_typed_with(self.store.as_ref(), START_MENU_PATH, &state).map_err(SyncError::Transport)
    }

    /// Last observed show-desktop trigger.
    pub fn show_desktop(&self) -> ShowDesktopState {
        *self.show_desktop.borrow()
    }

    /// Asks every client to minimize all windows.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or rejects the write.
    pub fn trigger_show_desktop(&self) -> Result<(), SyncError> {
        self.ensure_available()?;
        let state = ShowDesktopState {
            triggered: true,
            timestamp: unix_time_ms_now(),
        };
        write_typed_with(self.store.as_ref(), SHOW_DESKTOP_PATH, &state)
            .map_err(SyncError::Transport)
    }

    /// Appends a launch to the shared history, keeping the last [`LAUNCH_HISTORY_LEN`] entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the read or write fails.
    pub async fn record_launch(&self, program_type: &str) -> Result<(), SyncError> {
        self.ensure_available()?;
        let current = self
            .store
            .get(PROGRAM_LAUNCHES_PATH)
            .await
            .map_err(SyncError::Transport)?;
        let mut launches = decode_launches(current);
        launches.push(ProgramLaunch {
            program: program_type.to_string(),
            timestamp: unix_time_ms_now(),
        });
        let excess = launches.len().saturating_sub(LAUNCH_HISTORY_LEN);
        launches.drain(..excess);
        write_typed_with(self.store.as_ref(), PROGRAM_LAUNCHES_PATH, &launches)
            .map_err(SyncError::Transport)
    }

    fn ensure_available(&self) -> Result<(), SyncError> {
        self.store
            .status()
            .ensure_available()
            .map_err(SyncError::BackendUnavailable)
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(path: &str, value: Option<Value>) -> T {
    match value {
        None => T::default(),
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|err| {
            logging::warn!("malformed value at {path}: {err}");
            T::default()
        }),
    }
}

/// Decodes the launch history from an array or numeric-keyed object, skipping bad entries.
pub fn decode_launches(value: Option<Value>) -> Vec<ProgramLaunch> {
    let entries: Vec<Value> = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => {
            let mut indexed: Vec<(usize, Value)> = map
                .into_iter()
                .filter_map(|(key, entry)| key.parse().ok().map(|index| (index, entry)))
                .collect();
            indexed.sort_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, entry)| entry).collect()
        }
        _ => return Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}
