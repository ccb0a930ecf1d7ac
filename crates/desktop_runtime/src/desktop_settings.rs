//! Shared desktop settings, one independently synced key per setting.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use leptos::logging;
use platform_host::{RealtimeStore, RealtimeSubscription};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::SyncError,
    model::{
        ChangeNotifier, IconArrangement, IconSize, SyncSlice, WallpaperPosition,
        BACKGROUND_COLOR_PATH, ICON_ARRANGEMENT_PATH, ICON_IDS_PATH, ICON_SIZE_PATH,
        WALLPAPER_PATH, WALLPAPER_POSITION_PATH,
    },
};

/// Icons placed on a fresh desktop, in display order.
pub const DEFAULT_ICON_IDS: [&str; 10] = [
    "my-computer",
    "my-documents",
    "recycle-bin",
    "internet-explorer",
    "paint",
    "calculator",
    "notepad",
    "system-restore",
    "my-network",
    "control-panel",
];
/// Wallpaper of a fresh desktop.
pub const DEFAULT_WALLPAPER: &str = "/assets/wallpapers/Windows_XP_Professional.webp";
/// Background color of a fresh desktop.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#008080";

/// One backend key mirrored locally with a typed default.
///
/// An absent or malformed stored value reads as the default, and the first such observation writes
/// the default back once so later readers see a concrete value.
pub struct SyncedSetting<T> {
    store: Rc<dyn RealtimeStore>,
    path: &'static str,
    default: T,
    slice: SyncSlice,
    notifier: ChangeNotifier,
    value: RefCell<Option<T>>,
    defaulted: Cell<bool>,
}

impl<T> SyncedSetting<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
{
    /// Creates a setting for `path` with `default`.
    pub fn new(
        store: Rc<dyn RealtimeStore>,
        path: &'static str,
        default: T,
        slice: SyncSlice,
        notifier: ChangeNotifier,
    ) -> Rc<Self> {
        Rc::new(Self {
            store,
            path,
            default,
            slice,
            notifier,
            value: RefCell::new(None),
            defaulted: Cell::new(false),
        })
    }

    /// Backend path of this setting.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Last known value, or the default when nothing usable has been observed.
    pub fn get(&self) -> T {
        self.value
            .borrow()
            .clone()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Whether the default has already been written back by this client.
    pub fn default_written(&self) -> bool {
        self.defaulted.get()
    }

    /// Updates the local value immediately and writes it through.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or rejects the write.
    pub fn set(&self, value: T) -> Result<(), SyncError> {
        self.store
            .status()
            .ensure_available()
            .map_err(SyncError::BackendUnavailable)?;
        let encoded = serde_json::to_value(&value).map_err(|err| SyncError::Decode {
            path: self.path.to_string(),
            message: err.to_string(),
        })?;
        self.replace_local(value);
        self.store
            .write(self.path, encoded)
            .map_err(SyncError::Transport)
    }

    /// Subscribes to the backend key.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] when the store rejects the subscription.
    pub fn subscribe(self: &Rc<Self>) -> Result<RealtimeSubscription, SyncError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.store
            .subscribe(
                self.path,
                Rc::new(move |value| {
                    if let Some(setting) = weak.upgrade() {
                        setting.apply_remote(value);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)
    }

    fn apply_remote(&self, value: Option<Value>) {
        let decoded = value.and_then(|raw| match serde_json::from_value::<T>(raw) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                logging::warn!("malformed value at {}: {err}", self.path);
                None
            }
        });
        match decoded {
            Some(decoded) => self.replace_local(decoded),
            None => {
                self.replace_local(self.default.clone());
                self.write_default_once();
            }
        }
    }

    fn write_default_once(&self) {
        if self.defaulted.replace(true) {
            return;
        }
        match serde_json::to_value(&self.default) {
            Ok(encoded) => {
                if let Err(err) = self.store.write(self.path, encoded) {
                    logging::warn!("default write for {} failed: {err}", self.path);
                } else {
                    logging::log!("materialized default for {}", self.path);
                }
            }
            Err(err) => logging::warn!("default encode for {} failed: {err}", self.path),
        }
    }

    fn replace_local(&self, value: T) {
        let changed = self.value.borrow().as_ref() != Some(&value);
        *self.value.borrow_mut() = Some(value);
        if changed {
            self.notifier.notify(self.slice);
        }
    }
}

/// Plain snapshot of every desktop setting.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopSettings {
    /// Ordered desktop icon ids.
    pub icon_ids: Vec<String>,
    /// Icon size.
    pub icon_size: IconSize,
    /// Icon arrangement mode.
    pub icon_arrangement: IconArrangement,
    /// Wallpaper URL; `None` shows only the background color.
    pub wallpaper: Option<String>,
    /// Wallpaper placement.
    pub wallpaper_position: WallpaperPosition,
    /// Background color.
    pub background_color: String,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            icon_ids: DEFAULT_ICON_IDS.iter().map(|id| id.to_string()).collect(),
            icon_size: IconSize::default(),
            icon_arrangement: IconArrangement::default(),
            wallpaper: Some(DEFAULT_WALLPAPER.to_string()),
            wallpaper_position: WallpaperPosition::default(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
        }
    }
}

/// Every desktop setting, each on its own backend key.
pub struct DesktopSettingsStore {
    /// `desktop/iconIds`.
    pub icon_ids: Rc<SyncedSetting<Vec<String>>>,
    /// `desktop/iconSize`.
    pub icon_size: Rc<SyncedSetting<IconSize>>,
    /// `desktop/iconArrangement`.
    pub icon_arrangement: Rc<SyncedSetting<IconArrangement>>,
    /// `desktop/wallpaper`; the empty string means no wallpaper.
    pub wallpaper: Rc<SyncedSetting<String>>,
    /// `desktop/wallpaperPosition`.
    pub wallpaper_position: Rc<SyncedSetting<WallpaperPosition>>,
    /// `desktop/backgroundColor`.
    pub background_color: Rc<SyncedSetting<String>>,
}

impl DesktopSettingsStore {
    /// Creates the settings over `store`.
    pub fn new(store: Rc<dyn RealtimeStore>, notifier: ChangeNotifier) -> Self {
        let defaults = DesktopSettings::default();
        let slice = SyncSlice::Settings;
        Self {
            icon_ids: SyncedSetting::new(
                store.clone(),
                ICON_IDS_PATH,
                defaults.icon_ids,
                slice,
                notifier.clone(),
            ),
            icon_size: SyncedSetting::new(
                store.clone(),
                ICON_SIZE_PATH,
                defaults.icon_size,
                slice,
                notifier.clone(),
            ),
            icon_arrangement: SyncedSetting::new(
                store.clone(),
                ICON_ARRANGEMENT_PATH,
                defaults.icon_arrangement,
                slice,
                notifier.clone(),
            ),
            wallpaper: SyncedSetting::new(
                store.clone(),
                WALLPAPER_PATH,
                DEFAULT_WALLPAPER.to_string(),
                slice,
                notifier.clone(),
            ),
            wallpaper_position: SyncedSetting::new(
                store.clone(),
                WALLPAPER_POSITION_PATH,
                defaults.wallpaper_position,
                slice,
                notifier.clone(),
            ),
            background_color: SyncedSetting::new(
                store,
                BACKGROUND_COLOR_PATH,
                defaults.background_color,
                slice,
                notifier,
            ),
        }
    }

    /// Subscribes every setting.
    ///
    /// # Errors
    ///
    /// Returns the first subscription failure; handles installed before it are dropped.
    pub fn subscribe_all(&self) -> Result<Vec<RealtimeSubscription>, SyncError> {
        Ok(vec![
            self.icon_ids.subscribe()?,
            self.icon_size.subscribe()?,
            self.icon_arrangement.subscribe()?,
            self.wallpaper.subscribe()?,
            self.wallpaper_position.subscribe()?,
            self.background_color.subscribe()?,
        ])
    }

    /// Current values.
    pub fn snapshot(&self) -> DesktopSettings {
        DesktopSettings {
            icon_ids: self.icon_ids.get(),
            icon_size: self.icon_size.get(),
            icon_arrangement: self.icon_arrangement.get(),
            wallpaper: self.wallpaper(),
            wallpaper_position: self.wallpaper_position.get(),
            background_color: self.background_color.get(),
        }
    }

    /// Current wallpaper, `None` when cleared.
    pub fn wallpaper(&self) -> Option<String> {
        Some(self.wallpaper.get()).filter(|url| !url.is_empty())
    }

    /// Sets or clears the wallpaper.
    ///
    /// # Errors
    ///
    /// See [`SyncedSetting::set`].
    pub fn set_wallpaper(&self, wallpaper: Option<&str>) -> Result<(), SyncError> {
        self.wallpaper
            .set(wallpaper.unwrap_or_default().to_string())
    }

    /// Moves `icon_id` to `new_index` (clamped). Only applies in normal arrangement; returns
    /// whether the list changed.
    ///
    /// # Errors
    ///
    /// See [`SyncedSetting::set`].
    pub fn move_icon(&self, icon_id: &str, new_index: usize) -> Result<bool, SyncError> {
        if self.icon_arrangement.get() != IconArrangement::Normal {
            return Ok(false);
        }
        let mut ids = self.icon_ids.get();
        let Some(current) = ids.iter().position(|id| id == icon_id) else {
            logging::warn!("move of unknown desktop icon `{icon_id}` ignored");
            return Ok(false);
        };
        let moved = ids.remove(current);
        let target = new_index.min(ids.len());
        ids.insert(target, moved);
        if current == target {
            return Ok(false);
        }
        self.icon_ids.set(ids)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use platform_host::{MemoryRealtimeBackend, RealtimeCallback, RealtimeStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn store_for(backend: &MemoryRealtimeBackend) -> Rc<dyn RealtimeStore> {
        Rc::new(backend.connect())
    }

    fn spy(
        backend: &MemoryRealtimeBackend,
        path: &str,
    ) -> (Rc<RefCell<Vec<Option<Value>>>>, RealtimeSubscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let callback: RealtimeCallback = Rc::new(move |value| sink.borrow_mut().push(value));
        let sub = backend.connect().subscribe(path, callback).expect("spy");
        (seen, sub)
    }

    #[test]
    fn absent_keys_materialize_defaults_once() {
        let backend = MemoryRealtimeBackend::new();
        let (seen, _spy) = spy(&backend, ICON_SIZE_PATH);
        let settings = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let _subs = settings.subscribe_all().expect("subscribe");

        assert_eq!(settings.snapshot(), DesktopSettings::default());
        assert_eq!(backend.snapshot(ICON_SIZE_PATH), Some(json!("medium")));
        assert_eq!(
            backend.snapshot(WALLPAPER_PATH),
            Some(json!(DEFAULT_WALLPAPER))
        );
        assert_eq!(*seen.borrow(), vec![None, Some(json!("medium"))]);
        assert!(settings.icon_size.default_written());
    }

    #[test]
    fn malformed_values_read_as_default_and_are_corrected() {
        let backend = MemoryRealtimeBackend::new();
        backend
            .connect()
            .write(ICON_SIZE_PATH, json!("gigantic"))
            .expect("seed");

        let settings = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let _subs = settings.subscribe_all().expect("subscribe");

        assert_eq!(settings.icon_size.get(), IconSize::Medium);
        assert_eq!(backend.snapshot(ICON_SIZE_PATH), Some(json!("medium")));
    }

    #[test]
    fn existing_values_are_not_overwritten() {
        let backend = MemoryRealtimeBackend::new();
        backend
            .connect()
            .write(BACKGROUND_COLOR_PATH, json!("#000080"))
            .expect("seed");

        let settings = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let _subs = settings.subscribe_all().expect("subscribe");

        assert_eq!(settings.background_color.get(), "#000080");
        assert!(!settings.background_color.default_written());
    }

    #[test]
    fn set_is_optimistic_and_reaches_other_clients() {
        let backend = MemoryRealtimeBackend::new();
        let alice = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let bob = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let _a = alice.subscribe_all().expect("subscribe alice");
        let _b = bob.subscribe_all().expect("subscribe bob");

        alice
            .wallpaper_position
            .set(WallpaperPosition::Tile)
            .expect("set");
        assert_eq!(alice.wallpaper_position.get(), WallpaperPosition::Tile);
        assert_eq!(bob.wallpaper_position.get(), WallpaperPosition::Tile);

        bob.set_wallpaper(None).expect("clear wallpaper");
        assert_eq!(alice.wallpaper(), None);
        assert_eq!(backend.snapshot(WALLPAPER_PATH), Some(json!("")));
    }

    #[test]
    fn move_icon_only_in_normal_arrangement() {
        let backend = MemoryRealtimeBackend::new();
        let settings = DesktopSettingsStore::new(store_for(&backend), ChangeNotifier::default());
        let _subs = settings.subscribe_all().expect("subscribe");

        assert_eq!(settings.move_icon("paint", 0), Ok(false));

        settings
            .icon_arrangement
            .set(IconArrangement::Normal)
            .expect("arrangement");
        assert_eq!(settings.move_icon("paint", 0), Ok(true));
        assert_eq!(settings.icon_ids.get()[0], "paint");

        assert_eq!(settings.move_icon("paint", 99), Ok(true));
        assert_eq!(settings.icon_ids.get().last().map(String::as_str), Some("paint"));
        assert_eq!(settings.move_icon("solitaire", 0), Ok(false));
    }
}
