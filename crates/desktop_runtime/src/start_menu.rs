//! Start menu pinned and recent lists, stored per browser profile.

use leptos::logging;
use platform_host::{load_or_init_pref_with, save_pref_with, PrefsStore};
use serde::{Deserialize, Serialize};

/// Preference key of the start menu lists.
pub const START_MENU_PREFS_KEY: &str = "multixp.start_menu.v1";
/// Length cap of the recent list.
pub const MAX_RECENT_PROGRAMS: usize = 6;
/// Pinned entries of a fresh profile.
pub const DEFAULT_PINNED: [&str; 2] = ["internet-explorer", "outlook-express"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Pinned and recently used start menu entries (catalog ids).
pub struct StartMenuPrefs {
    /// Pinned entries, in display order.
    #[serde(default)]
    pub pinned: Vec<String>,
    /// Recently used entries, most recent first.
    #[serde(default)]
    pub recent: Vec<String>,
}

impl Default for StartMenuPrefs {
    fn default() -> Self {
        Self {
            pinned: DEFAULT_PINNED.iter().map(|id| id.to_string()).collect(),
            recent: Vec::new(),
        }
    }
}

impl StartMenuPrefs {
    /// Pins `id` at the end. Returns `false` if already pinned.
    pub fn add_to_pinned(&mut self, id: &str) -> bool {
        if self.pinned.iter().any(|pinned| pinned == id) {
            return false;
        }
        self.pinned.push(id.to_string());
        true
    }

    /// Unpins `id`. Returns `false` if it was not pinned.
    pub fn remove_from_pinned(&mut self, id: &str) -> bool {
        let before = self.pinned.len();
        self.pinned.retain(|pinned| pinned != id);
        self.pinned.len() != before
    }

    /// Moves `id` to the front of the recent list, capped at [`MAX_RECENT_PROGRAMS`].
    pub fn add_to_recent(&mut self, id: &str) {
        self.recent.retain(|recent| recent != id);
        self.recent.insert(0, id.to_string());
        self.recent.truncate(MAX_RECENT_PROGRAMS);
    }

    /// Moves the pin at `from` to `to` (clamped). Returns `false` when `from` is out of range.
    pub fn move_pin(&mut self, from: usize, to: usize) -> bool {
        if from >= self.pinned.len() {
            return false;
        }
        let id = self.pinned.remove(from);
        let to = to.min(self.pinned.len());
        self.pinned.insert(to, id);
        from != to
    }
}

/// Loads the lists, falling back to defaults when the store fails.
pub async fn load_start_menu_prefs(prefs: &dyn PrefsStore) -> StartMenuPrefs {
    match load_or_init_pref_with(prefs, START_MENU_PREFS_KEY, StartMenuPrefs::default).await {
        Ok(lists) => lists,
        Err(err) => {
            logging::warn!("start menu prefs load failed: {err}");
            StartMenuPrefs::default()
        }
    }
}

/// Persists the lists.
///
/// # Errors
///
/// Returns an error when the prefs store rejects the save.
pub async fn save_start_menu_prefs(
    prefs: &dyn PrefsStore,
    lists: &StartMenuPrefs,
) -> Result<(), String> {
    save_pref_with(prefs, START_MENU_PREFS_KEY, lists).await
}
