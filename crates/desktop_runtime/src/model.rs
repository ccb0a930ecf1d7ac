//! Wire records and shared constants for the replicated desktop tree.
//!
//! Every record here is stored as JSON under a fixed backend path and uses the field names other
//! clients already read (`camelCase`, lowercase enum tokens).

use std::{cell::RefCell, rc::Rc};

use desktop_app_contract::PropsBag;
use serde::{Deserialize, Serialize};

pub use desktop_app_contract::WallpaperPosition;

/// Root of the shared desktop settings keys.
pub const DESKTOP_PATH: &str = "desktop";
/// Ordered desktop icon ids.
pub const ICON_IDS_PATH: &str = "desktop/iconIds";
/// Icon size setting.
pub const ICON_SIZE_PATH: &str = "desktop/iconSize";
/// Icon arrangement setting.
pub const ICON_ARRANGEMENT_PATH: &str = "desktop/iconArrangement";
/// Wallpaper URL (empty string for none).
pub const WALLPAPER_PATH: &str = "desktop/wallpaper";
/// Wallpaper placement.
pub const WALLPAPER_POSITION_PATH: &str = "desktop/wallpaperPosition";
/// Desktop background color.
pub const BACKGROUND_COLOR_PATH: &str = "desktop/backgroundColor";
/// Replicated program registry list.
pub const PROGRAMS_PATH: &str = "desktop/programs";
/// Append-keyed command event log.
pub const COMMAND_LOG_PATH: &str = "system/programs";
/// Taskbar state.
pub const TASKBAR_PATH: &str = "system/taskbar";
/// Start menu state.
pub const START_MENU_PATH: &str = "system/startMenu";
/// Show-desktop trigger.
pub const SHOW_DESKTOP_PATH: &str = "system/showDesktop";
/// Recent program launches ring.
pub const PROGRAM_LAUNCHES_PATH: &str = "system/programLaunches";
/// Presence records, one child per user id.
pub const CURSORS_PATH: &str = "cursors";

/// Default window width for newly opened programs.
pub const DEFAULT_WINDOW_WIDTH: f64 = 640.0;
/// Default window height for newly opened programs.
pub const DEFAULT_WINDOW_HEIGHT: f64 = 480.0;
/// First z-index handed out by a fresh client session.
pub const Z_INDEX_BASE: i64 = 100;
/// Maximum number of open non-error-dialog programs.
pub const WINDOW_LIMIT: usize = 16;
/// Program type of the shared system error dialog.
pub const ERROR_DIALOG_TYPE: &str = "error-dialog";
/// Message shown when [`WINDOW_LIMIT`] is reached.
pub const WINDOW_LIMIT_MESSAGE: &str = "You have reached the maximum limit of 16 open windows. Please close some windows before opening a new one.";

/// Slice of synchronized state that changed, reported to UI listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncSlice {
    /// Any desktop settings key.
    Settings,
    /// The program registry list.
    Programs,
    /// Remote presence records.
    Cursors,
    /// Taskbar, start menu, show-desktop, or launch history.
    System,
}

/// Shared hook through which synced stores tell the UI layer which slice changed.
///
/// Clones share one listener slot, so a session can hand the same notifier to every store and
/// install the listener afterwards.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listener: Rc<RefCell<Option<Rc<dyn Fn(SyncSlice)>>>>,
}

impl ChangeNotifier {
    /// Installs (or replaces) the listener.
    pub fn set_listener(&self, listener: impl Fn(SyncSlice) + 'static) {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
    }

    /// Removes the listener.
    pub fn clear(&self) {
        self.listener.borrow_mut().take();
    }

    /// Reports a change to the installed listener, if any.
    pub fn notify(&self, slice: SyncSlice) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(slice);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("installed", &self.listener.borrow().is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
/// Desktop icon size.
pub enum IconSize {
    /// 8 x 16 grid.
    Small,
    /// 6 x 10 grid.
    #[default]
    Medium,
    /// 4 x 6 grid.
    Large,
}

impl IconSize {
    /// Returns the desktop grid as `(columns, rows)`.
    pub const fn grid_dimensions(self) -> (usize, usize) {
        match self {
            Self::Small => (8, 16),
            Self::Medium => (6, 10),
            Self::Large => (4, 6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
/// Desktop icon arrangement mode.
pub enum IconArrangement {
    /// Packed column-first, wrapping on overflow.
    #[default]
    Auto,
    /// Index-addressed, user-ordered.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
/// Window position in desktop pixels.
pub struct WindowPosition {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Window size in desktop pixels.
pub struct WindowSize {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

impl WindowSize {
    /// Clamps both dimensions to the given minimums.
    pub fn clamped_min(self, min_width: f64, min_height: f64) -> Self {
        Self {
            width: self.width.max(min_width),
            height: self.height.max(min_height),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One open program window as replicated under [`PROGRAMS_PATH`].
///
/// `id` is client-local; `global_id` correlates the same logical window across clients.
pub struct ProgramInstance {
    /// Client-local instance id (`{type}-{ms}`).
    pub id: String,
    /// Cross-client correlation id.
    #[serde(default)]
    pub global_id: String,
    /// Program type tag.
    #[serde(rename = "type")]
    pub program_type: String,
    /// Window title.
    #[serde(default)]
    pub title: String,
    /// Window icon URL.
    #[serde(default)]
    pub icon: String,
    /// Always true for listed instances.
    #[serde(default = "default_true")]
    pub is_open: bool,
    /// Stacking order; higher is on top.
    #[serde(default)]
    pub z_index: i64,
    /// Last known position.
    #[serde(default)]
    pub position: WindowPosition,
    /// Last known size.
    #[serde(default)]
    pub size: WindowSize,
    /// Maximized flag.
    #[serde(default)]
    pub is_maximized: bool,
    /// Minimized flag.
    #[serde(default)]
    pub is_minimized: bool,
    /// Application-owned props bag.
    #[serde(default)]
    pub props: PropsBag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Intent carried by a [`CommandEvent`].
pub enum CommandAction {
    /// Open a program on every client.
    Open,
    /// Close the program with the event's `programId` everywhere.
    Close,
    /// Focus the program with the event's `programId` everywhere.
    Focus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of the command log under [`COMMAND_LOG_PATH`].
pub struct CommandEvent {
    /// Intent.
    pub action: CommandAction,
    /// Global id of the affected instance.
    pub program_id: String,
    /// Program type, for `open`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_type: Option<String>,
    /// Initial props, for `open`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<PropsBag>,
    /// Emission time in unix ms.
    #[serde(default)]
    pub timestamp: u64,
    /// In-band acknowledgement flag.
    #[serde(default)]
    pub processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
/// Pointer location in viewport pixels.
pub struct CursorPosition {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl CursorPosition {
    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Ephemeral per-user presence record under `cursors/{id}`.
pub struct PresenceRecord {
    /// Stable per-profile user id.
    pub id: String,
    /// Pointer location.
    pub position: CursorPosition,
    /// Display name.
    pub display_name: String,
    /// Cursor color.
    pub color: String,
    /// Last activity time in unix ms.
    pub last_active: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Taskbar state under [`TASKBAR_PATH`].
pub struct TaskbarState {
    /// Height in pixels.
    pub height: f64,
    /// Locked flag.
    pub is_locked: bool,
}

impl Default for TaskbarState {
    fn default() -> Self {
        Self {
            height: 40.0,
            is_locked: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
/// Start menu state under [`START_MENU_PATH`].
pub struct StartMenuState {
    /// Whether the menu is open.
    pub is_open: bool,
    /// Last change time in unix ms.
    #[serde(default)]
    pub last_updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
/// Show-desktop trigger under [`SHOW_DESKTOP_PATH`].
pub struct ShowDesktopState {
    /// Set by the requesting client, reset by observers after minimizing.
    #[serde(default, alias = "active")]
    pub triggered: bool,
    /// Trigger time in unix ms.
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One entry of the [`PROGRAM_LAUNCHES_PATH`] ring.
pub struct ProgramLaunch {
    /// Program type launched.
    pub program: String,
    /// Launch time in unix ms.
    pub timestamp: u64,
}
