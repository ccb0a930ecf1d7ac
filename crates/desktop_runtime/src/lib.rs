//! Synchronization core of the shared multi-user desktop.
//!
//! Every client mirrors one replicated JSON tree: independently keyed desktop settings, a single
//! program list, an append-keyed command log for open/close/focus fan-out, `system/*` state, and
//! ephemeral cursor presence. [`DesktopSession`] owns the stores of one client;
//! [`DesktopSyncProvider`] exposes them to Leptos views.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod command_log;
pub mod components;
pub mod desktop_settings;
pub mod error;
pub mod icons;
pub mod model;
pub mod presence;
pub mod program_library;
pub mod reducer;
pub mod registry;
pub mod runtime_context;
pub mod session;
pub mod start_menu;
pub mod system_state;
pub mod window_manager;

pub use command_log::{apply_command, decode_command_log, sanitize_props, CommandLog};
pub use components::{CursorOverlay, DesktopSurface, FatalErrorScreen};
pub use desktop_settings::{DesktopSettings, DesktopSettingsStore, SyncedSetting};
pub use error::SyncError;
pub use icons::{BackgroundStyle, IconGrid, IconPlacement};
pub use model::*;
pub use presence::{PresenceIdentity, PresenceTracker};
pub use program_library::{program_definition, window_metadata, ProgramDefinition, PROGRAM_LIBRARY};
pub use reducer::{
    reduce_registry, OpenProgramRequest, ProgramAction, ReducerError, RegistryState, RuntimeEffect,
};
pub use registry::{decode_program_list, SyncedRegistry};
pub use runtime_context::{use_desktop_sync, DesktopSyncContext, DesktopSyncProvider, SyncStatus};
pub use session::DesktopSession;
pub use start_menu::StartMenuPrefs;
pub use system_state::SystemState;
