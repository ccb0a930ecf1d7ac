//! Shared host-bundle model injected into the sync runtime.

use std::rc::Rc;

use crate::{MemoryPrefsStore, MemoryRealtimeStore, PrefsStore, RealtimeStatus, RealtimeStore};

/// Host strategy selected for the current build/runtime composition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStrategy {
    /// Firebase realtime database plus `localStorage` prefs.
    Browser,
    /// In-process memory backend, used by tests and offline demos.
    Memory,
}

impl HostStrategy {
    /// Returns a stable string token for diagnostics and runtime inspection.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Memory => "memory",
        }
    }
}

/// Runtime-selected host service bundle.
///
/// All environment-specific service selection happens before this bundle crosses into
/// `desktop_runtime`, which keeps the sync core independent of browser adapter details.
#[derive(Clone)]
pub struct HostServices {
    /// Shared realtime tree.
    pub realtime: Rc<dyn RealtimeStore>,
    /// Per-profile preference store.
    pub prefs: Rc<dyn PrefsStore>,
    /// Stable strategy identifier for diagnostics.
    pub host_strategy: HostStrategy,
}

impl HostServices {
    /// Bundles one memory connection with a memory prefs store.
    pub fn memory(realtime: MemoryRealtimeStore, prefs: MemoryPrefsStore) -> Self {
        Self {
            realtime: Rc::new(realtime),
            prefs: Rc::new(prefs),
            host_strategy: HostStrategy::Memory,
        }
    }

    /// Returns the realtime backend status.
    pub fn realtime_status(&self) -> RealtimeStatus {
        self.realtime.status()
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("host_strategy", &self.host_strategy)
            .field("realtime", &self.realtime.status())
            .finish()
    }
}
