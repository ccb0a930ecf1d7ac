//! Typed host-domain contracts shared by the desktop sync runtime and browser adapters.
//!
//! This crate is the API-first boundary for platform services. It exposes the realtime store
//! contract with an in-memory multi-connection backend, backend-connection config resolution,
//! per-profile preference storage, and time helpers. Concrete browser adapters live in
//! `platform_host_web`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod host;
pub mod realtime;
pub mod storage;
pub mod time;

pub use config::{
    is_usable_value, resolve_backend_config, BackendConfig, ConfigError, ConfigSource,
    PartialBackendConfig,
};
pub use host::{HostServices, HostStrategy};
pub use realtime::memory::{MemoryRealtimeBackend, MemoryRealtimeStore};
pub use realtime::path::{join_path, path_segments};
pub use realtime::{
    get_typed_with, write_typed_with, RealtimeCallback, RealtimeFuture, RealtimeQuery,
    RealtimeStatus, RealtimeStore, RealtimeSubscription, UnavailableRealtimeStore,
};
pub use storage::prefs::{
    load_or_init_pref_with, load_pref_with, save_pref_with, MemoryPrefsStore, PrefsStore,
    PrefsStoreFuture,
};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
