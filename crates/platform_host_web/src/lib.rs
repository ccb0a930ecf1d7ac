//! Browser (`wasm32`) implementations of [`platform_host`] service contracts.
//!
//! This crate is the concrete browser-side host wiring layer: the Firebase realtime database
//! adapter, `localStorage` preferences, and backend config loading from the build environment or
//! the page's `window.firebaseConfig`. Native builds compile a shim that reports the backend as
//! unavailable.
//!
//! Bridge bindings are split by domain under `bridge/`:
//! - `bridge::realtime`
//! - `bridge::page`
//! - `bridge::interop` (shared wasm/non-wasm transport glue)

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Host-strategy selection and concrete adapter factories for runtime wiring.
pub mod adapters;
mod bridge;
pub mod config;
pub mod realtime;
pub mod storage;

pub use adapters::{
    build_host_services, host_strategy_name, prefs_store, realtime_store, selected_host_strategy,
};
pub use config::{load_backend_config, runtime_backend_config};
pub use realtime::firebase::FirebaseRealtimeStore;
pub use storage::local_prefs::WebPrefsStore;
