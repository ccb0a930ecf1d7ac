//! Per-browser-profile storage adapters.

pub mod local_prefs;
