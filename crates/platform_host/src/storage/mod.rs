//! Local (non-replicated) storage contracts.

pub mod prefs;
