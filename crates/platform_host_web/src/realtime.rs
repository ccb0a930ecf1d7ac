//! Realtime store adapters for browser builds.

pub mod firebase;
