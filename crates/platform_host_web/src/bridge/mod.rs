//! Browser capability bridge used by `platform_host_web` service adapters.
//!
//! Bindings are split by domain:
//! - `bridge::realtime` (Firebase database reads, writes, and listeners)
//! - `bridge::page` (globals injected by the hosting page)
//! - `bridge::interop` (shared wasm/non-wasm transport glue)

mod interop;
pub(crate) mod page;
pub(crate) mod realtime;
