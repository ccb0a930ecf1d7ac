use std::rc::Rc;

use platform_host::{
    HostServices, HostStrategy, RealtimeStatus, RealtimeStore, UnavailableRealtimeStore,
};

use crate::{config::load_backend_config, FirebaseRealtimeStore, WebPrefsStore};

/// Returns the host strategy of browser builds.
pub const fn selected_host_strategy() -> HostStrategy {
    HostStrategy::Browser
}

/// Returns the selected host strategy as a stable string token.
pub fn host_strategy_name() -> &'static str {
    selected_host_strategy().as_str()
}

/// Builds the preferences adapter.
pub fn prefs_store() -> WebPrefsStore {
    WebPrefsStore
}

/// Resolves the backend config and initializes the realtime adapter.
///
/// A missing or incomplete config, or an SDK that fails to initialize, yields a store that reports
/// itself unavailable so the runtime can block the UI with the reason.
pub fn realtime_store() -> Rc<dyn RealtimeStore> {
    match load_backend_config() {
        Ok((config, source)) => {
            let store = FirebaseRealtimeStore::connect(&config);
            report_status(&store.status(), source.as_str());
            Rc::new(store)
        }
        Err(err) => {
            let reason = err.to_string();
            report_status(
                &RealtimeStatus::Unavailable {
                    reason: reason.clone(),
                },
                "none",
            );
            Rc::new(UnavailableRealtimeStore::new(reason))
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn report_status(status: &RealtimeStatus, source: &str) {
    use wasm_bindgen::JsValue;

    let message = match status {
        RealtimeStatus::Available => format!("realtime backend configured from {source}"),
        RealtimeStatus::Unavailable { reason } => {
            format!("realtime backend unavailable ({source}): {reason}")
        }
    };
    if status.is_available() {
        web_sys::console::log_1(&JsValue::from_str(&message));
    } else {
        web_sys::console::error_1(&JsValue::from_str(&message));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn report_status(_status: &RealtimeStatus, _source: &str) {}

/// Assembles the browser host bundle injected into `desktop_runtime`.
pub fn build_host_services() -> HostServices {
    HostServices {
        realtime: realtime_store(),
        prefs: Rc::new(prefs_store()),
        host_strategy: selected_host_strategy(),
    }
}
