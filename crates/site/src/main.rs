//! Binary entrypoint for the browser-hosted `site` application.

#[cfg(all(target_arch = "wasm32", feature = "csr"))]
fn main() {
    site::mount();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!(
        "This binary runs in the browser. Build `site_app` for wasm32 with the `csr` feature and load `config.js` defining `window.firebaseConfig` before the bundle."
    );
}
