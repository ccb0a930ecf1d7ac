use desktop_runtime::{CursorOverlay, DesktopSurface, DesktopSyncProvider};
use leptos::*;
use leptos_meta::*;
use platform_host_web::build_host_services;

#[component]
pub fn SiteApp() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="Multi XP" />
        <Meta name="description" content="A shared Windows XP desktop where every visitor sees the same windows." />

        <main class="site-root">
            <DesktopEntry />
        </main>
    }
}

#[component]
pub fn DesktopEntry() -> impl IntoView {
    view! {
        <DesktopSyncProvider host_services=build_host_services()>
            <DesktopSurface>
                <CursorOverlay />
            </DesktopSurface>
        </DesktopSyncProvider>
    }
}
