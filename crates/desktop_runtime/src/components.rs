//! Boundary views of the synchronized desktop: the fatal error screen, the remote cursor overlay,
//! and the shared desktop surface.

use leptos::*;

use crate::{
    icons::{BackgroundStyle, IconGrid},
    program_library::program_definition,
    runtime_context::use_desktop_sync,
};

#[component]
/// Full-screen blocking error shown when the realtime backend is unavailable.
pub fn FatalErrorScreen(
    /// Human-readable cause.
    #[prop(into)]
    reason: String,
) -> impl IntoView {
    let reload = move |_| {
        if let Err(err) = window().location().reload() {
            logging::error!("reload failed: {err:?}");
        }
    };

    view! {
        <div class="fatal-error-screen" role="alertdialog" aria-labelledby="fatal-error-title">
            <div class="fatal-error-panel">
                <h1 id="fatal-error-title">"Unable to connect to the shared desktop"</h1>
                <p class="fatal-error-reason">{reason}</p>
                <p>"Check the backend configuration and try again."</p>
                <button type="button" class="fatal-error-reload" on:click=reload>
                    "Reload"
                </button>
            </div>
        </div>
    }
}

#[component]
/// Remote cursors, positioned in viewport pixels.
pub fn CursorOverlay() -> impl IntoView {
    let ctx = use_desktop_sync();

    view! {
        <div class="cursor-overlay" aria-hidden="true">
            <For
                each=move || ctx.cursors.get()
                key=|record| (record.id.clone(), record.last_active)
                children=move |record| {
                    let style = format!(
                        "transform: translate({}px, {}px); color: {};",
                        record.position.x, record.position.y, record.color
                    );
                    view! {
                        <div class="remote-cursor" style=style>
                            <svg class="remote-cursor-arrow" viewBox="0 0 16 16" width="16" height="16">
                                <path d="M0 0 L0 12 L4 9 L7 15 L9 14 L6 8 L11 8 Z" fill="currentColor" />
                            </svg>
                            <span class="remote-cursor-label">{record.display_name}</span>
                        </div>
                    }
                }
            />
        </div>
    }
}

#[component]
/// Wallpaper plus the shared icon grid. Double-clicking an icon launches it on every client.
pub fn DesktopSurface(children: Children) -> impl IntoView {
    let ctx = use_desktop_sync();
    let style = move || ctx.settings.with(BackgroundStyle::from_settings).to_css();
    let placements = move || ctx.settings.with(IconGrid::from_settings).placements();
    let icon_size = move || {
        ctx.settings
            .with(|settings| format!("{:?}", settings.icon_size).to_lowercase())
    };

    view! {
        <div class="desktop-surface" style=style data-icon-size=icon_size>
            <ul class="desktop-icon-grid" role="listbox" aria-label="Desktop">
                <For
                    each=placements
                    key=|placement| (placement.icon_id.clone(), placement.column, placement.row)
                    children=move |placement| {
                        let program = program_definition(&placement.icon_id);
                        let icon_id = placement.icon_id.clone();
                        let grid_area = format!(
                            "grid-column: {}; grid-row: {};",
                            placement.column + 1,
                            placement.row + 1
                        );
                        view! {
                            <li
                                class="desktop-icon"
                                role="option"
                                style=grid_area
                                title=program.description
                                on:dblclick=move |_| ctx.launch_icon(&icon_id)
                            >
                                <img src=program.icon alt="" draggable="false" />
                                <span class="desktop-icon-label">{program.name}</span>
                            </li>
                        }
                    }
                />
            </ul>
            {children()}
        </div>
    }
}
