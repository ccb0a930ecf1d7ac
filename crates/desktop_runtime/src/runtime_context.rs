//! Leptos provider and context wiring for the synchronized desktop.
//!
//! [`DesktopSyncProvider`] boots a [`DesktopSession`] from the injected host bundle, mirrors every
//! store into signals through the session's change listener, and drives presence from window
//! pointer events and two timers. UI layers read [`DesktopSyncContext`] and call back into the
//! session; they never write the backend directly.
#![allow(clippy::clone_on_copy)]

use std::{
    rc::{Rc, Weak},
    time::Duration,
};

use desktop_app_contract::{ProgramCommand, ProgramServices, PropsBag};
use leptos::*;
use platform_host::HostServices;
use uuid::Uuid;

use crate::{
    components::FatalErrorScreen,
    desktop_settings::DesktopSettings,
    error::SyncError,
    model::{
        CursorPosition, PresenceRecord, ProgramInstance, StartMenuState, SyncSlice, TaskbarState,
    },
    presence::{PresenceIdentity, FLUSH_INTERVAL_MS, HEARTBEAT_INTERVAL_MS},
    session::DesktopSession,
    start_menu::{load_start_menu_prefs, save_start_menu_prefs},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Connection state of the provider.
pub enum SyncStatus {
    /// Loading identity and installing subscriptions.
    Connecting,
    /// Every subscription is live.
    Ready,
    /// The backend is unavailable; the UI is blocked.
    Failed {
        /// Message shown on the fatal error screen.
        reason: String,
    },
}

#[derive(Clone, Copy)]
/// Leptos context exposing mirrored desktop state and the live session.
pub struct DesktopSyncContext {
    /// Provider connection state.
    pub status: RwSignal<SyncStatus>,
    /// Desktop settings snapshot.
    pub settings: RwSignal<DesktopSettings>,
    /// Replicated program list.
    pub programs: RwSignal<Vec<ProgramInstance>>,
    /// Visible remote cursors.
    pub cursors: RwSignal<Vec<PresenceRecord>>,
    /// Shared taskbar state.
    pub taskbar: RwSignal<TaskbarState>,
    /// Shared start menu state.
    pub start_menu: RwSignal<StartMenuState>,
    /// Live session, once connected.
    pub session: StoredValue<Option<Rc<DesktopSession>>>,
}

impl DesktopSyncContext {
    /// Runs `f` against the session, returning `None` before connect or after teardown.
    pub fn with_session<R>(&self, f: impl FnOnce(&DesktopSession) -> R) -> Option<R> {
        self.session
            .try_with_value(|session| session.as_deref().map(f))
            .flatten()
    }

    fn refresh(&self, session: &DesktopSession, slice: SyncSlice) {
        match slice {
            SyncSlice::Settings => self.settings.set(session.settings.snapshot()),
            SyncSlice::Programs => self.programs.set(session.registry.programs()),
            SyncSlice::Cursors => self.cursors.set(session.presence.peers()),
            SyncSlice::System => {
                self.taskbar.set(session.system.taskbar());
                self.start_menu.set(session.system.start_menu());
            }
        }
    }

    /// Launches the program behind a desktop or start-menu icon on every client and records it
    /// in the shared and local launch histories.
    pub fn launch_icon(&self, icon_id: &str) {
        let launched = self.with_session(|session| session.commands.launch_icon(icon_id));
        let program = match launched {
            Some(Ok(Some(id))) => self
                .with_session(|session| session.registry.find(&id))
                .flatten()
                .map(|program| program.program_type),
            Some(Ok(None)) | None => None,
            Some(Err(err)) => {
                logging::warn!("launch of `{icon_id}` failed: {err}");
                None
            }
        };
        let Some(program) = program else {
            return;
        };

        let session = self.session.get_value();
        let icon_id = icon_id.to_string();
        spawn_local(async move {
            let Some(session) = session else {
                return;
            };
            if let Err(err) = session.system.record_launch(&program).await {
                logging::warn!("launch history update failed: {err}");
            }
            let prefs = session.host().prefs.clone();
            let mut lists = load_start_menu_prefs(prefs.as_ref()).await;
            lists.add_to_recent(&icon_id);
            if let Err(err) = save_start_menu_prefs(prefs.as_ref(), &lists).await {
                logging::warn!("start menu prefs save failed: {err}");
            }
        });
    }

    /// Instance-scoped services for the program mounted as `instance_id`.
    pub fn program_services(&self, instance_id: String) -> ProgramServices {
        let ctx = *self;
        ProgramServices::new(Callback::new(move |command: ProgramCommand| {
            let result = ctx.with_session(|session| {
                session.handle_program_command(&instance_id, command)
            });
            report(result, "program command");
        }))
    }

    /// Opens a program on every client.
    pub fn launch(&self, program_type: &str, props: PropsBag) {
        let result = self.with_session(|session| session.launch(program_type, props).map(drop));
        report(result, "launch");
    }

    /// Renames the local cursor and persists the name.
    pub fn rename_cursor(&self, raw: &str) {
        let name = match self.with_session(|session| session.presence.set_display_name(raw)) {
            Some(Ok(Some(name))) => name,
            Some(Err(err)) => {
                logging::warn!("cursor rename failed: {err}");
                return;
            }
            Some(Ok(None)) | None => return,
        };
        let prefs = self.with_session(|session| session.host().prefs.clone());
        spawn_local(async move {
            let Some(prefs) = prefs else {
                return;
            };
            if let Err(err) = crate::presence::save_display_name(prefs.as_ref(), &name).await {
                logging::warn!("cursor name save failed: {err}");
            }
        });
    }
}

fn report(result: Option<Result<(), SyncError>>, what: &str) {
    match result {
        Some(Ok(())) => {}
        Some(Err(err)) => logging::warn!("{what} failed: {err}"),
        None => logging::warn!("{what} ignored: desktop session not connected"),
    }
}

fn boot(ctx: DesktopSyncContext, host: HostServices) {
    if let Err(reason) = host.realtime_status().ensure_available() {
        ctx.status.set(SyncStatus::Failed {
            reason: SyncError::BackendUnavailable(reason).to_string(),
        });
        return;
    }

    spawn_local(async move {
        let identity = match PresenceIdentity::load(host.prefs.as_ref()).await {
            Ok(identity) => identity,
            Err(err) => {
                logging::warn!("presence identity load failed: {err}");
                PresenceIdentity::new(Uuid::new_v4().to_string())
            }
        };

        let session = match DesktopSession::connect(host, identity) {
            Ok(session) => session,
            Err(err) => {
                ctx.status.set(SyncStatus::Failed {
                    reason: err.to_string(),
                });
                return;
            }
        };

        let weak: Weak<DesktopSession> = Rc::downgrade(&session);
        session.set_change_listener(move |slice| {
            if let Some(session) = weak.upgrade() {
                ctx.refresh(&session, slice);
            }
        });

        if let Err(err) = session.subscribe_all() {
            session.teardown();
            ctx.status.set(SyncStatus::Failed {
                reason: err.to_string(),
            });
            return;
        }

        for slice in [
            SyncSlice::Settings,
            SyncSlice::Programs,
            SyncSlice::Cursors,
            SyncSlice::System,
        ] {
            ctx.refresh(&session, slice);
        }
        ctx.session.set_value(Some(session));
        ctx.status.set(SyncStatus::Ready);
    });
}

fn install_presence_drivers(ctx: DesktopSyncContext) {
    let pointer_listener = window_event_listener(ev::mousemove, move |ev| {
        let position = CursorPosition {
            x: f64::from(ev.client_x()),
            y: f64::from(ev.client_y()),
        };
        if let Some(Err(err)) = ctx.with_session(|session| session.presence.pointer_moved(position))
        {
            logging::warn!("cursor update failed: {err}");
        }
    });
    on_cleanup(move || pointer_listener.remove());

    if let Ok(interval) = set_interval_with_handle(
        move || {
            if let Some(Err(err)) = ctx.with_session(|session| session.presence.flush()) {
                logging::warn!("cursor flush failed: {err}");
            }
        },
        Duration::from_millis(FLUSH_INTERVAL_MS),
    ) {
        on_cleanup(move || interval.clear());
    }

    if let Ok(interval) = set_interval_with_handle(
        move || {
            ctx.with_session(|session| {
                if let Err(err) = session.presence.heartbeat() {
                    logging::warn!("cursor heartbeat failed: {err}");
                }
                ctx.refresh(session, SyncSlice::Cursors);
            });
        },
        Duration::from_millis(HEARTBEAT_INTERVAL_MS),
    ) {
        on_cleanup(move || interval.clear());
    }
}

#[component]
/// Provides [`DesktopSyncContext`] to descendant components once the session is connected.
///
/// Shows [`FatalErrorScreen`] instead of the children when the backend is unavailable.
pub fn DesktopSyncProvider(
    /// Injected host bundle assembled by the entry layer.
    host_services: HostServices,
    children: ChildrenFn,
) -> impl IntoView {
    let ctx = DesktopSyncContext {
        status: create_rw_signal(SyncStatus::Connecting),
        settings: create_rw_signal(DesktopSettings::default()),
        programs: create_rw_signal(Vec::new()),
        cursors: create_rw_signal(Vec::new()),
        taskbar: create_rw_signal(TaskbarState::default()),
        start_menu: create_rw_signal(StartMenuState::default()),
        session: store_value(None),
    };
    provide_context(ctx.clone());

    boot(ctx, host_services);
    install_presence_drivers(ctx);
    on_cleanup(move || {
        ctx.with_session(DesktopSession::teardown);
    });

    move || match ctx.status.get() {
        SyncStatus::Ready => children().into_view(),
        SyncStatus::Connecting => view! {
            <div class="desktop-sync-connecting" role="status" aria-busy="true">
                "Connecting to the shared desktop..."
            </div>
        }
        .into_view(),
        SyncStatus::Failed { reason } => view! { <FatalErrorScreen reason=reason /> }.into_view(),
    }
}

/// Returns the current [`DesktopSyncContext`].
///
/// # Panics
///
/// Panics if called outside [`DesktopSyncProvider`].
pub fn use_desktop_sync() -> DesktopSyncContext {
    use_context::<DesktopSyncContext>().expect("DesktopSyncContext not provided")
}
