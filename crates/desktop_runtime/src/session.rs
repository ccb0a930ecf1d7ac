//! Desktop session lifecycle: connect, subscribe-all, teardown.
//!
//! A [`DesktopSession`] owns every synced store of one client and every subscription handle they
//! install. Stores are injected with the same [`ChangeNotifier`], so a single listener learns which
//! slice changed.

use std::{cell::RefCell, rc::Rc};

use desktop_app_contract::{ProgramCommand, PropsBag};
use leptos::logging;
use platform_host::{HostServices, RealtimeSubscription};

use crate::{
    command_log::CommandLog,
    desktop_settings::DesktopSettingsStore,
    error::SyncError,
    model::{ChangeNotifier, SyncSlice},
    presence::{PresenceIdentity, PresenceTracker},
    registry::SyncedRegistry,
    system_state::SystemState,
};

/// Every synced store of one connected client.
pub struct DesktopSession {
    host: HostServices,
    notifier: ChangeNotifier,
    /// Shared desktop settings.
    pub settings: DesktopSettingsStore,
    /// Replicated program list.
    pub registry: Rc<SyncedRegistry>,
    /// Open/close/focus fan-out.
    pub commands: Rc<CommandLog>,
    /// Live cursors.
    pub presence: Rc<PresenceTracker>,
    /// Taskbar, start menu, show-desktop, and launch history.
    pub system: Rc<SystemState>,
    subscriptions: RefCell<Vec<RealtimeSubscription>>,
}

impl DesktopSession {
    /// Builds the stores for a connected client.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] without touching the store when the realtime
    /// backend is not usable.
    pub fn connect(host: HostServices, identity: PresenceIdentity) -> Result<Rc<Self>, SyncError> {
        host.realtime_status()
            .ensure_available()
            .map_err(SyncError::BackendUnavailable)?;

        let store = host.realtime.clone();
        let notifier = ChangeNotifier::default();
        let registry = SyncedRegistry::new(store.clone(), notifier.clone());
        let commands = CommandLog::new(store.clone(), registry.clone());
        let presence = PresenceTracker::new(store.clone(), identity, notifier.clone());
        let system = SystemState::new(store.clone(), registry.clone(), notifier.clone());
        let settings = DesktopSettingsStore::new(store, notifier.clone());

        Ok(Rc::new(Self {
            host,
            notifier,
            settings,
            registry,
            commands,
            presence,
            system,
            subscriptions: RefCell::new(Vec::new()),
        }))
    }

    /// Host bundle this session was built from.
    pub fn host(&self) -> &HostServices {
        &self.host
    }

    /// Installs `listener` for change notifications from every store.
    pub fn set_change_listener(&self, listener: impl Fn(SyncSlice) + 'static) {
        self.notifier.set_listener(listener);
    }

    /// Installs every subscription and starts presence.
    ///
    /// # Errors
    ///
    /// Returns the first subscription or presence failure. Handles installed before the failure
    /// stay registered until [`Self::teardown`].
    pub fn subscribe_all(&self) -> Result<(), SyncError> {
        let mut installed = Vec::new();
        let result = self.install(&mut installed);
        self.subscriptions.borrow_mut().extend(installed);
        result?;
        self.presence.start()?;
        logging::log!(
            "desktop session connected via {} host as {}",
            self.host.host_strategy.as_str(),
            self.presence.identity().user_id
        );
        Ok(())
    }

    fn install(&self, installed: &mut Vec<RealtimeSubscription>) -> Result<(), SyncError> {
        installed.extend(self.settings.subscribe_all()?);
        installed.push(self.registry.subscribe()?);
        installed.push(self.commands.subscribe()?);
        installed.extend(self.system.subscribe_all()?);
        installed.push(self.presence.subscribe()?);
        Ok(())
    }

    /// Number of live subscription handles.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Cancels every subscription, removes the presence record, and drops the listener.
    pub fn teardown(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for subscription in subscriptions {
            subscription.cancel();
        }
        if let Err(err) = self.presence.stop() {
            logging::warn!("presence cleanup failed: {err}");
        }
        self.notifier.clear();
        logging::log!("desktop session torn down");
    }

    /// Launches a program on every client. Returns the local id, `None` when capped.
    ///
    /// # Errors
    ///
    /// See [`CommandLog::launch`].
    pub fn launch(&self, program_type: &str, props: PropsBag) -> Result<Option<String>, SyncError> {
        self.commands.launch(program_type, props)
    }

    /// Applies a command emitted by the program mounted as `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying store operation fails.
    pub fn handle_program_command(
        &self,
        instance_id: &str,
        command: ProgramCommand,
    ) -> Result<(), SyncError> {
        match command {
            ProgramCommand::UpdateProps { patch } => self.registry.update_props(instance_id, patch),
            ProgramCommand::Close { persist_props } => {
                self.commands.terminate_with(instance_id, persist_props)
            }
            ProgramCommand::Focus => self.commands.activate(instance_id),
            ProgramCommand::Minimize => self.registry.minimize(instance_id),
            ProgramCommand::SetMaximized { maximized } => {
                self.registry.maximize(instance_id, maximized)
            }
            ProgramCommand::Launch {
                program_type,
                props,
            } => self.launch(&program_type, props).map(drop),
            ProgramCommand::ShowError { message } => self.registry.show_error(message),
        }
    }
}

impl Drop for DesktopSession {
    fn drop(&mut self) {
        if !self.subscriptions.get_mut().is_empty() {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use platform_host::{MemoryPrefsStore, MemoryRealtimeBackend, UnavailableRealtimeStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn memory_host(backend: &MemoryRealtimeBackend) -> HostServices {
        HostServices::memory(backend.connect(), MemoryPrefsStore::default())
    }

    #[test]
    fn connect_fails_fast_when_backend_is_unavailable() {
        let mut host = memory_host(&MemoryRealtimeBackend::new());
        host.realtime = Rc::new(UnavailableRealtimeStore::new("missing databaseURL"));
        let result = DesktopSession::connect(host, PresenceIdentity::new("u1"));
        assert_eq!(
            result.err(),
            Some(SyncError::BackendUnavailable(
                "missing databaseURL".to_string()
            ))
        );
    }

    #[test]
    fn subscribe_all_then_teardown_releases_every_listener() {
        let backend = MemoryRealtimeBackend::new();
        let session =
            DesktopSession::connect(memory_host(&backend), PresenceIdentity::new("u1"))
                .expect("connect");
        session.subscribe_all().expect("subscribe");

        assert_eq!(session.subscription_count(), 12);
        assert_eq!(backend.listener_count(), 12);
        assert!(backend.snapshot("cursors/u1").is_some());

        session.teardown();
        assert_eq!(backend.listener_count(), 0);
        assert_eq!(backend.snapshot("cursors/u1"), None);
    }

    #[test]
    fn change_listener_sees_each_slice() {
        let backend = MemoryRealtimeBackend::new();
        let session =
            DesktopSession::connect(memory_host(&backend), PresenceIdentity::new("u1"))
                .expect("connect");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        session.set_change_listener(move |slice| sink.borrow_mut().push(slice));
        session.subscribe_all().expect("subscribe");

        let seen = seen.borrow();
        for slice in [
            SyncSlice::Settings,
            SyncSlice::Programs,
            SyncSlice::System,
            SyncSlice::Cursors,
        ] {
            assert!(seen.contains(&slice), "missing {slice:?}");
        }
    }

    #[test]
    fn program_commands_route_to_the_stores() {
        let backend = MemoryRealtimeBackend::new();
        let session =
            DesktopSession::connect(memory_host(&backend), PresenceIdentity::new("u1"))
                .expect("connect");
        session.subscribe_all().expect("subscribe");
        let id = session
            .launch("notepad", PropsBag::new())
            .expect("launch")
            .expect("id");

        let mut patch = PropsBag::new();
        patch.insert("content".to_string(), json!("draft"));
        session
            .handle_program_command(&id, ProgramCommand::UpdateProps { patch })
            .expect("update");
        session
            .handle_program_command(&id, ProgramCommand::SetMaximized { maximized: true })
            .expect("maximize");

        let program = session.registry.find(&id).expect("program");
        assert_eq!(program.props["content"], json!("draft"));
        assert!(program.is_maximized);

        session
            .handle_program_command(
                &id,
                ProgramCommand::Close {
                    persist_props: false,
                },
            )
            .expect("close");
        assert!(session.registry.programs().is_empty());
    }
}
