//! Open/close/focus fan-out through the `system/programs` command log.
//!
//! Every client replays the whole log on each change. An entry is applied at most once per client:
//! entries already flagged `processed` are skipped, keys this client handled are remembered
//! locally, and `open` is guarded by `globalId` so the originating client does not open twice.
//! After applying an entry the client rewrites it with `processed: true`; concurrent rewrites of
//! the same flag are harmless.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    rc::{Rc, Weak},
};

use desktop_app_contract::{prop, PropsBag, GLOBAL_ID_KEY, PERSIST_PROPS_KEY};
use leptos::logging;
use platform_host::{join_path, unix_time_ms_now, RealtimeStore, RealtimeSubscription};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::SyncError,
    model::{CommandAction, CommandEvent, ProgramInstance, COMMAND_LOG_PATH},
    program_library::program_definition,
    registry::SyncedRegistry,
};

/// Command log producer and consumer for one client.
pub struct CommandLog {
    store: Rc<dyn RealtimeStore>,
    registry: Rc<SyncedRegistry>,
    handled: RefCell<HashSet<String>>,
}

impl CommandLog {
    /// Creates a log bound to `registry`.
    pub fn new(store: Rc<dyn RealtimeStore>, registry: Rc<SyncedRegistry>) -> Rc<Self> {
        Rc::new(Self {
            store,
            registry,
            handled: RefCell::new(HashSet::new()),
        })
    }

    /// Opens a program locally and announces it to every client.
    ///
    /// Returns the local instance id, or `None` when the window cap rejected the open (no event
    /// is emitted then).
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or a write is rejected.
    pub fn launch(&self, program_type: &str, props: PropsBag) -> Result<Option<String>, SyncError> {
        let global_id = Uuid::new_v4().to_string();
        let mut props = sanitize_props(props);
        props.insert(GLOBAL_ID_KEY.to_string(), Value::String(global_id.clone()));

        let Some(id) = self.registry.open(program_type, props.clone())? else {
            return Ok(None);
        };
        self.append(CommandEvent {
            action: CommandAction::Open,
            program_id: global_id,
            program_type: Some(program_type.to_string()),
            props: Some(props),
            timestamp: unix_time_ms_now(),
            processed: false,
        })?;
        Ok(Some(id))
    }

    /// Launches the program behind a desktop or start-menu icon.
    ///
    /// # Errors
    ///
    /// See [`Self::launch`].
    pub fn launch_icon(&self, icon_id: &str) -> Result<Option<String>, SyncError> {
        let definition = program_definition(icon_id);
        let mut props = PropsBag::new();
        props.insert("iconId".to_string(), Value::String(definition.id));
        self.launch(&definition.program, props)
    }

    /// Closes an instance locally and on every client. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or a write is rejected.
    pub fn terminate(&self, id: &str) -> Result<(), SyncError> {
        self.terminate_with(id, false)
    }

    /// Like [`Self::terminate`], but skips the sibling props reset locally when `persist_props`
    /// is set. Instances whose props carry `persistProps: true` always skip it.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or a write is rejected.
    pub fn terminate_with(&self, id: &str, persist_props: bool) -> Result<(), SyncError> {
        let Some(program) = self.registry.find(id) else {
            logging::warn!("terminate of unknown program `{id}` ignored");
            return Ok(());
        };
        self.registry
            .close(id, persist_props || persists_props(&program))?;
        self.append(CommandEvent::targeting(CommandAction::Close, program.global_id))
    }

    /// Focuses an instance locally and on every client. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or a write is rejected.
    pub fn activate(&self, id: &str) -> Result<(), SyncError> {
        let Some(program) = self.registry.find(id) else {
            logging::warn!("activate of unknown program `{id}` ignored");
            return Ok(());
        };
        self.registry.focus(id)?;
        self.append(CommandEvent::targeting(CommandAction::Focus, program.global_id))
    }

    fn append(&self, event: CommandEvent) -> Result<(), SyncError> {
        let value = serde_json::to_value(&event).map_err(|err| SyncError::Decode {
            path: COMMAND_LOG_PATH.to_string(),
            message: err.to_string(),
        })?;
        self.store
            .push(COMMAND_LOG_PATH, value)
            .map(drop)
            .map_err(SyncError::Transport)
    }

    /// Subscribes the consumer to the log.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] when the store rejects the subscription.
    pub fn subscribe(self: &Rc<Self>) -> Result<RealtimeSubscription, SyncError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.store
            .subscribe(
                COMMAND_LOG_PATH,
                Rc::new(move |value| {
                    if let Some(log) = weak.upgrade() {
                        log.consume(value);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)
    }

    fn consume(&self, value: Option<Value>) {
        for (key, event) in decode_command_log(value) {
            if event.processed || !self.handled.borrow_mut().insert(key.clone()) {
                continue;
            }
            if let Err(err) = apply_command(&self.registry, &event) {
                logging::warn!("command {key} failed: {err}");
            }
            let acknowledged = CommandEvent {
                processed: true,
                ..event
            };
            let path = join_path(COMMAND_LOG_PATH, &key);
            match serde_json::to_value(&acknowledged) {
                Ok(value) => {
                    if let Err(err) = self.store.write(&path, value) {
                        logging::warn!("acknowledging command {key} failed: {err}");
                    }
                }
                Err(err) => logging::warn!("encoding command {key} failed: {err}"),
            }
        }
    }
}

impl CommandEvent {
    fn targeting(action: CommandAction, program_id: String) -> Self {
        Self {
            action,
            program_id,
            program_type: None,
            props: None,
            timestamp: unix_time_ms_now(),
            processed: false,
        }
    }
}

fn persists_props(program: &ProgramInstance) -> bool {
    prop(&program.props, PERSIST_PROPS_KEY).unwrap_or(false)
}

/// Applies one command to the local registry. Returns whether anything changed.
///
/// `open` is skipped when an instance with the event's `globalId` already exists, and
/// `close`/`focus` on unknown `globalId`s are ignored, so replays are harmless.
///
/// # Errors
///
/// Returns an error when the registry mutation fails.
pub fn apply_command(registry: &SyncedRegistry, event: &CommandEvent) -> Result<bool, SyncError> {
    match event.action {
        CommandAction::Open => {
            if registry.find_by_global_id(&event.program_id).is_some() {
                return Ok(false);
            }
            let Some(program_type) = event.program_type.as_deref() else {
                logging::warn!("open command {} has no program type", event.program_id);
                return Ok(false);
            };
            let mut props = event.props.clone().unwrap_or_default();
            props.insert(
                GLOBAL_ID_KEY.to_string(),
                Value::String(event.program_id.clone()),
            );
            Ok(registry.open(program_type, props)?.is_some())
        }
        CommandAction::Close => match registry.find_by_global_id(&event.program_id) {
            Some(program) => {
                registry.close(&program.id, persists_props(&program))?;
                Ok(true)
            }
            None => Ok(false),
        },
        CommandAction::Focus => match registry.find_by_global_id(&event.program_id) {
            Some(program) => {
                registry.focus(&program.id)?;
                Ok(true)
            }
            None => Ok(false),
        },
    }
}

/// Decodes the log into `(key, event)` pairs in key order, skipping malformed entries.
pub fn decode_command_log(value: Option<Value>) -> Vec<(String, CommandEvent)> {
    let entries = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            logging::warn!("command log is not a map: {other}");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .filter_map(|(key, entry)| match serde_json::from_value(entry) {
            Ok(event) => Some((key, event)),
            Err(err) => {
                logging::warn!("skipping malformed command {key}: {err}");
                None
            }
        })
        .collect()
}

/// Drops `null` entries so they cannot delete keys when merged or written.
pub fn sanitize_props(props: PropsBag) -> PropsBag {
    props
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect()
}

#[cfg(test)]
mod tests {
    use platform_host::MemoryRealtimeBackend;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::ChangeNotifier;

    struct Client {
        registry: Rc<SyncedRegistry>,
        log: Rc<CommandLog>,
        _subs: Vec<RealtimeSubscription>,
    }

    fn client(backend: &MemoryRealtimeBackend) -> Client {
        let store: Rc<dyn RealtimeStore> = Rc::new(backend.connect());
        let registry = SyncedRegistry::new(store.clone(), ChangeNotifier::default());
        let log = CommandLog::new(store, registry.clone());
        let subs = vec![
            registry.subscribe().expect("registry"),
            log.subscribe().expect("log"),
        ];
        Client {
            registry,
            log,
            _subs: subs,
        }
    }

    fn logged(backend: &MemoryRealtimeBackend) -> Vec<CommandEvent> {
        decode_command_log(backend.snapshot(COMMAND_LOG_PATH))
            .into_iter()
            .map(|(_, event)| event)
            .collect()
    }

    #[test]
    fn launch_opens_once_and_acknowledges() {
        let backend = MemoryRealtimeBackend::new();
        let alice = client(&backend);

        let id = alice
            .log
            .launch("notepad", PropsBag::new())
            .expect("launch")
            .expect("id");

        assert_eq!(alice.registry.programs().len(), 1);
        let events = logged(&backend);
        assert_eq!(events.len(), 1);
        assert!(events[0].processed);
        assert_eq!(
            Some(events[0].program_id.clone()),
            alice.registry.find(&id).map(|p| p.global_id)
        );
    }

    #[test]
    fn launch_drops_null_props() {
        let backend = MemoryRealtimeBackend::new();
        let alice = client(&backend);
        let mut props = PropsBag::new();
        props.insert("content".to_string(), json!("hi"));
        props.insert("fileName".to_string(), Value::Null);

        let id = alice
            .log
            .launch("notepad", props)
            .expect("launch")
            .expect("id");
        let program = alice.registry.find(&id).expect("program");
        assert_eq!(program.props.get("fileName"), None);
        assert_eq!(program.props["content"], json!("hi"));
    }

    #[test]
    fn launch_icon_resolves_the_catalog() {
        let backend = MemoryRealtimeBackend::new();
        let alice = client(&backend);
        let id = alice
            .log
            .launch_icon("my-documents")
            .expect("launch")
            .expect("id");
        let program = alice.registry.find(&id).expect("program");
        assert_eq!(program.program_type, "explorer");
        assert_eq!(program.title, "My Documents");
    }

    #[test]
    fn replaying_commands_is_idempotent() {
        let backend = MemoryRealtimeBackend::new();
        let alice = client(&backend);
        let open = CommandEvent {
            action: CommandAction::Open,
            program_id: "g-42".to_string(),
            program_type: Some("calculator".to_string()),
            props: None,
            timestamp: 1,
            processed: false,
        };

        assert_eq!(apply_command(&alice.registry, &open), Ok(true));
        let once = alice.registry.programs();
        assert_eq!(apply_command(&alice.registry, &open), Ok(false));
        assert_eq!(alice.registry.programs(), once);

        let close = CommandEvent::targeting(CommandAction::Close, "g-42".to_string());
        assert_eq!(apply_command(&alice.registry, &close), Ok(true));
        assert_eq!(apply_command(&alice.registry, &close), Ok(false));
        assert!(alice.registry.programs().is_empty());
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let backend = MemoryRealtimeBackend::new();
        let alice = client(&backend);
        assert_eq!(alice.log.terminate("ghost-1"), Ok(()));
        assert_eq!(alice.log.activate("ghost-1"), Ok(()));
        assert!(logged(&backend).is_empty());
    }

    #[test]
    fn decoder_orders_by_key_and_skips_garbage() {
        let decoded = decode_command_log(Some(json!({
            "b": {"action": "focus", "programId": "g2", "timestamp": 2},
            "a": {"action": "close", "programId": "g1", "timestamp": 1},
            "c": {"action": "explode"}
        })));
        let keys: Vec<_> = decoded.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(!decoded[0].1.processed);
    }
}
