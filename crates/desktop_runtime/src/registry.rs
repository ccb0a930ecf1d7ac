//! Replicated program registry.
//!
//! [`SyncedRegistry`] mirrors `desktop/programs` into a local [`RegistryState`], applies every
//! mutation through [`reduce_registry`], and writes the whole list back. Concurrent writers race at
//! list granularity; the subscription echo is the single source of truth and self-corrects the
//! mirror.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use desktop_app_contract::PropsBag;
use leptos::logging;
use platform_host::{write_typed_with, RealtimeStore, RealtimeSubscription};
use serde_json::Value;

use crate::{
    error::SyncError,
    model::{ChangeNotifier, ProgramInstance, SyncSlice, WindowPosition, WindowSize, PROGRAMS_PATH},
    reducer::{reduce_registry, OpenProgramRequest, ProgramAction, RegistryState, RuntimeEffect},
    window_manager,
};

/// Program registry mirrored from the realtime backend.
pub struct SyncedRegistry {
    store: Rc<dyn RealtimeStore>,
    state: RefCell<RegistryState>,
    notifier: ChangeNotifier,
}

impl SyncedRegistry {
    /// Creates a registry over `store` with an empty mirror.
    pub fn new(store: Rc<dyn RealtimeStore>, notifier: ChangeNotifier) -> Rc<Self> {
        Rc::new(Self {
            store,
            state: RefCell::new(RegistryState::default()),
            notifier,
        })
    }

    /// Subscribes the mirror to `desktop/programs`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BackendUnavailable`] when the store rejects the subscription.
    pub fn subscribe(self: &Rc<Self>) -> Result<RealtimeSubscription, SyncError> {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.store
            .subscribe(
                PROGRAMS_PATH,
                Rc::new(move |value| {
                    if let Some(registry) = weak.upgrade() {
                        registry.apply_remote(value);
                    }
                }),
            )
            .map_err(SyncError::BackendUnavailable)
    }

    fn apply_remote(&self, value: Option<Value>) {
        let programs = decode_program_list(value);
        let result = reduce_registry(
            &mut self.state.borrow_mut(),
            ProgramAction::ReplaceList { programs },
        );
        if let Err(err) = result {
            logging::warn!("program list replace failed: {err}");
        }
        self.notifier.notify(SyncSlice::Programs);
    }

    /// Applies `action` locally and replicates the resulting list.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable, the target instance is unknown, or the
    /// list write is rejected.
    pub fn dispatch(&self, action: ProgramAction) -> Result<Vec<RuntimeEffect>, SyncError> {
        self.store
            .status()
            .ensure_available()
            .map_err(SyncError::BackendUnavailable)?;

        let (effects, snapshot) = {
            let mut state = self.state.borrow_mut();
            let effects = reduce_registry(&mut state, action)?;
            let snapshot = effects
                .contains(&RuntimeEffect::PersistProgramList)
                .then(|| state.programs.clone());
            (effects, snapshot)
        };

        if let Some(programs) = snapshot {
            self.notifier.notify(SyncSlice::Programs);
            write_typed_with(self.store.as_ref(), PROGRAMS_PATH, &programs)
                .map_err(SyncError::Transport)?;
        }

        for effect in &effects {
            if let RuntimeEffect::WindowLimitReached { message } = effect {
                logging::warn!("program open rejected: {message}");
                self.show_error(message.clone())?;
            }
        }
        Ok(effects)
    }

    /// Opens a program. Returns `None` when the window cap rejected it; the error dialog is shown
    /// instead.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn open(&self, program_type: &str, props: PropsBag) -> Result<Option<String>, SyncError> {
        let effects = self.dispatch(ProgramAction::Open(
            OpenProgramRequest::new(program_type).with_props(props),
        ))?;
        Ok(effects.into_iter().find_map(|effect| match effect {
            RuntimeEffect::ProgramOpened { id } => Some(id),
            _ => None,
        }))
    }

    /// Closes an instance, resetting same-type siblings unless `persist_props` is set.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn close(&self, id: &str, persist_props: bool) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Close {
            id: id.to_string(),
            persist_props,
        })
        .map(drop)
    }

    /// Raises an instance and restores it.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn focus(&self, id: &str) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Focus { id: id.to_string() })
            .map(drop)
    }

    /// Toggles an instance's minimized flag.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn minimize(&self, id: &str) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Minimize { id: id.to_string() })
            .map(drop)
    }

    /// Sets an instance's maximized flag.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn maximize(&self, id: &str, maximized: bool) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Maximize {
            id: id.to_string(),
            maximized,
        })
        .map(drop)
    }

    /// Moves an instance. Ignored while maximized.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn move_to(&self, id: &str, position: WindowPosition) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Move {
            id: id.to_string(),
            position,
        })
        .map(drop)
    }

    /// Resizes an instance.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn resize(&self, id: &str, size: WindowSize) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::Resize {
            id: id.to_string(),
            size,
        })
        .map(drop)
    }

    /// Minimizes every instance.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn minimize_all(&self) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::MinimizeAll).map(drop)
    }

    /// Shallow-merges `patch` into an instance's props.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn update_props(&self, id: &str, patch: PropsBag) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::UpdateProps {
            id: id.to_string(),
            patch,
        })
        .map(drop)
    }

    /// Shows `message` in the shared error dialog.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub fn show_error(&self, message: impl Into<String>) -> Result<(), SyncError> {
        self.dispatch(ProgramAction::ShowError {
            message: message.into(),
        })
        .map(drop)
    }

    /// Current mirrored list.
    pub fn programs(&self) -> Vec<ProgramInstance> {
        self.state.borrow().programs.clone()
    }

    /// Finds an instance by local id.
    pub fn find(&self, id: &str) -> Option<ProgramInstance> {
        self.state.borrow().find(id).cloned()
    }

    /// Finds an instance by cross-client correlation id.
    pub fn find_by_global_id(&self, global_id: &str) -> Option<ProgramInstance> {
        self.state.borrow().find_by_global_id(global_id).cloned()
    }

    /// First instance of `program_type`.
    pub fn find_by_type(&self, program_type: &str) -> Option<ProgramInstance> {
        self.state
            .borrow()
            .programs
            .iter()
            .find(|p| p.program_type == program_type)
            .cloned()
    }

    /// Every instance of `program_type`.
    pub fn instances_of(&self, program_type: &str) -> Vec<ProgramInstance> {
        self.state
            .borrow()
            .programs
            .iter()
            .filter(|p| p.program_type == program_type)
            .cloned()
            .collect()
    }

    /// Whether any instance of `program_type` is open.
    pub fn is_running(&self, program_type: &str) -> bool {
        self.state
            .borrow()
            .programs
            .iter()
            .any(|p| p.program_type == program_type)
    }

    /// Highest non-minimized instance.
    pub fn topmost(&self) -> Option<ProgramInstance> {
        window_manager::topmost(&self.state.borrow().programs).cloned()
    }

    /// Next z-index this session will hand out.
    pub fn next_z_index(&self) -> i64 {
        self.state.borrow().next_z_index
    }
}

/// Decodes the stored program list.
///
/// Accepts an array or a numeric-keyed object (what the backend returns for sparse arrays).
/// Malformed entries are skipped with a warning; an absent list is empty.
pub fn decode_program_list(value: Option<Value>) -> Vec<ProgramInstance> {
    let entries: Vec<Value> = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => {
            let mut indexed: Vec<(usize, Value)> = map
                .into_iter()
                .filter_map(|(key, entry)| match key.parse::<usize>() {
                    Ok(index) => Some((index, entry)),
                    Err(_) => {
                        logging::warn!("skipping non-index program list key `{key}`");
                        None
                    }
                })
                .collect();
            indexed.sort_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, entry)| entry).collect()
        }
        Some(other) => {
            logging::warn!("program list is not a list: {other}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|entry| !entry.is_null())
        .filter_map(
            |entry| match serde_json::from_value::<ProgramInstance>(entry) {
                Ok(program) => Some(program),
                Err(err) => {
                    logging::warn!("skipping malformed program entry: {err}");
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use desktop_app_contract::GLOBAL_ID_KEY;
    use platform_host::{MemoryRealtimeBackend, UnavailableRealtimeStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::{ERROR_DIALOG_TYPE, WINDOW_LIMIT, WINDOW_LIMIT_MESSAGE};

    fn connected(backend: &MemoryRealtimeBackend) -> (Rc<SyncedRegistry>, RealtimeSubscription) {
        let registry = SyncedRegistry::new(Rc::new(backend.connect()), ChangeNotifier::default());
        let sub = registry.subscribe().expect("subscribe");
        (registry, sub)
    }

    #[test]
    fn open_writes_the_full_list() {
        let backend = MemoryRealtimeBackend::new();
        let (registry, _sub) = connected(&backend);

        let id = registry
            .open("notepad", PropsBag::new())
            .expect("open")
            .expect("id");

        let stored = decode_program_list(backend.snapshot(PROGRAMS_PATH));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(registry.programs(), stored);
    }

    #[test]
    fn second_client_mirrors_the_list() {
        let backend = MemoryRealtimeBackend::new();
        let (alice, _a) = connected(&backend);
        let (bob, _b) = connected(&backend);

        let id = alice
            .open("calculator", PropsBag::new())
            .expect("open")
            .expect("id");
        assert_eq!(bob.find(&id).map(|p| p.program_type), Some("calculator".to_string()));

        bob.focus(&id).expect("focus from bob");
        assert!(alice.find(&id).expect("program").z_index > 100);
    }

    #[test]
    fn cap_rejection_surfaces_the_error_dialog() {
        let backend = MemoryRealtimeBackend::new();
        let (registry, _sub) = connected(&backend);
        for _ in 0..WINDOW_LIMIT {
            registry.open("paint", PropsBag::new()).expect("open");
        }

        let rejected = registry.open("paint", PropsBag::new()).expect("open");
        assert_eq!(rejected, None);

        let dialog = registry.find_by_type(ERROR_DIALOG_TYPE).expect("dialog");
        assert_eq!(dialog.props["message"], json!(WINDOW_LIMIT_MESSAGE));
        assert_eq!(registry.instances_of("paint").len(), WINDOW_LIMIT);
    }

    #[test]
    fn unavailable_backend_refuses_mutations() {
        let registry = SyncedRegistry::new(
            Rc::new(UnavailableRealtimeStore::new("offline")),
            ChangeNotifier::default(),
        );
        assert_eq!(
            registry.open("notepad", PropsBag::new()),
            Err(SyncError::BackendUnavailable("offline".to_string()))
        );
        assert!(registry.programs().is_empty());
    }

    #[test]
    fn remote_changes_notify_the_listener() {
        let backend = MemoryRealtimeBackend::new();
        let notifier = ChangeNotifier::default();
        let count = Rc::new(Cell::new(0));
        let counted = count.clone();
        notifier.set_listener(move |slice| {
            if slice == SyncSlice::Programs {
                counted.set(counted.get() + 1);
            }
        });
        let registry = SyncedRegistry::new(Rc::new(backend.connect()), notifier);
        let _sub = registry.subscribe().expect("subscribe");
        let initial = count.get();

        let (other, _o) = connected(&backend);
        other.open("notepad", PropsBag::new()).expect("open");

        assert!(count.get() > initial);
        assert_eq!(registry.programs().len(), 1);
    }

    #[test]
    fn queries_by_type_global_id_and_topmost() {
        let backend = MemoryRealtimeBackend::new();
        let (registry, _sub) = connected(&backend);
        let mut props = PropsBag::new();
        props.insert(GLOBAL_ID_KEY.to_string(), json!("g-1"));
        let a = registry.open("notepad", props).expect("open").expect("id");
        let b = registry
            .open("calculator", PropsBag::new())
            .expect("open")
            .expect("id");

        assert!(registry.is_running("notepad"));
        assert!(!registry.is_running("paint"));
        assert_eq!(registry.find_by_global_id("g-1").map(|p| p.id), Some(a.clone()));
        assert_eq!(registry.topmost().map(|p| p.id), Some(b.clone()));

        registry.minimize(&b).expect("minimize");
        assert_eq!(registry.topmost().map(|p| p.id), Some(a));
    }

    #[test]
    fn decoder_accepts_index_maps_and_skips_garbage() {
        let list = decode_program_list(Some(json!({
            "1": {"id": "paint-2", "type": "paint"},
            "0": {"id": "notepad-1", "type": "notepad"},
            "2": {"type": "missing-id"},
            "3": 42
        })));
        let ids: Vec<_> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["notepad-1", "paint-2"]);

        assert!(decode_program_list(None).is_empty());
        assert!(decode_program_list(Some(json!("nope"))).is_empty());
    }
}
