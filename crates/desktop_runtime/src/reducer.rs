//! Program registry actions, side-effect intents, and transition logic.
//!
//! The reducer is pure: it mutates a local [`RegistryState`] and reports what must be replicated.
//! Every list change yields [`RuntimeEffect::PersistProgramList`], which the synced registry turns
//! into one full-list write of `desktop/programs`.

use desktop_app_contract::{PropsBag, GLOBAL_ID_KEY, PERSIST_PROPS_KEY};
use platform_host::next_monotonic_timestamp_ms;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    model::{
        ProgramInstance, WindowPosition, WindowSize, ERROR_DIALOG_TYPE, WINDOW_LIMIT,
        WINDOW_LIMIT_MESSAGE, Z_INDEX_BASE,
    },
    program_library::window_metadata,
    window_manager::{
        default_position, find_program_index, focus_program_internal, merge_props,
        observe_z_indices, reset_props_of_type, take_z_index, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH,
    },
};

#[derive(Debug, Clone, PartialEq)]
/// Client-local registry state: the mirrored list plus this session's z-index counter.
pub struct RegistryState {
    /// Mirrored program list.
    pub programs: Vec<ProgramInstance>,
    /// Next z-index this session hands out.
    pub next_z_index: i64,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            programs: Vec::new(),
            next_z_index: Z_INDEX_BASE,
        }
    }
}

impl RegistryState {
    /// Counts open instances that are subject to [`WINDOW_LIMIT`].
    pub fn capped_count(&self) -> usize {
        self.programs
            .iter()
            .filter(|p| p.program_type != ERROR_DIALOG_TYPE)
            .count()
    }

    /// Finds an instance by client-local id.
    pub fn find(&self, id: &str) -> Option<&ProgramInstance> {
        self.programs.iter().find(|p| p.id == id)
    }

    /// Finds an instance by cross-client correlation id.
    pub fn find_by_global_id(&self, global_id: &str) -> Option<&ProgramInstance> {
        self.programs.iter().find(|p| p.global_id == global_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Request to open a program.
pub struct OpenProgramRequest {
    /// Program type tag.
    pub program_type: String,
    /// Initial props; a `globalId` key is honored as the correlation id.
    pub props: PropsBag,
}

impl OpenProgramRequest {
    /// Creates a request with empty props.
    pub fn new(program_type: impl Into<String>) -> Self {
        Self {
            program_type: program_type.into(),
            props: PropsBag::new(),
        }
    }

    /// Replaces the initial props.
    pub fn with_props(mut self, props: PropsBag) -> Self {
        self.props = props;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_registry`].
pub enum ProgramAction {
    /// Open a new instance.
    Open(OpenProgramRequest),
    /// Remove an instance.
    Close {
        /// Instance to close.
        id: String,
        /// Skip resetting other instances of the same type.
        persist_props: bool,
    },
    /// Raise an instance and clear its minimized flag.
    Focus {
        /// Instance to focus.
        id: String,
    },
    /// Toggle an instance's minimized flag.
    Minimize {
        /// Instance to toggle.
        id: String,
    },
    /// Set an instance's maximized flag.
    Maximize {
        /// Instance to change.
        id: String,
        /// New flag value.
        maximized: bool,
    },
    /// Move an instance. No-op while maximized.
    Move {
        /// Instance to move.
        id: String,
        /// New position.
        position: WindowPosition,
    },
    /// Resize an instance, clamped to the minimum window size.
    Resize {
        /// Instance to resize.
        id: String,
        /// New size.
        size: WindowSize,
    },
    /// Minimize every instance.
    MinimizeAll,
    /// Shallow-merge keys into an instance's props.
    UpdateProps {
        /// Instance to update.
        id: String,
        /// Keys to merge.
        patch: PropsBag,
    },
    /// Update the existing error dialog or open a new one.
    ShowError {
        /// Message text.
        message: String,
    },
    /// Replace the mirrored list with the canonical remote list.
    ReplaceList {
        /// Decoded remote list.
        programs: Vec<ProgramInstance>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Side-effect intents emitted by [`reduce_registry`].
pub enum RuntimeEffect {
    /// Write the full list to `desktop/programs`.
    PersistProgramList,
    /// An instance was created.
    ProgramOpened {
        /// New instance id.
        id: String,
    },
    /// An open was rejected by [`WINDOW_LIMIT`]; the message should be surfaced.
    WindowLimitReached {
        /// User-facing message.
        message: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer errors for invalid actions.
pub enum ReducerError {
    /// The target instance id was not found in the current list.
    #[error("program not found: {0}")]
    ProgramNotFound(String),
}

/// Applies a [`ProgramAction`] to the registry state and collects resulting side effects.
///
/// # Errors
///
/// Returns [`ReducerError::ProgramNotFound`] when an action references a missing instance.
pub fn reduce_registry(
    state: &mut RegistryState,
    action: ProgramAction,
) -> Result<Vec<RuntimeEffect>, ReducerError> {
    let mut effects = Vec::new();
    match action {
        ProgramAction::Open(req) => {
            if req.program_type != ERROR_DIALOG_TYPE && state.capped_count() >= WINDOW_LIMIT {
                effects.push(RuntimeEffect::WindowLimitReached {
                    message: WINDOW_LIMIT_MESSAGE.to_string(),
                });
                return Ok(effects);
            }
            let id = open_program_internal(state, req);
            effects.push(RuntimeEffect::PersistProgramList);
            effects.push(RuntimeEffect::ProgramOpened { id });
        }
        ProgramAction::Close { id, persist_props } => {
            let index = find_program_index(state, &id)?;
            let closed = state.programs.remove(index);
            if !persist_props {
                reset_props_of_type(&mut state.programs, &closed.program_type);
            }
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::Focus { id } => {
            focus_program_internal(state, &id)?;
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::Minimize { id } => {
            let index = find_program_index(state, &id)?;
            let program = &mut state.programs[index];
            program.is_minimized = !program.is_minimized;
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::Maximize { id, maximized } => {
            let index = find_program_index(state, &id)?;
            state.programs[index].is_maximized = maximized;
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::Move { id, position } => {
            let index = find_program_index(state, &id)?;
            let program = &mut state.programs[index];
            if !program.is_maximized {
                program.position = position;
                effects.push(RuntimeEffect::PersistProgramList);
            }
        }
        ProgramAction::Resize { id, size } => {
            let index = find_program_index(state, &id)?;
            state.programs[index].size = size.clamped_min(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT);
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::MinimizeAll => {
            for program in &mut state.programs {
                program.is_minimized = true;
            }
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::UpdateProps { id, patch } => {
            let index = find_program_index(state, &id)?;
            merge_props(&mut state.programs[index].props, patch);
            effects.push(RuntimeEffect::PersistProgramList);
        }
        ProgramAction::ShowError { message } => {
            let existing = state
                .programs
                .iter()
                .position(|p| p.program_type == ERROR_DIALOG_TYPE);
            match existing {
                Some(index) => {
                    state.programs[index]
                        .props
                        .insert("message".to_string(), Value::String(message));
                    let id = state.programs[index].id.clone();
                    focus_program_internal(state, &id)?;
                }
                None => {
                    let mut props = PropsBag::new();
                    props.insert("message".to_string(), Value::String(message));
                    props.insert(PERSIST_PROPS_KEY.to_string(), json!(true));
                    let id = open_program_internal(
                        state,
                        OpenProgramRequest::new(ERROR_DIALOG_TYPE).with_props(props),
                    );
                    effects.push(RuntimeEffect::ProgramOpened { id });
                }
            }
            effects.insert(0, RuntimeEffect::PersistProgramList);
        }
        ProgramAction::ReplaceList { programs } => {
            state.programs = programs;
            observe_z_indices(state);
        }
    }
    Ok(effects)
}

fn open_program_internal(state: &mut RegistryState, req: OpenProgramRequest) -> String {
    let OpenProgramRequest {
        program_type,
        mut props,
    } = req;
    let id = format!("{program_type}-{}", next_monotonic_timestamp_ms());
    let global_id = props
        .get(GLOBAL_ID_KEY)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    props.insert(GLOBAL_ID_KEY.to_string(), Value::String(global_id.clone()));

    let (title, icon) = window_metadata(&program_type, &props);
    let position = default_position(state.programs.len());
    let z_index = take_z_index(state);
    state.programs.push(ProgramInstance {
        id: id.clone(),
        global_id,
        program_type,
        title,
        icon,
        is_open: true,
        z_index,
        position,
        size: WindowSize::default(),
        is_maximized: false,
        is_minimized: false,
        props,
    });
    id
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn open(state: &mut RegistryState, program_type: &str) -> String {
        reduce_registry(
            state,
            ProgramAction::Open(OpenProgramRequest::new(program_type)),
        )
        .expect("open program");
        state.programs.last().expect("program").id.clone()
    }

    fn bag(pairs: &[(&str, Value)]) -> PropsBag {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn open_assigns_metadata_geometry_and_global_id() {
        let mut state = RegistryState::default();
        let effects = reduce_registry(
            &mut state,
            ProgramAction::Open(OpenProgramRequest::new("notepad")),
        )
        .expect("open");

        let program = &state.programs[0];
        assert!(program.id.starts_with("notepad-"));
        assert_eq!(program.global_id, program.id);
        assert_eq!(program.props[GLOBAL_ID_KEY], json!(program.id));
        assert_eq!(program.title, "Notepad");
        assert_eq!(program.z_index, 100);
        assert_eq!(program.position, WindowPosition { x: 50.0, y: 50.0 });
        assert_eq!(program.size, WindowSize::default());
        assert_eq!(
            effects,
            vec![
                RuntimeEffect::PersistProgramList,
                RuntimeEffect::ProgramOpened {
                    id: program.id.clone()
                }
            ]
        );
    }

    #[test]
    fn open_honors_supplied_global_id() {
        let mut state = RegistryState::default();
        reduce_registry(
            &mut state,
            ProgramAction::Open(
                OpenProgramRequest::new("paint").with_props(bag(&[(GLOBAL_ID_KEY, json!("g-7"))])),
            ),
        )
        .expect("open");
        assert_eq!(state.programs[0].global_id, "g-7");
        assert_ne!(state.programs[0].id, "g-7");
    }

    #[test]
    fn seventeenth_program_is_rejected_without_mutation() {
        let mut state = RegistryState::default();
        for _ in 0..WINDOW_LIMIT {
            open(&mut state, "calculator");
        }
        let before = state.clone();

        let effects = reduce_registry(
            &mut state,
            ProgramAction::Open(OpenProgramRequest::new("calculator")),
        )
        .expect("open");

        assert_eq!(state, before);
        assert_eq!(
            effects,
            vec![RuntimeEffect::WindowLimitReached {
                message: WINDOW_LIMIT_MESSAGE.to_string()
            }]
        );

        open(&mut state, ERROR_DIALOG_TYPE);
        assert_eq!(state.programs.len(), WINDOW_LIMIT + 1);
    }

    #[test]
    fn focus_z_indices_strictly_increase_within_a_session() {
        let mut state = RegistryState::default();
        let a = open(&mut state, "notepad");
        let b = open(&mut state, "paint");
        let mut highest = state.programs.iter().map(|p| p.z_index).max().unwrap_or(0);

        for id in [&a, &b, &a, &a, &b] {
            reduce_registry(&mut state, ProgramAction::Focus { id: id.clone() }).expect("focus");
            let z = state.find(id).expect("program").z_index;
            assert!(z > highest);
            highest = z;
        }
    }

    #[test]
    fn focus_clears_minimized_and_minimize_toggles() {
        let mut state = RegistryState::default();
        let id = open(&mut state, "notepad");

        reduce_registry(&mut state, ProgramAction::Minimize { id: id.clone() }).expect("min");
        assert!(state.programs[0].is_minimized);
        reduce_registry(&mut state, ProgramAction::Minimize { id: id.clone() }).expect("min");
        assert!(!state.programs[0].is_minimized);

        reduce_registry(&mut state, ProgramAction::MinimizeAll).expect("min all");
        assert!(state.programs[0].is_minimized);
        reduce_registry(&mut state, ProgramAction::Focus { id }).expect("focus");
        assert!(!state.programs[0].is_minimized);
    }

    #[test]
    fn update_props_merges_shallowly() {
        let mut state = RegistryState::default();
        let id = open(&mut state, "notepad");
        state.programs[0].props = PropsBag::new();

        reduce_registry(
            &mut state,
            ProgramAction::UpdateProps {
                id: id.clone(),
                patch: bag(&[("a", json!(1))]),
            },
        )
        .expect("update a");
        reduce_registry(
            &mut state,
            ProgramAction::UpdateProps {
                id,
                patch: bag(&[("b", json!(2))]),
            },
        )
        .expect("update b");

        assert_eq!(state.programs[0].props, bag(&[("a", json!(1)), ("b", json!(2))]));
    }

    #[test]
    fn close_resets_other_instances_of_the_same_type() {
        let mut state = RegistryState::default();
        let a = open(&mut state, "notepad");
        open(&mut state, "notepad");
        let calc = open(&mut state, "calculator");
        state.programs[0].props = bag(&[("content", json!("hello")), (GLOBAL_ID_KEY, json!("g1"))]);
        state.programs[1].props = bag(&[("content", json!("world")), (GLOBAL_ID_KEY, json!("g2"))]);
        state.programs[2].props = bag(&[("display", json!("42"))]);

        reduce_registry(
            &mut state,
            ProgramAction::Close {
                id: a,
                persist_props: false,
            },
        )
        .expect("close");

        assert_eq!(state.programs.len(), 2);
        assert_eq!(state.programs[0].props, bag(&[(GLOBAL_ID_KEY, json!("g2"))]));
        assert_eq!(
            state.find(&calc).expect("calculator").props,
            bag(&[("display", json!("42"))])
        );
    }

    #[test]
    fn close_with_persist_props_keeps_siblings() {
        let mut state = RegistryState::default();
        let a = open(&mut state, "notepad");
        open(&mut state, "notepad");
        state.programs[1].props = bag(&[("content", json!("keep"))]);

        reduce_registry(
            &mut state,
            ProgramAction::Close {
                id: a,
                persist_props: true,
            },
        )
        .expect("close");
        assert_eq!(state.programs[0].props, bag(&[("content", json!("keep"))]));
    }

    #[test]
    fn move_is_ignored_while_maximized_and_resize_clamps() {
        let mut state = RegistryState::default();
        let id = open(&mut state, "paint");
        reduce_registry(
            &mut state,
            ProgramAction::Maximize {
                id: id.clone(),
                maximized: true,
            },
        )
        .expect("maximize");

        let effects = reduce_registry(
            &mut state,
            ProgramAction::Move {
                id: id.clone(),
                position: WindowPosition { x: 300.0, y: 10.0 },
            },
        )
        .expect("move");
        assert!(effects.is_empty());
        assert_eq!(state.programs[0].position, WindowPosition { x: 50.0, y: 50.0 });

        reduce_registry(
            &mut state,
            ProgramAction::Resize {
                id,
                size: WindowSize {
                    width: 10.0,
                    height: 900.0,
                },
            },
        )
        .expect("resize");
        assert_eq!(
            state.programs[0].size,
            WindowSize {
                width: MIN_WINDOW_WIDTH,
                height: 900.0
            }
        );
    }

    #[test]
    fn show_error_reuses_the_existing_dialog() {
        let mut state = RegistryState::default();
        reduce_registry(
            &mut state,
            ProgramAction::ShowError {
                message: "first".to_string(),
            },
        )
        .expect("show");
        let dialog_z = state.programs[0].z_index;
        assert_eq!(state.programs[0].props[PERSIST_PROPS_KEY], json!(true));

        reduce_registry(
            &mut state,
            ProgramAction::ShowError {
                message: "second".to_string(),
            },
        )
        .expect("show again");

        assert_eq!(state.programs.len(), 1);
        assert_eq!(state.programs[0].props["message"], json!("second"));
        assert!(state.programs[0].z_index > dialog_z);
    }

    #[test]
    fn missing_program_is_an_error() {
        let mut state = RegistryState::default();
        assert_eq!(
            reduce_registry(
                &mut state,
                ProgramAction::Focus {
                    id: "ghost".to_string()
                }
            ),
            Err(ReducerError::ProgramNotFound("ghost".to_string()))
        );
    }

    #[test]
    fn replace_list_keeps_local_z_counter_ahead() {
        let mut state = RegistryState::default();
        let mut remote = RegistryState::default();
        let id = open(&mut remote, "notepad");
        remote.programs[0].z_index = 240;

        reduce_registry(
            &mut state,
            ProgramAction::ReplaceList {
                programs: remote.programs.clone(),
            },
        )
        .expect("replace");
        reduce_registry(&mut state, ProgramAction::Focus { id: id.clone() }).expect("focus");

        assert_eq!(state.find(&id).expect("program").z_index, 241);
    }
}
