//! Window-stack helpers used by the program registry reducer.

use desktop_app_contract::{PropsBag, GLOBAL_ID_KEY};

use crate::{
    model::{ProgramInstance, WindowPosition},
    reducer::{RegistryState, ReducerError},
};

/// Minimum allowed window width.
pub const MIN_WINDOW_WIDTH: f64 = 200.0;
/// Minimum allowed window height.
pub const MIN_WINDOW_HEIGHT: f64 = 150.0;
/// Number of distinct cascade offsets before new windows wrap back to the origin.
pub const CASCADE_STEPS: usize = 8;
/// Pixel offset between cascaded windows.
pub const CASCADE_OFFSET: f64 = 20.0;

/// Hands out the next z-index from this session's counter.
pub fn take_z_index(state: &mut RegistryState) -> i64 {
    let z = state.next_z_index;
    state.next_z_index += 1;
    z
}

/// Bumps the session counter past every z-index present in the list.
///
/// Keeps newly focused windows above windows another client raised.
pub fn observe_z_indices(state: &mut RegistryState) {
    if let Some(max_z) = state.programs.iter().map(|p| p.z_index).max() {
        state.next_z_index = state.next_z_index.max(max_z.saturating_add(1));
    }
}

/// Raises `id` to a fresh z-index and clears its minimized flag.
///
/// # Errors
///
/// Returns [`ReducerError::ProgramNotFound`] when `id` is not in the list.
pub fn focus_program_internal(state: &mut RegistryState, id: &str) -> Result<(), ReducerError> {
    let index = find_program_index(state, id)?;
    let z = take_z_index(state);
    let program = &mut state.programs[index];
    program.z_index = z;
    program.is_minimized = false;
    Ok(())
}

/// Returns the list index of `id`.
///
/// # Errors
///
/// Returns [`ReducerError::ProgramNotFound`] when `id` is not in the list.
pub fn find_program_index(state: &RegistryState, id: &str) -> Result<usize, ReducerError> {
    state
        .programs
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| ReducerError::ProgramNotFound(id.to_string()))
}

/// Cascaded default position for the `open_count`-th window.
pub fn default_position(open_count: usize) -> WindowPosition {
    let step = (open_count % CASCADE_STEPS) as f64 * CASCADE_OFFSET;
    WindowPosition {
        x: 50.0 + step,
        y: 50.0 + step,
    }
}

/// Trims the props of every `program_type` instance down to its `globalId`.
pub fn reset_props_of_type(programs: &mut [ProgramInstance], program_type: &str) {
    for program in programs
        .iter_mut()
        .filter(|p| p.program_type == program_type)
    {
        let mut essential = PropsBag::new();
        if let Some(global_id) = program.props.get(GLOBAL_ID_KEY).filter(|v| !v.is_null()) {
            essential.insert(GLOBAL_ID_KEY.to_string(), global_id.clone());
        }
        program.props = essential;
    }
}

/// Shallow-merges `patch` into `props`; `null` values delete their key.
pub fn merge_props(props: &mut PropsBag, patch: PropsBag) {
    for (key, value) in patch {
        if value.is_null() {
            props.remove(&key);
        } else {
            props.insert(key, value);
        }
    }
}

/// Highest non-minimized instance.
pub fn topmost(programs: &[ProgramInstance]) -> Option<&ProgramInstance> {
    programs
        .iter()
        .filter(|p| !p.is_minimized)
        .max_by_key(|p| p.z_index)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn cascade_wraps_after_eight_windows() {
        assert_eq!(default_position(0), WindowPosition { x: 50.0, y: 50.0 });
        assert_eq!(default_position(3), WindowPosition { x: 110.0, y: 110.0 });
        assert_eq!(default_position(8), default_position(0));
    }

    #[test]
    fn merge_props_is_shallow_and_null_deletes() {
        let mut props = PropsBag::new();
        props.insert("a".to_string(), json!({"nested": 1}));
        props.insert("b".to_string(), json!(2));

        let mut patch = PropsBag::new();
        patch.insert("a".to_string(), json!({"other": 3}));
        patch.insert("b".to_string(), json!(null));
        merge_props(&mut props, patch);

        assert_eq!(serde_json::Value::Object(props), json!({"a": {"other": 3}}));
    }

    #[test]
    fn observe_z_indices_only_moves_forward() {
        let mut state = RegistryState::default();
        observe_z_indices(&mut state);
        assert_eq!(state.next_z_index, 100);
        state.next_z_index = 500;
        observe_z_indices(&mut state);
        assert_eq!(state.next_z_index, 500);
    }
}
