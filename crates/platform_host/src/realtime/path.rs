//! Path and JSON-tree helpers shared by realtime store backends.
//!
//! Realtime paths are `/`-separated keys into one JSON tree. Stored trees never contain `null`
//! leaves or empty objects: writing `null` deletes a key and parents left empty disappear with it.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::RealtimeQuery;

/// Splits a realtime path into its non-empty segments.
///
/// Leading, trailing, and repeated slashes are ignored, so `"/desktop//programs/"` and
/// `"desktop/programs"` address the same node.
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins a parent path and a child key into one normalized realtime path.
pub fn join_path(parent: &str, child: &str) -> String {
    let mut segments = path_segments(parent);
    segments.extend(path_segments(child));
    segments.join("/")
}

/// Returns whether a change at `changed` is visible to a listener at `listener`.
///
/// That is the case when either path is an ancestor of (or equal to) the other.
pub fn paths_overlap(listener: &[String], changed: &[String]) -> bool {
    listener
        .iter()
        .zip(changed.iter())
        .all(|(left, right)| left == right)
}

/// Reads the node at `segments`, descending through objects and array indices.
pub fn value_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::Null => None,
        other => Some(other),
    }
}

/// Replaces the node at `segments` with `value` (or deletes it on `None`) and prunes the tree.
pub fn set_at(root: &mut Value, segments: &[String], value: Option<Value>) {
    let replacement = value.and_then(prune);
    let Some((head, rest)) = segments.split_first() else {
        *root = replacement.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    if let Value::Array(items) = root {
        *root = Value::Object(array_to_object(std::mem::take(items)));
    }
    if !root.is_object() {
        if replacement.is_none() {
            return;
        }
        *root = Value::Object(Map::new());
    }
    let Value::Object(map) = root else {
        return;
    };

    if rest.is_empty() {
        match replacement {
            Some(value) => {
                map.insert(head.clone(), value);
            }
            None => {
                map.remove(head);
            }
        }
        return;
    }

    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    set_at(child, rest, replacement);
    if is_empty_node(child) {
        map.remove(head);
    }
}

/// Normalizes a value into its stored form: `null` children and empty containers vanish.
///
/// Arrays keep their shape when every element survives; an array with holes becomes an object
/// keyed by the surviving indices.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) => {
            let len = items.len();
            let kept: Vec<(usize, Value)> = items
                .into_iter()
                .enumerate()
                .filter_map(|(idx, child)| prune(child).map(|child| (idx, child)))
                .collect();
            if kept.is_empty() {
                None
            } else if kept.len() == len {
                Some(Value::Array(kept.into_iter().map(|(_, v)| v).collect()))
            } else {
                Some(Value::Object(
                    kept.into_iter()
                        .map(|(idx, child)| (idx.to_string(), child))
                        .collect(),
                ))
            }
        }
        other => Some(other),
    }
}

/// Applies a top-N-by-child query to a snapshot.
///
/// Children are ordered by the value of `order_by_child` (missing values first, then booleans,
/// numbers, strings, and objects; ties broken by key) and the last `limit_to_last` are kept.
pub fn apply_query(snapshot: Option<&Value>, query: &RealtimeQuery) -> Option<Value> {
    let children: Vec<(String, Value)> = match snapshot? {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, v)| (idx.to_string(), v.clone()))
            .collect(),
        _ => return None,
    };

    let mut ordered = children;
    ordered.sort_by(|(left_key, left), (right_key, right)| {
        compare_child(
            left.get(&query.order_by_child),
            right.get(&query.order_by_child),
        )
        .then_with(|| left_key.cmp(right_key))
    });

    let skip = ordered.len().saturating_sub(query.limit_to_last);
    let kept: Map<String, Value> = ordered.into_iter().skip(skip).collect();
    (!kept.is_empty()).then_some(Value::Object(kept))
}

fn compare_child(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(false)) => 1,
            Some(Value::Bool(true)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn array_to_object(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, value)| (idx.to_string(), value))
        .collect()
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path_segments(path)
    }

    #[test]
    fn path_segments_ignore_redundant_slashes() {
        assert_eq!(segs("/desktop//programs/"), vec!["desktop", "programs"]);
        assert!(segs("").is_empty());
        assert_eq!(join_path("cursors/", "/u1"), "cursors/u1");
    }

    #[test]
    fn overlap_covers_ancestors_and_descendants() {
        assert!(paths_overlap(&segs("desktop"), &segs("desktop/iconSize")));
        assert!(paths_overlap(&segs("desktop/iconSize"), &segs("desktop")));
        assert!(paths_overlap(&segs(""), &segs("system/taskbar")));
        assert!(!paths_overlap(&segs("desktop/iconSize"), &segs("desktop/wallpaper")));
    }

    #[test]
    fn set_at_deletes_on_none_and_prunes_empty_parents() {
        let mut root = json!({});
        set_at(&mut root, &segs("cursors/u1"), Some(json!({"x": 1})));
        assert_eq!(root, json!({"cursors": {"u1": {"x": 1}}}));

        set_at(&mut root, &segs("cursors/u1"), None);
        assert_eq!(root, json!({}));
    }

    #[test]
    fn set_at_writing_null_deletes_the_key() {
        let mut root = json!({"desktop": {"wallpaper": "a.webp", "iconSize": "small"}});
        set_at(&mut root, &segs("desktop/wallpaper"), Some(Value::Null));
        assert_eq!(root, json!({"desktop": {"iconSize": "small"}}));
    }

    #[test]
    fn child_write_into_array_converts_to_keyed_object() {
        let mut root = json!({"list": ["a", "b"]});
        set_at(&mut root, &segs("list/1"), Some(json!("c")));
        assert_eq!(root, json!({"list": {"0": "a", "1": "c"}}));
        assert_eq!(value_at(&root, &segs("list/1")), Some(&json!("c")));
    }

    #[test]
    fn prune_turns_holey_arrays_into_objects() {
        assert_eq!(prune(json!([1, null, 3])), Some(json!({"0": 1, "2": 3})));
        assert_eq!(prune(json!({"a": {}, "b": null})), None);
        assert_eq!(prune(json!(["x"])), Some(json!(["x"])));
    }

    #[test]
    fn apply_query_keeps_the_most_recent_children() {
        let snapshot = json!({
            "a": {"lastActive": 30},
            "b": {"lastActive": 10},
            "c": {"lastActive": 20},
            "d": {"name": "no timestamp"},
        });
        let query = RealtimeQuery::limit_to_last("lastActive", 2);
        assert_eq!(
            apply_query(Some(&snapshot), &query),
            Some(json!({"a": {"lastActive": 30}, "c": {"lastActive": 20}}))
        );
        assert_eq!(apply_query(None, &query), None);
    }
}
