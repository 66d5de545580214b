//! Structural-sharing update engine.
//!
//! A write walks from the root down to the target slot and, on the way back
//! up, replaces every ancestor by a shallow copy whose single changed slot
//! points at the rebuilt child. Siblings off the path are carried over by
//! reference. When the leaf result is [`Value::same`] as the current value
//! nothing is rebuilt and the caller keeps the original root.

use crate::{Key, Mapping, Path, Value};
use std::sync::Arc;

/// Read the value at `path` below `root`.
///
/// Absent intermediates and scalars along the way yield `None`; reads never
/// fail.
pub fn get_at<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.child(key))
}

/// Replace the value at `path`, returning the new root.
///
/// Returns `None` when `value` is already the value at `path`; the original
/// root is then still current and nothing was allocated.
///
/// ```
/// use easm_state::{path, update_at, Value};
/// use serde_json::json;
///
/// let root = Value::from(json!({"a": {"b": 1}, "c": [1, 2]}));
/// let next = update_at(&root, &path!("a", "b"), Value::from(2)).unwrap();
///
/// assert_eq!(next.to_json(), json!({"a": {"b": 2}, "c": [1, 2]}));
/// assert!(next.get("c").unwrap().same(root.get("c").unwrap()));
/// assert_eq!(root.to_json(), json!({"a": {"b": 1}, "c": [1, 2]}));
/// ```
pub fn update_at(root: &Value, path: &Path, value: Value) -> Option<Value> {
    update_with(root, path, |_| (Some(value), ())).0
}

/// Rewrite the value at `path` through `leaf`.
///
/// `leaf` is called exactly once with the current value (if any) and
/// returns the replacement, or `None` to leave the tree untouched, along
/// with a caller-defined output that is passed back unchanged.
pub fn update_with<F, R>(root: &Value, path: &Path, leaf: F) -> (Option<Value>, R)
where
    F: FnOnce(Option<&Value>) -> (Option<Value>, R),
{
    write(Some(root), path.keys(), leaf)
}

fn write<F, R>(node: Option<&Value>, keys: &[Key], leaf: F) -> (Option<Value>, R)
where
    F: FnOnce(Option<&Value>) -> (Option<Value>, R),
{
    match keys.split_first() {
        None => {
            let (next, output) = leaf(node);
            match (node, next) {
                (Some(current), Some(next)) if current.same(&next) => (None, output),
                (_, next) => (next, output),
            }
        }
        Some((key, rest)) => {
            let child = node.and_then(|n| n.child(key));
            let (next_child, output) = write(child, rest, leaf);
            (next_child.map(|c| copy_with(node, key, c)), output)
        }
    }
}

/// Longest run of `Null` padding a write past the end of a sequence may
/// add. Writes further out turn the sequence into a mapping keyed by the
/// decimal indexes, which is how a sparse array reads.
pub const MAX_SEQUENCE_GAP: usize = 1024;

/// Shallow-copy `node` with the slot `key` set to `child`.
///
/// Absent or scalar nodes are replaced by a fresh container shaped by the
/// key: a nearby index materialises a sequence, anything else a mapping.
fn copy_with(node: Option<&Value>, key: &Key, child: Value) -> Value {
    match node {
        Some(Value::Mapping(map)) => {
            let mut next = (**map).clone();
            next.insert(key.to_map_key(), child);
            Value::Mapping(Arc::new(next))
        }
        Some(Value::Sequence(seq)) => match key.as_index() {
            Some(index) if within_gap(seq.len(), index) => {
                let mut next = (**seq).clone();
                set_index(&mut next, index, child);
                Value::Sequence(Arc::new(next))
            }
            _ => {
                // Keep the elements reachable by their decimal names and
                // continue as a mapping.
                let mut next = sequence_as_mapping(seq);
                next.insert(key.to_map_key(), child);
                Value::Mapping(Arc::new(next))
            }
        },
        _ => match key {
            Key::Index(index) if within_gap(0, *index) => {
                let mut next = Vec::with_capacity(index.saturating_add(1));
                set_index(&mut next, *index, child);
                Value::Sequence(Arc::new(next))
            }
            _ => {
                let mut next = Mapping::new();
                next.insert(key.to_map_key(), child);
                Value::Mapping(Arc::new(next))
            }
        },
    }
}

fn within_gap(len: usize, index: usize) -> bool {
    index.saturating_sub(len) <= MAX_SEQUENCE_GAP
}

fn sequence_as_mapping(seq: &[Value]) -> Mapping {
    seq.iter()
        .enumerate()
        .map(|(i, v)| (Key::Name(i.to_string()), v.clone()))
        .collect()
}

/// Caller guarantees `index` is within [`MAX_SEQUENCE_GAP`] of the end.
fn set_index(seq: &mut Vec<Value>, index: usize, child: Value) {
    if index < seq.len() {
        seq[index] = child;
    } else {
        seq.resize(index, Value::Null);
        seq.push(child);
    }
}
