//! Store operations.
//!
//! Each operation describes one change at one address. Operations are
//! applied through the update engine, so they inherit structural sharing and
//! the same-reference no-op.

use crate::{Path, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single store operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Replace the value at the path.
    ///
    /// Creates intermediate containers if they don't exist.
    Set {
        /// Target path.
        path: Path,
        /// Value to write.
        value: Value,
    },

    /// Shallow-merge a mapping into the mapping at the path.
    ///
    /// An absent or non-mapping target is treated as empty.
    Merge {
        /// Target path.
        path: Path,
        /// Entries to merge. Non-mapping values replace the target.
        value: Value,
    },

    /// Append to the sequence at the path.
    ///
    /// No-op if the target is absent or not a sequence.
    Push {
        /// Target path (must be a sequence).
        path: Path,
        /// Element to append.
        value: Value,
    },

    /// Prepend to the sequence at the path.
    Unshift {
        /// Target path (must be a sequence).
        path: Path,
        /// Element to prepend.
        value: Value,
    },

    /// Remove the last element of the sequence at the path.
    Pop {
        /// Target path (must be a sequence).
        path: Path,
    },

    /// Remove the first element of the sequence at the path.
    Shift {
        /// Target path (must be a sequence).
        path: Path,
    },
}

/// What an applied operation hands back to its caller.
#[derive(Clone, Debug, PartialEq)]
pub enum OpOutput {
    /// `Set`/`Merge`: the value now stored at the path.
    Value(Value),
    /// `Push`/`Unshift`: the sequence length after the write (0 if nothing
    /// was written).
    Length(usize),
    /// `Pop`/`Shift`: the removed element.
    Removed(Option<Value>),
}

impl OpOutput {
    /// The length carried by `Push`/`Unshift` output.
    pub fn length(&self) -> Option<usize> {
        match self {
            OpOutput::Length(n) => Some(*n),
            _ => None,
        }
    }

    /// Consume into the carried value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            OpOutput::Value(v) => Some(v),
            OpOutput::Removed(v) => v,
            OpOutput::Length(_) => None,
        }
    }
}

impl Op {
    /// Create a Set operation.
    #[inline]
    pub fn set(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a Merge operation.
    #[inline]
    pub fn merge(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Merge {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a Push operation.
    #[inline]
    pub fn push(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Push {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create an Unshift operation.
    #[inline]
    pub fn unshift(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Unshift {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a Pop operation.
    #[inline]
    pub fn pop(path: impl Into<Path>) -> Self {
        Op::Pop { path: path.into() }
    }

    /// Create a Shift operation.
    #[inline]
    pub fn shift(path: impl Into<Path>) -> Self {
        Op::Shift { path: path.into() }
    }

    /// Get the path this operation targets.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Op::Set { path, .. }
            | Op::Merge { path, .. }
            | Op::Push { path, .. }
            | Op::Unshift { path, .. }
            | Op::Pop { path }
            | Op::Shift { path } => path,
        }
    }

    /// Get a mutable reference to the path.
    #[inline]
    pub fn path_mut(&mut self) -> &mut Path {
        match self {
            Op::Set { path, .. }
            | Op::Merge { path, .. }
            | Op::Push { path, .. }
            | Op::Unshift { path, .. }
            | Op::Pop { path }
            | Op::Shift { path } => path,
        }
    }

    /// Get the operation name.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Set { .. } => "set",
            Op::Merge { .. } => "merge",
            Op::Push { .. } => "push",
            Op::Unshift { .. } => "unshift",
            Op::Pop { .. } => "pop",
            Op::Shift { .. } => "shift",
        }
    }

    /// Compute the replacement for the target slot.
    ///
    /// Returns the new slot value (`None` leaves the slot untouched) and the
    /// caller-facing output.
    pub(crate) fn apply_leaf(&self, current: Option<&Value>) -> (Option<Value>, OpOutput) {
        match self {
            Op::Set { value, .. } => (Some(value.clone()), OpOutput::Value(value.clone())),
            Op::Merge { value, .. } => {
                let merged = merge_values(current, value);
                (Some(merged.clone()), OpOutput::Value(merged))
            }
            Op::Push { value, .. } => match current.and_then(Value::as_sequence) {
                Some(seq) => {
                    let mut next = seq.clone();
                    next.push(value.clone());
                    let len = next.len();
                    (Some(Value::Sequence(Arc::new(next))), OpOutput::Length(len))
                }
                None => (None, OpOutput::Length(0)),
            },
            Op::Unshift { value, .. } => match current.and_then(Value::as_sequence) {
                Some(seq) => {
                    let mut next = Vec::with_capacity(seq.len() + 1);
                    next.push(value.clone());
                    next.extend(seq.iter().cloned());
                    let len = next.len();
                    (Some(Value::Sequence(Arc::new(next))), OpOutput::Length(len))
                }
                None => (None, OpOutput::Length(0)),
            },
            Op::Pop { .. } => match current.and_then(Value::as_sequence) {
                Some(seq) if !seq.is_empty() => {
                    let mut next = seq.clone();
                    let removed = next.pop();
                    (Some(Value::Sequence(Arc::new(next))), OpOutput::Removed(removed))
                }
                _ => (None, OpOutput::Removed(None)),
            },
            Op::Shift { .. } => match current.and_then(Value::as_sequence) {
                Some(seq) if !seq.is_empty() => {
                    let removed = seq.first().cloned();
                    let next: Vec<Value> = seq[1..].to_vec();
                    (Some(Value::Sequence(Arc::new(next))), OpOutput::Removed(removed))
                }
                _ => (None, OpOutput::Removed(None)),
            },
        }
    }
}

fn merge_values(current: Option<&Value>, patch: &Value) -> Value {
    let Some(entries) = patch.as_mapping() else {
        return patch.clone();
    };
    let mut merged = current
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();
    for (k, v) in entries {
        merged.insert(k.clone(), v.clone());
    }
    Value::Mapping(Arc::new(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn leaf(op: Op, current: serde_json::Value) -> (Option<serde_json::Value>, OpOutput) {
        let current = Value::from(current);
        let (next, out) = op.apply_leaf(Some(&current));
        (next.map(|v| v.to_json()), out)
    }

    #[test]
    fn test_op_constructors() {
        let set = Op::set(path!("a"), 1);
        assert_eq!(set.name(), "set");
        assert_eq!(set.path(), &path!("a"));
        assert_eq!(Op::pop(path!("b")).name(), "pop");
        assert_eq!(Op::merge(path!("c"), Value::mapping()).name(), "merge");
    }

    #[test]
    fn test_op_serde() {
        let op = Op::set(path!("users", 0, "name"), "Alice");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json, json!({"op": "set", "path": ["users", 0, "name"], "value": "Alice"}));
        let parsed: Op = serde_json::from_value(json).unwrap();
        assert_eq!(op, parsed);
    }

    #[test]
    fn test_push_and_unshift_report_length() {
        let (next, out) = leaf(Op::push(path!("l"), 3), json!([1, 2]));
        assert_eq!(next, Some(json!([1, 2, 3])));
        assert_eq!(out.length(), Some(3));

        let (next, out) = leaf(Op::unshift(path!("l"), 0), json!([1, 2]));
        assert_eq!(next, Some(json!([0, 1, 2])));
        assert_eq!(out, OpOutput::Length(3));
    }

    #[test]
    fn test_pop_and_shift_report_removed() {
        let (next, out) = leaf(Op::pop(path!("l")), json!([1, 2]));
        assert_eq!(next, Some(json!([1])));
        assert_eq!(out, OpOutput::Removed(Some(Value::from(2))));

        let (next, out) = leaf(Op::shift(path!("l")), json!([1, 2]));
        assert_eq!(next, Some(json!([2])));
        assert_eq!(out.into_value(), Some(Value::from(1)));

        let (next, out) = leaf(Op::pop(path!("l")), json!([]));
        assert_eq!(next, None);
        assert_eq!(out, OpOutput::Removed(None));
    }

    #[test]
    fn test_array_ops_on_absent_target_are_noops() {
        let (next, out) = Op::push(path!("l"), 1).apply_leaf(None);
        assert!(next.is_none());
        assert_eq!(out, OpOutput::Length(0));

        let (next, _) = leaf(Op::shift(path!("l")), json!({"not": "a list"}));
        assert!(next.is_none());
    }

    #[test]
    fn test_merge_is_shallow() {
        let patch = Value::from(json!({"b": {"y": 2}, "c": 3}));
        let (next, _) = leaf(Op::merge(path!("m"), patch), json!({"a": 1, "b": {"x": 1}}));
        assert_eq!(next, Some(json!({"a": 1, "b": {"y": 2}, "c": 3})));

        let (next, _) = Op::merge(path!("m"), Value::from(json!({"a": 1}))).apply_leaf(None);
        assert_eq!(next.map(|v| v.to_json()), Some(json!({"a": 1})));

        let (next, _) = leaf(Op::merge(path!("m"), Value::from(json!({"a": 1}))), json!(5));
        assert_eq!(next, Some(json!({"a": 1})));
    }
}
