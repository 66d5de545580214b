//! Persistent state tree.
//!
//! [`Value`] is a closed tagged variant over scalars and the two container
//! shapes, [`Value::Mapping`] and [`Value::Sequence`]. Containers sit behind
//! `Arc`, so cloning a value is a reference-count bump and a shallow copy of
//! a container duplicates only its direct slots. Values are never mutated in
//! place; every snapshot handed out stays valid forever.

use crate::Key;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Entries of a mapping node in insertion order. Keys are stored normalised
/// by [`Key::to_map_key`].
pub type Mapping = IndexMap<Key, Value>;

/// Elements of a sequence node.
pub type Sequence = Vec<Value>;

/// A node of the state tree.
#[derive(Clone, Default)]
pub enum Value {
    /// Explicit null, also used to pad sequences written a short way past
    /// their end.
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(Arc<str>),
    Sequence(Arc<Sequence>),
    Mapping(Arc<Mapping>),
}

impl Value {
    /// An empty mapping node.
    pub fn mapping() -> Self {
        Value::Mapping(Arc::new(Mapping::new()))
    }

    /// An empty sequence node.
    pub fn sequence() -> Self {
        Value::Sequence(Arc::new(Sequence::new()))
    }

    /// Build a mapping node from entries.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Mapping(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (Into::<Key>::into(k).to_map_key(), v.into()))
                .collect(),
        ))
    }

    /// Identity comparison.
    ///
    /// Containers are the same only when they are the same allocation;
    /// scalars compare by value. This is the comparison used by the update
    /// engine's no-op check and by change notification.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Sequence(a), Value::Sequence(b)) => Arc::ptr_eq(a, b),
            (Value::Mapping(a), Value::Mapping(b)) => Arc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Identity comparison over possibly-absent values.
    pub fn same_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Resolve one key below this node.
    pub fn child(&self, key: &Key) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(&key.to_map_key()),
            Value::Sequence(seq) => key.as_index().and_then(|i| seq.get(i)),
            _ => None,
        }
    }

    /// Returns true for mapping and sequence nodes.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Mapping(_) | Value::Sequence(_))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(seq) => Some(&**seq),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(&**map),
            _ => None,
        }
    }

    /// Look up a name in a mapping node.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.child(&Key::from(name))
    }

    /// Convert to a `serde_json::Value`. Symbol-keyed entries are dropped.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Sequence(seq) => {
                serde_json::Value::Array(seq.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .filter_map(|(k, v)| k.as_name().map(|k| (k.to_owned(), v.to_json())))
                    .collect(),
            ),
        }
    }
}

/// Get the type name of a value.
#[inline]
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
    }
}

/// Deep structural equality. Use [`Value::same`] for identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Sequence(a), Value::Sequence(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Mapping(a), Value::Mapping(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => self.same(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Sequence(seq) => f.debug_list().entries(seq.iter()).finish(),
            Value::Mapping(map) => f.debug_map().entries(map.iter()).finish(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::Sequence(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Mapping(Arc::new(
                map.into_iter()
                    .map(|(k, v)| (Key::Name(k), Value::from(v)))
                    .collect(),
            )),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        v.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number((n as u64).into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats become `Null`, as in JSON.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(Arc::new(items.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for item in seq.iter() {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Value::Mapping(map) => {
                let named: Vec<_> = map
                    .iter()
                    .filter_map(|(k, v)| k.as_name().map(|k| (k, v)))
                    .collect();
                let mut out = serializer.serialize_map(Some(named.len()))?;
                for (k, v) in named {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
