//! Single address steps.
//!
//! A [`Key`] is one step of a [`Path`](crate::Path): a property name, a
//! sequence index, or an opaque [`Symbol`] marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque, process-unique key.
///
/// Two symbols are equal only when they come from the same [`Symbol::new`]
/// call; the description is informational.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    /// Create a fresh symbol.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    /// Process-unique identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Human readable description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}#{})", self.description, self.id)
    }
}

/// A single step of an address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Property access: `obj.name` / `obj["name"]`
    Name(String),
    /// Sequence access: `list[0]`
    Index(usize),
    /// Opaque marker key. Never serialized.
    #[serde(skip)]
    Symbol(Symbol),
}

impl Key {
    /// Create a name key.
    #[inline]
    pub fn name(k: impl Into<String>) -> Self {
        Key::Name(k.into())
    }

    /// Create an index key.
    #[inline]
    pub fn index(i: usize) -> Self {
        Key::Index(i)
    }

    /// Returns true if this is a name key.
    #[inline]
    pub fn is_name(&self) -> bool {
        matches!(self, Key::Name(_))
    }

    /// Returns true if this is an index key.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }

    /// Get the name if this is a name key.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(k) => Some(k),
            _ => None,
        }
    }

    /// Resolve this key as a sequence position.
    ///
    /// Names in canonical decimal form address sequences too, the way
    /// `list["2"]` does in the source model. `"02"` stays a plain name.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(k) if is_canonical_index(k) => k.parse().ok(),
            _ => None,
        }
    }

    /// The key under which this step is stored in a mapping.
    ///
    /// Indexes are stored as their decimal name, so `Index(0)` and
    /// `Name("0")` address the same mapping entry.
    pub fn to_map_key(&self) -> Key {
        match self {
            Key::Index(i) => Key::Name(i.to_string()),
            other => other.clone(),
        }
    }

    /// Write this key into a sub-store cache key.
    pub(crate) fn write_cache_segment(&self, out: &mut String) {
        match self {
            Key::Name(k) => {
                for c in k.chars() {
                    if c == '/' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            Key::Index(i) => out.push_str(&i.to_string()),
            Key::Symbol(s) => {
                out.push_str("@@");
                out.push_str(&s.id().to_string());
            }
        }
    }
}

fn is_canonical_index(name: &str) -> bool {
    match name.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        bytes => bytes.iter().all(u8::is_ascii_digit),
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(k) => write!(f, ".{}", k),
            Key::Index(i) => write!(f, "[{}]", i),
            Key::Symbol(s) => write!(f, "[@{}]", s.description()),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_owned())
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Name(s.clone())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<Symbol> for Key {
    fn from(s: Symbol) -> Self {
        Key::Symbol(s)
    }
}

impl From<&Symbol> for Key {
    fn from(s: &Symbol) -> Self {
        Key::Symbol(s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::new("marker");
        let b = Symbol::new("marker");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(Key::from(&a), Key::from(&b));
    }

    #[test]
    fn test_numeric_names_resolve_as_index() {
        assert_eq!(Key::name("12").as_index(), Some(12));
        assert_eq!(Key::index(3).as_index(), Some(3));
        assert_eq!(Key::name("1a").as_index(), None);
        assert_eq!(Key::name("").as_index(), None);
        assert_eq!(Key::name("-1").as_index(), None);
        assert_eq!(Key::name("0").as_index(), Some(0));
    }

    #[test]
    fn test_non_canonical_numeric_names_are_names() {
        assert_eq!(Key::name("012").as_index(), None);
        assert_eq!(Key::name("00").as_index(), None);
        assert_eq!(Key::name("+1").as_index(), None);
        assert_eq!(Key::name("1e3").as_index(), None);
        // too large for usize
        assert_eq!(Key::name("99999999999999999999999").as_index(), None);
    }

    #[test]
    fn test_map_key_normalizes_index() {
        assert_eq!(Key::index(7).to_map_key(), Key::name("7"));
        assert_eq!(Key::name("x").to_map_key(), Key::name("x"));
    }

    #[test]
    fn test_key_serde_untagged() {
        let keys = vec![Key::name("items"), Key::index(2)];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["items",2]"#);
        let parsed: Vec<Key> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, keys);
    }

    #[test]
    fn test_symbol_key_is_not_serializable() {
        let key = Key::from(Symbol::new("private"));
        assert!(serde_json::to_string(&key).is_err());
    }
}
