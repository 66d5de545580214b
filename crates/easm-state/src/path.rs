//! Address representation for navigating the state tree.
//!
//! A [`Path`] is an ordered sequence of [`Key`]s; the empty path is the root.
//! Paths are built from literals ([`path!`](crate::path)), from selectors
//! evaluated against a [`PathBuilder`], from sentinel-prefixed raw arrays, or
//! by the build-time rewriter, and all of these produce the same value.

use crate::Key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property name marking the address root in source-level expressions.
///
/// `store.state.user.name` addresses `["user", "name"]` on `store`.
pub const SENTINEL: &str = "state";

/// A complete address into the state tree.
///
/// # Examples
///
/// ```
/// use easm_state::Path;
///
/// let path = Path::root().key("users").index(0).key("name");
/// assert_eq!(path.len(), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Key>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty path (alias for `new`).
    #[inline]
    pub fn root() -> Self {
        Self::new()
    }

    /// Create a path from a vector of keys.
    #[inline]
    pub fn from_keys(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// Create a path from the raw-array form whose first element is the
    /// [`SENTINEL`]. The sentinel is stripped; arrays without it are taken
    /// verbatim.
    ///
    /// ```
    /// use easm_state::{path, Key, Path};
    ///
    /// let p = Path::from_virtual(vec![Key::name("state"), Key::name("todos"), Key::index(1)]);
    /// assert_eq!(p, path!("todos", 1));
    /// ```
    pub fn from_virtual(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut keys = keys.into_iter().peekable();
        if keys.peek().and_then(Key::as_name) == Some(SENTINEL) {
            keys.next();
        }
        Self(keys.collect())
    }

    /// Append a name key and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Key::Name(k.into()));
        self
    }

    /// Append an index key and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Key::Index(i));
        self
    }

    /// Push a key onto the path (mutating).
    #[inline]
    pub fn push(&mut self, key: impl Into<Key>) {
        self.0.push(key.into());
    }

    /// Pop the last key from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Key> {
        self.0.pop()
    }

    /// Get the keys of this path.
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of keys in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last key.
    #[inline]
    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut result = self.clone();
        result.0.extend(other.0.iter().cloned());
        result
    }

    /// Check if this path is a prefix of another path.
    ///
    /// ```
    /// use easm_state::path;
    ///
    /// let parent = path!("user");
    /// let child = path!("user", "name");
    ///
    /// assert!(parent.is_prefix_of(&child));
    /// assert!(!child.is_prefix_of(&parent));
    /// assert!(parent.is_prefix_of(&parent));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Get the parent path (path without the last key).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut p = self.clone();
            p.pop();
            Some(p)
        }
    }

    /// Iterate over the keys.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.0.iter()
    }

    /// The joined-key string used to look up cached sub-stores.
    ///
    /// Keys are joined with `/`; `/` and `\` inside names are escaped so
    /// distinct paths never share a cache key. `Index(0)` and `Name("0")`
    /// deliberately collide: they address the same slot.
    pub fn cache_key(&self) -> String {
        let mut out = String::new();
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            key.write_cache_segment(&mut out);
        }
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for key in &self.0 {
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Key;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<&Path> for Path {
    fn from(p: &Path) -> Self {
        p.clone()
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Path(keys)
    }
}

impl From<&[Key]> for Path {
    fn from(keys: &[Key]) -> Self {
        Path(keys.to_vec())
    }
}

impl<const N: usize> From<[Key; N]> for Path {
    fn from(keys: [Key; N]) -> Self {
        Path(keys.into())
    }
}

impl From<&str> for Path {
    fn from(name: &str) -> Self {
        Path(vec![Key::from(name)])
    }
}

impl From<usize> for Path {
    fn from(i: usize) -> Self {
        Path(vec![Key::Index(i)])
    }
}

impl From<PathBuilder> for Path {
    fn from(b: PathBuilder) -> Self {
        b.path()
    }
}

/// Fluent address recorder.
///
/// Every access appends one key and hands back a new builder wrapping the
/// extended address; [`path`](PathBuilder::path) reads the finished
/// address out. Builders are what selectors passed to [`select`] receive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct PathBuilder {
    keys: Vec<Key>,
}

impl PathBuilder {
    /// Builder at the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a property access.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.keys.push(Key::Name(name.into()));
        self
    }

    /// Record a sequence index access.
    pub fn at(mut self, index: usize) -> Self {
        self.keys.push(Key::Index(index));
        self
    }

    /// Record an arbitrary key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Number of keys recorded so far.
    pub fn depth(&self) -> usize {
        self.keys.len()
    }

    /// Finish recording.
    pub fn path(self) -> Path {
        Path(self.keys)
    }
}

/// Evaluate a selector against a fresh [`PathBuilder`].
///
/// ```
/// use easm_state::{path, select};
///
/// let p = select(|s| s.field("users").at(0).field("name"));
/// assert_eq!(p, path!("users", 0, "name"));
/// ```
pub fn select<F>(selector: F) -> Path
where
    F: FnOnce(PathBuilder) -> PathBuilder,
{
    selector(PathBuilder::new()).path()
}

/// Parse a textual virtual path such as `state.users[0].name`.
///
/// A leading [`SENTINEL`] segment is stripped. Bracketed integers become
/// index keys, bracketed quoted text becomes a name key, empty dot segments
/// are ignored.
///
/// ```
/// use easm_state::{parse_path, path};
///
/// assert_eq!(parse_path("state.users[0].name"), path!("users", 0, "name"));
/// assert_eq!(parse_path("config.theme"), path!("config", "theme"));
/// assert!(parse_path("").is_empty());
/// ```
pub fn parse_path(text: &str) -> Path {
    let mut keys = Vec::new();
    let mut name = String::new();
    let mut chars = text.chars().peekable();

    fn flush(name: &mut String, keys: &mut Vec<Key>) {
        if !name.is_empty() {
            keys.push(Key::Name(std::mem::take(name)));
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut name, &mut keys),
            '[' => {
                flush(&mut name, &mut keys);
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim();
                let quoted = inner.len() >= 2
                    && ((inner.starts_with('"') && inner.ends_with('"'))
                        || (inner.starts_with('\'') && inner.ends_with('\'')));
                if quoted {
                    keys.push(Key::Name(inner[1..inner.len() - 1].to_owned()));
                } else if let Ok(i) = inner.parse::<usize>() {
                    keys.push(Key::Index(i));
                } else if !inner.is_empty() {
                    keys.push(Key::Name(inner.to_owned()));
                }
            }
            c => name.push(c),
        }
    }
    flush(&mut name, &mut keys);

    Path::from_virtual(keys)
}

/// Construct a [`Path`] from a sequence of keys.
///
/// # Examples
///
/// ```
/// use easm_state::path;
///
/// // String literals become name keys
/// let p = path!("users", "alice", "email");
///
/// // Numbers become index keys
/// let p = path!("items", 0, "name");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    (@key $key:expr) => {
        $crate::Key::from($key)
    };
    () => {
        $crate::Path::root()
    };
    ($($key:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::path!(@key $key));
        )+
        p
    }};
}
