//! Views of a store scoped to a path prefix.

use crate::{Path, Store, StoreOps};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// State shared by every handle to the same sub-store.
pub(crate) struct SubStoreShared {
    prefix: Path,
    version: Rc<Cell<u64>>,
}

impl SubStoreShared {
    pub(crate) fn new(prefix: Path, version: Rc<Cell<u64>>) -> Self {
        Self { prefix, version }
    }
}

/// A store view whose paths are relative to a fixed prefix.
///
/// Every operation is forwarded to the parent store with the prefix
/// prepended, so writes through a sub-store are ordinary writes on the
/// parent and are observed by all its listeners. Sub-stores are cached per
/// parent: asking twice for the same prefix yields handles for which
/// [`SubStore::ptr_eq`] holds.
///
/// ```
/// use easm_state::{path, Store, StoreOps, SubStore};
/// use serde_json::json;
///
/// let store = Store::manual(json!({"users": [{"name": "Ada"}]}));
/// let first = store.get_sub_store(path!("users", 0));
///
/// first.update(path!("name"), "Grace");
/// assert_eq!(store.get(path!("users", 0, "name")).unwrap().as_str(), Some("Grace"));
/// assert!(SubStore::ptr_eq(&first, &store.get_sub_store(path!("users", 0))));
/// ```
#[derive(Clone)]
pub struct SubStore {
    store: Store,
    shared: Rc<SubStoreShared>,
}

impl SubStore {
    pub(crate) fn new(store: Store, shared: Rc<SubStoreShared>) -> Self {
        Self { store, shared }
    }

    /// The absolute prefix of this view.
    pub fn prefix(&self) -> &Path {
        &self.shared.prefix
    }

    /// The store this view forwards to.
    pub fn parent(&self) -> &Store {
        &self.store
    }

    /// Number of flushes in which the value under the prefix changed.
    pub fn version(&self) -> u64 {
        self.shared.version.get()
    }

    /// True if both handles are the cached sub-store for the same prefix of
    /// the same store.
    pub fn ptr_eq(a: &SubStore, b: &SubStore) -> bool {
        Rc::ptr_eq(&a.shared, &b.shared)
    }
}

impl StoreOps for SubStore {
    fn store(&self) -> &Store {
        &self.store
    }

    fn resolve(&self, path: Path) -> Path {
        self.shared.prefix.join(&path)
    }
}

impl fmt::Debug for SubStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStore")
            .field("prefix", &self.shared.prefix)
            .field("version", &self.version())
            .finish()
    }
}
