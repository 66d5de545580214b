//! The store: one current root, path-addressed operations and batched
//! listener notification.

use crate::listener::{self, Callback, ListenerId, ListenerRegistry};
#[cfg(feature = "tokio")]
use crate::scheduler::LocalTaskScheduler;
use crate::scheduler::{ManualScheduler, ScheduledFlush, Scheduler};
use crate::sub_store::{SubStore, SubStoreShared};
use crate::{get_at, update_with, EasmError, EasmResult, FlushReport, Op, OpOutput, Path, Value};
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

enum FlushState {
    Idle,
    Pending(ScheduledFlush),
}

pub(crate) struct StoreInner {
    root: RefCell<Value>,
    listeners: RefCell<ListenerRegistry>,
    flush: RefCell<FlushState>,
    scheduler: Box<dyn Scheduler>,
    sub_stores: RefCell<HashMap<String, Rc<SubStoreShared>>>,
}

/// Handle to an application store.
///
/// Cloning is cheap and every clone addresses the same state. All reads and
/// writes go through [`StoreOps`].
///
/// ```
/// use easm_state::{path, Store, StoreOps};
/// use serde_json::json;
///
/// let store = Store::manual(json!({"todos": []}));
/// assert_eq!(store.push(path!("todos"), "write docs"), 1);
/// assert_eq!(store.get_as::<Vec<String>>(path!("todos")).unwrap(), vec!["write docs"]);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a store that delivers notifications on a later turn of the
    /// current tokio [`LocalSet`](tokio::task::LocalSet).
    ///
    /// Writes must happen inside a `LocalSet`. Use [`Store::manual`] or
    /// [`Store::with_scheduler`] to drive flushes some other way.
    #[cfg(feature = "tokio")]
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_scheduler(initial, LocalTaskScheduler)
    }

    /// Create a store whose notifications are only delivered by
    /// [`Store::flush`].
    pub fn manual(initial: impl Into<Value>) -> Self {
        Self::with_scheduler(initial, ManualScheduler::new())
    }

    /// Create a store that queues its flushes on `scheduler`.
    pub fn with_scheduler(initial: impl Into<Value>, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                root: RefCell::new(initial.into()),
                listeners: RefCell::new(ListenerRegistry::default()),
                flush: RefCell::new(FlushState::Idle),
                scheduler: Box::new(scheduler),
                sub_stores: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Create a tokio-driven store from a parsed JSON value.
    #[cfg(feature = "tokio")]
    pub fn from_json(initial: serde_json::Value) -> Self {
        Self::new(Value::from(initial))
    }

    /// Create a tokio-driven store from a JSON document.
    #[cfg(feature = "tokio")]
    pub fn from_json_str(text: &str) -> EasmResult<Self> {
        let initial: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::new(initial))
    }

    /// The current root.
    pub fn snapshot(&self) -> Value {
        self.inner.root.borrow().clone()
    }

    /// True while a flush is queued and has not run.
    pub fn is_flush_pending(&self) -> bool {
        matches!(*self.inner.flush.borrow(), FlushState::Pending(_))
    }

    /// Number of registered listeners, including the trackers kept by
    /// sub-stores.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// True if both handles address the same store.
    pub fn ptr_eq(a: &Store, b: &Store) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Run the notification pass now.
    ///
    /// A queued flush is cancelled first, so listeners are notified once.
    pub fn flush(&self) -> FlushReport {
        let state = std::mem::replace(&mut *self.inner.flush.borrow_mut(), FlushState::Idle);
        if let FlushState::Pending(handle) = state {
            handle.cancel();
        }
        self.notify()
    }

    pub(crate) fn read(&self, path: &Path) -> Option<Value> {
        get_at(&self.inner.root.borrow(), path).cloned()
    }

    pub(crate) fn write(&self, op: &Op) -> OpOutput {
        let (next, output) = update_with(&self.inner.root.borrow(), op.path(), |current| {
            op.apply_leaf(current)
        });
        match next {
            Some(root) => {
                tracing::trace!(op = op.name(), path = %op.path(), "state changed");
                *self.inner.root.borrow_mut() = root;
                self.schedule_flush();
            }
            None => tracing::trace!(op = op.name(), path = %op.path(), "no change"),
        }
        output
    }

    pub(crate) fn register(&self, path: Path, callback: Callback) -> Subscription {
        let initial = self.read(&path);
        let id = self.inner.listeners.borrow_mut().add(path, initial, callback);
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub(crate) fn sub_store_at(&self, prefix: Path) -> SubStore {
        let key = prefix.cache_key();
        let cached = self.inner.sub_stores.borrow().get(&key).cloned();
        if let Some(shared) = cached {
            return SubStore::new(self.clone(), shared);
        }

        let version = Rc::new(Cell::new(0u64));
        let counter = version.clone();
        let tracker = self.register(
            prefix.clone(),
            Box::new(move |_: Option<&Value>| counter.set(counter.get() + 1)),
        );
        tracing::debug!(prefix = %prefix, tracker = %tracker.id(), "sub-store created");

        let shared = Rc::new(SubStoreShared::new(prefix, version));
        self.inner.sub_stores.borrow_mut().insert(key, shared.clone());
        SubStore::new(self.clone(), shared)
    }

    fn schedule_flush(&self) {
        {
            let mut state = self.inner.flush.borrow_mut();
            if matches!(*state, FlushState::Pending(_)) {
                return;
            }
            *state = FlushState::Pending(ScheduledFlush::detached());
        }

        let weak: Weak<StoreInner> = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.schedule(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Store { inner }.run_scheduled();
            }
        }));

        // The slot is only still pending if the task has not run yet.
        if let FlushState::Pending(slot) = &mut *self.inner.flush.borrow_mut() {
            *slot = handle;
        }
        tracing::debug!("flush scheduled");
    }

    fn run_scheduled(&self) {
        let state = std::mem::replace(&mut *self.inner.flush.borrow_mut(), FlushState::Idle);
        if matches!(state, FlushState::Idle) {
            return;
        }
        self.notify();
    }

    fn notify(&self) -> FlushReport {
        let entries = self.inner.listeners.borrow().snapshot();
        let report = listener::notify(&entries, &|path: &Path| self.read(path));
        tracing::debug!(
            notified = report.notified,
            skipped = report.skipped,
            failures = report.failures.len(),
            "flush complete"
        );
        report
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &*self.inner.root.borrow())
            .field("listeners", &self.listener_count())
            .field("flush_pending", &self.is_flush_pending())
            .finish()
    }
}

/// Registration of one listener.
///
/// The listener stays registered until [`Subscription::remove`] is called;
/// dropping the handle does not remove it.
#[must_use = "keep the subscription to remove the listener later"]
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: ListenerId,
}

impl Subscription {
    /// The listener id.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The absolute address the listener watches, while it is registered.
    pub fn path(&self) -> Option<Path> {
        let inner = self.store.upgrade()?;
        let listeners = inner.listeners.borrow();
        listeners.get(self.id).map(|entry| entry.path().clone())
    }

    /// Remove the listener.
    ///
    /// With `flush` set, pending notifications are delivered first (to this
    /// listener too) and the report of that pass is returned.
    pub fn remove(self, flush: bool) -> Option<FlushReport> {
        let inner = self.store.upgrade()?;
        let store = Store { inner };
        let report = flush.then(|| store.flush());
        store.inner.listeners.borrow_mut().remove(self.id);
        tracing::debug!(listener = %self.id, "listener removed");
        report
    }

    /// Remove the listener without flushing.
    pub fn unsubscribe(self) {
        let _ = self.remove(false);
    }
}

/// Operations shared by [`Store`] and [`SubStore`].
///
/// Paths are relative to the scope: the full state for a store, the prefix
/// for a sub-store.
pub trait StoreOps {
    /// The store that owns the state.
    fn store(&self) -> &Store;

    /// Translate a scope-relative path into an absolute one.
    fn resolve(&self, path: Path) -> Path;

    /// Read the value at `path`.
    fn get(&self, path: impl Into<Path>) -> Option<Value> {
        let full = self.resolve(path.into());
        self.store().read(&full)
    }

    /// Read the whole scope.
    fn get_root(&self) -> Option<Value> {
        self.get(Path::root())
    }

    /// Read the value at `path` as a typed Rust value.
    fn get_as<T: DeserializeOwned>(&self, path: impl Into<Path>) -> EasmResult<T> {
        let full = self.resolve(path.into());
        let value = self
            .store()
            .read(&full)
            .ok_or_else(|| EasmError::path_not_found(full.clone()))?;
        serde_json::from_value(value.to_json()).map_err(|source| EasmError::Deserialize {
            path: full,
            expected: std::any::type_name::<T>(),
            source,
        })
    }

    /// Apply `op` with its path taken relative to this scope.
    fn apply(&self, mut op: Op) -> OpOutput {
        let full = self.resolve(op.path().clone());
        *op.path_mut() = full;
        self.store().write(&op)
    }

    /// Replace the value at `path`.
    fn update(&self, path: impl Into<Path>, value: impl Into<Value>) {
        self.apply(Op::set(path, value));
    }

    /// Replace the value at `path` and return it.
    fn set(&self, path: impl Into<Path>, value: impl Into<Value>) -> Value {
        self.apply(Op::set(path, value)).into_value().unwrap_or_default()
    }

    /// Shallow-merge `value` into the mapping at `path` and return the result.
    fn merge(&self, path: impl Into<Path>, value: impl Into<Value>) -> Value {
        self.apply(Op::merge(path, value)).into_value().unwrap_or_default()
    }

    /// Append to the sequence at `path`; returns the new length, or 0 when
    /// the target is not a sequence.
    fn push(&self, path: impl Into<Path>, value: impl Into<Value>) -> usize {
        self.apply(Op::push(path, value)).length().unwrap_or(0)
    }

    /// Prepend to the sequence at `path`; returns the new length, or 0 when
    /// the target is not a sequence.
    fn unshift(&self, path: impl Into<Path>, value: impl Into<Value>) -> usize {
        self.apply(Op::unshift(path, value)).length().unwrap_or(0)
    }

    /// Remove and return the last element of the sequence at `path`.
    fn pop(&self, path: impl Into<Path>) -> Option<Value> {
        self.apply(Op::pop(path)).into_value()
    }

    /// Remove and return the first element of the sequence at `path`.
    fn shift(&self, path: impl Into<Path>) -> Option<Value> {
        self.apply(Op::shift(path)).into_value()
    }

    /// Watch the value at `path`.
    ///
    /// `callback` runs during a flush whenever the value at `path` is no
    /// longer the same reference it was at the previous flush (or at
    /// registration).
    fn add_listener<F>(&self, path: impl Into<Path>, callback: F) -> Subscription
    where
        F: FnMut(Option<&Value>) + 'static,
    {
        let full = self.resolve(path.into());
        self.store().register(full, Box::new(callback))
    }

    /// The sub-store scoped at `path`. Repeated calls with an equal path
    /// return the same sub-store.
    fn get_sub_store(&self, path: impl Into<Path>) -> SubStore {
        let full = self.resolve(path.into());
        self.store().sub_store_at(full)
    }
}

impl StoreOps for Store {
    fn store(&self) -> &Store {
        self
    }

    fn resolve(&self, path: Path) -> Path {
        path
    }
}
