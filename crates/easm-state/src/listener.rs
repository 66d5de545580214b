//! Listener registry and the notification pass.

use crate::{Path, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Identifier of a registered listener, unique within its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

pub(crate) type Callback = Box<dyn FnMut(Option<&Value>)>;

pub(crate) struct ListenerEntry {
    id: ListenerId,
    path: Path,
    last: RefCell<Option<Value>>,
    callback: RefCell<Callback>,
    active: Cell<bool>,
}

impl ListenerEntry {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// Registered listeners in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<Rc<ListenerEntry>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, path: Path, initial: Option<Value>, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Rc::new(ListenerEntry {
            id,
            path,
            last: RefCell::new(initial),
            callback: RefCell::new(callback),
            active: Cell::new(true),
        }));
        id
    }

    /// Deactivate and drop a listener. Returns false if it was not registered.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.active.set(false);
        true
    }

    pub(crate) fn get(&self, id: ListenerId) -> Option<&Rc<ListenerEntry>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries to visit in one pass.
    pub(crate) fn snapshot(&self) -> Vec<Rc<ListenerEntry>> {
        self.entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A listener that panicked while being notified.
#[derive(Clone, Debug, PartialEq)]
pub struct ListenerFailure {
    /// The failing listener.
    pub listener: ListenerId,
    /// The address it watches.
    pub path: Path,
    /// Panic payload rendered as text.
    pub message: String,
}

/// Outcome of one notification pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlushReport {
    /// Listeners whose callback ran to completion.
    pub notified: usize,
    /// Listeners whose value changed but whose callback was already running.
    pub skipped: usize,
    /// Listeners whose callback panicked.
    pub failures: Vec<ListenerFailure>,
}

impl FlushReport {
    /// True when no callback panicked.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compare every listener's address against the current state and invoke the
/// changed ones in registration order.
///
/// `read` is consulted per listener, so writes made by an earlier callback in
/// the same pass are visible to later ones.
///
/// A panicking callback is recorded and the pass continues. A callback that
/// is already on the stack (a listener that flushed re-entrantly) is skipped
/// and keeps its previous value, so it sees the change on a later pass.
pub(crate) fn notify(entries: &[Rc<ListenerEntry>], read: &dyn Fn(&Path) -> Option<Value>) -> FlushReport {
    let mut report = FlushReport::default();

    for entry in entries {
        if !entry.active.get() {
            continue;
        }
        let current = read(&entry.path);
        let changed = !Value::same_opt(entry.last.borrow().as_ref(), current.as_ref());
        if !changed {
            continue;
        }

        let Ok(mut callback) = entry.callback.try_borrow_mut() else {
            tracing::debug!(listener = %entry.id, path = %entry.path, "listener busy, deferring");
            report.skipped += 1;
            continue;
        };
        *entry.last.borrow_mut() = current.clone();

        let outcome = catch_unwind(AssertUnwindSafe(|| (*callback)(current.as_ref())));
        match outcome {
            Ok(()) => report.notified += 1,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    listener = %entry.id,
                    path = %entry.path,
                    error = %message,
                    "listener panicked"
                );
                report.failures.push(ListenerFailure {
                    listener: entry.id,
                    path: entry.path.clone(),
                    message,
                });
            }
        }
    }

    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "listener panicked".to_string()
    }
}
