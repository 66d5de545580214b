//! Immutable, path-addressed application state with batched change
//! notification.
//!
//! `easm-state` keeps one tree of [`Value`]s behind a [`Store`]. Every write
//! produces a new root that shares all untouched subtrees with the previous
//! one, so "did this part change?" is a reference comparison.
//!
//! # Core Concepts
//!
//! - **Path**: A sequence of keys addressing a location in the tree
//! - **Op**: One change at one path (set, merge, push, pop, shift, unshift)
//! - **Store**: Owns the current root and its listeners
//! - **Listener**: A callback on a path, run when the value there changed
//! - **SubStore**: A cached view of a store rooted at a path prefix
//! - **Scheduler**: Decides when queued notifications are delivered
//!
//! # Update Semantics
//!
//! ```text
//! root' = update(root, path, value)
//! ```
//!
//! - Only the ancestors of `path` are copied; everything else is shared
//! - `root` itself is never mutated
//! - Writing the value already at `path` leaves `root` current
//!
//! # Quick Start
//!
//! [`Store::new`] delivers notifications on a later turn of the current
//! tokio `LocalSet`. The example below uses [`Store::manual`], which waits
//! for an explicit [`Store::flush`]:
//!
//! ```
//! use easm_state::{path, Store, StoreOps, Value};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let store = Store::manual(json!({"todos": [], "filter": "all"}));
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = store.add_listener(path!("todos"), move |todos: Option<&Value>| {
//!     sink.borrow_mut().push(todos.map(Value::to_json));
//! });
//!
//! store.push(path!("todos"), "first");
//! store.push(path!("todos"), "second");
//! store.update(path!("filter"), "done");
//!
//! // Both pushes are delivered in one notification.
//! store.flush();
//! assert_eq!(*seen.borrow(), vec![Some(json!(["first", "second"]))]);
//! ```
//!
//! # Addressing by selector
//!
//! Paths can also be produced by walking a [`PathBuilder`], or parsed from
//! the textual `state.users[0].name` form:
//!
//! ```
//! use easm_state::{parse_path, path, select};
//!
//! assert_eq!(select(|s| s.field("users").at(0).field("name")), path!("users", 0, "name"));
//! assert_eq!(parse_path("state.users[0].name"), path!("users", 0, "name"));
//! ```

mod error;
mod key;
mod listener;
mod op;
mod path;
mod scheduler;
mod store;
mod sub_store;
mod update;
mod value;

// Addressing
pub use key::{Key, Symbol};
pub use path::{parse_path, select, Path, PathBuilder, SENTINEL};

// Values and the update engine
pub use update::{get_at, update_at, update_with, MAX_SEQUENCE_GAP};
pub use value::{value_type_name, Mapping, Sequence, Value};

// Operations
pub use op::{Op, OpOutput};

// Store
pub use error::{EasmError, EasmResult};
pub use listener::{FlushReport, ListenerFailure, ListenerId};
pub use store::{Store, StoreOps, Subscription};
pub use sub_store::SubStore;

// Scheduling
#[cfg(feature = "tokio")]
pub use scheduler::LocalTaskScheduler;
pub use scheduler::{FlushTask, ManualScheduler, ScheduledFlush, Scheduler};
