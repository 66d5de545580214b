//! Build-time rewriting of virtual-path calls.
//!
//! Application code written against the store can address state through a
//! fictional property chain:
//!
//! ```js
//! import { get, set } from "@easm/core";
//! set(store.state.items[2], "x");
//! ```
//!
//! The chain after `.state` is turned into a key array and the call is
//! redirected to the store itself:
//!
//! ```js
//! store.set(["items", 2], "x");
//! ```
//!
//! Key arrays use the same [`Key`](easm_state::Key) addressing that
//! `easm_state::Store` consumes.
//!
//! # Passes
//!
//! 1. [`ImportTable::collect`] finds local names bound to functions listed
//!    in the [`ModuleTable`], including namespace imports and top-level
//!    aliases.
//! 2. [`rewrite`] walks the tree in pre-order and rewrites every call whose
//!    callee resolves through the import table, unless a parameter or local
//!    declaration hides the imported name at that point. Calls whose first
//!    argument does not reach `.state`, or indexes with a non-literal, are
//!    left as written and listed in the [`RewriteReport`].
//!
//! [`rewrite_source`] runs both passes and splices the rewritten calls into
//! the original text, leaving everything else (comments included) as it
//! was. TypeScript input is rejected with a [`ParseError`].
//!
//! # Example
//!
//! ```
//! use easm_rewrite::{rewrite_source, ModuleTable};
//!
//! let out = rewrite_source(
//!     "import { get } from '@easm/core';\nconst name = get(store.state.user.name); // greeting",
//!     &ModuleTable::default(),
//! )
//! .unwrap();
//! assert_eq!(
//!     out,
//!     "import { get } from '@easm/core';\nconst name = store.get([\"user\", \"name\"]); // greeting"
//! );
//! ```

mod address;
mod error;
mod imports;
mod module_table;
mod rewrite;
mod scope;
pub mod syntax;

pub use address::{extract, SkipReason, VirtualAddress};
pub use error::{ConfigError, ParseError};
pub use imports::{Binding, ImportTable};
pub use module_table::{CallKind, ModuleSpec, ModuleTable};
pub use rewrite::{
    rewrite, rewrite_source, rewrite_source_with_report, rewrite_with_report, RewriteReport,
    RewrittenCall, SkippedCall,
};
