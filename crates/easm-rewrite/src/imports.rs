//! First pass: which local names refer to recognized virtual-path functions.

use crate::module_table::{CallKind, ModuleSpec, ModuleTable};
use crate::syntax::ast::{ExportDecl, Expr, ExprKind, ImportSpecifier, Pattern, Program, Stmt, VarDecl};
use std::collections::HashMap;

/// A local name resolved to the function it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Name the function is exported under, which is also the store method
    /// name used in the rewritten call.
    pub canonical: String,
    pub kind: CallKind,
}

/// Local bindings of recognized functions in one module.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    bindings: HashMap<String, Binding>,
    namespaces: HashMap<String, ModuleSpec>,
}

impl ImportTable {
    /// Scan a program's imports and top-level aliases.
    ///
    /// Imports are hoisted, so every import declaration is read before any
    /// `const alias = imported` binding is followed. Aliases are followed in
    /// source order, so an alias of an alias works when declared after it.
    pub fn collect(program: &Program, modules: &ModuleTable) -> Self {
        let mut table = Self::default();

        for stmt in &program.body {
            let Stmt::Import(decl) = stmt else {
                continue;
            };
            let Some(spec) = modules.get(&decl.source) else {
                continue;
            };
            for specifier in &decl.specifiers {
                match specifier {
                    ImportSpecifier::Named { imported, local } if spec.exports(imported) => {
                        table.bindings.insert(
                            local.clone(),
                            Binding {
                                canonical: imported.clone(),
                                kind: spec.kind,
                            },
                        );
                    }
                    ImportSpecifier::Namespace(local) => {
                        table.namespaces.insert(local.clone(), spec.clone());
                    }
                    _ => {}
                }
            }
        }

        for stmt in &program.body {
            if let Some(decl) = top_level_var(stmt) {
                table.follow_aliases(decl);
            }
        }

        tracing::trace!(
            bindings = table.bindings.len(),
            namespaces = table.namespaces.len(),
            "collected imports"
        );
        table
    }

    fn follow_aliases(&mut self, decl: &VarDecl) {
        for declarator in &decl.declarators {
            let (Pattern::Ident(alias), Some(init)) = (&declarator.target, &declarator.init) else {
                continue;
            };
            if let Some(binding) = self.resolve_callee(init) {
                self.bindings.insert(alias.clone(), binding);
            } else if let ExprKind::Ident(name) = &init.kind {
                if let Some(spec) = self.namespaces.get(name).cloned() {
                    self.namespaces.insert(alias.clone(), spec);
                }
            }
        }
    }

    /// Resolve the callee of a call: a bound identifier, or `ns.fn` where
    /// `ns` is a namespace import exporting `fn`. Parentheses around the
    /// callee do not matter; `ns?.fn` is not recognized.
    pub fn resolve_callee(&self, callee: &Expr) -> Option<Binding> {
        match &callee.kind {
            ExprKind::Ident(name) => self.bindings.get(name).cloned(),
            ExprKind::Member {
                object,
                property,
                optional: false,
            } => {
                let ExprKind::Ident(namespace) = &object.kind else {
                    return None;
                };
                let spec = self.namespaces.get(namespace)?;
                spec.exports(property).then(|| Binding {
                    canonical: property.clone(),
                    kind: spec.kind,
                })
            }
            _ => None,
        }
    }

    /// The name a recognized callee is looked up through: the identifier
    /// itself, or the namespace object of `ns.fn`. A local binding of that
    /// name hides the import.
    pub fn root_name(callee: &Expr) -> Option<&str> {
        match &callee.kind {
            ExprKind::Ident(name) => Some(name.as_str()),
            ExprKind::Member { object, .. } => match &object.kind {
                ExprKind::Ident(namespace) => Some(namespace.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Nothing recognized; rewriting this module is a no-op.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.namespaces.is_empty()
    }
}

fn top_level_var(stmt: &Stmt) -> Option<&VarDecl> {
    match stmt {
        Stmt::Var(decl) => Some(decl),
        Stmt::Export(ExportDecl::Decl(inner)) => match &**inner {
            Stmt::Var(decl) => Some(decl),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn collect(source: &str) -> ImportTable {
        ImportTable::collect(&parse(source).unwrap(), &ModuleTable::default())
    }

    fn binding(canonical: &str, kind: CallKind) -> Option<Binding> {
        Some(Binding {
            canonical: canonical.into(),
            kind,
        })
    }

    #[test]
    fn test_named_and_aliased_imports() {
        let table = collect(
            "import { get, set as write, unrelated } from '@easm/core';\n\
             import { createHook } from '@easm/react';",
        );
        assert_eq!(
            table.resolve_callee(&Expr::ident("get")),
            binding("get", CallKind::StoreMethod)
        );
        assert_eq!(
            table.resolve_callee(&Expr::ident("write")),
            binding("set", CallKind::StoreMethod)
        );
        assert_eq!(table.resolve_callee(&Expr::ident("set")), None);
        assert_eq!(table.resolve_callee(&Expr::ident("unrelated")), None);
        assert_eq!(
            table.resolve_callee(&Expr::ident("createHook")),
            binding("createHook", CallKind::SubStoreFactory)
        );
    }

    #[test]
    fn test_namespace_import() {
        let table = collect("import * as actions from '@easm/core/actions';");
        assert_eq!(
            table.resolve_callee(&Expr::member(Expr::ident("actions"), "push")),
            binding("push", CallKind::StoreMethod)
        );
        assert_eq!(
            table.resolve_callee(&Expr::member(Expr::ident("actions"), "reset")),
            None
        );
        assert_eq!(
            table.resolve_callee(&Expr::member(Expr::ident("other"), "push")),
            None
        );
    }

    #[test]
    fn test_unrecognized_module_is_ignored() {
        let table = collect("import { get } from 'lodash';\nimport * as core from './core';");
        assert!(table.is_empty());
    }

    #[test]
    fn test_follows_top_level_aliases() {
        let table = collect(
            "import { get } from '@easm/core';\n\
             import * as core from '@easm/core';\n\
             const read = get, other = 1;\n\
             export const readAgain = read;\n\
             let c = core;",
        );
        assert_eq!(
            table.resolve_callee(&Expr::ident("readAgain")),
            binding("get", CallKind::StoreMethod)
        );
        assert_eq!(table.resolve_callee(&Expr::ident("other")), None);
        assert_eq!(
            table.resolve_callee(&Expr::member(Expr::ident("c"), "merge")),
            binding("merge", CallKind::StoreMethod)
        );
    }

    #[test]
    fn test_optional_namespace_member_is_not_recognized() {
        let table = collect("import * as core from '@easm/core';");
        let optional: Expr = ExprKind::Member {
            object: Box::new(Expr::ident("core")),
            property: "get".into(),
            optional: true,
        }
        .into();
        assert_eq!(table.resolve_callee(&optional), None);
        assert_eq!(ImportTable::root_name(&optional), Some("core"));
        assert_eq!(ImportTable::root_name(&Expr::ident("get")), Some("get"));
    }

    #[test]
    fn test_aliases_through_namespace_member() {
        let table = collect("import * as core from '@easm/core';\nconst pick = core.get;");
        assert_eq!(
            table.resolve_callee(&Expr::ident("pick")),
            binding("get", CallKind::StoreMethod)
        );
    }
}
