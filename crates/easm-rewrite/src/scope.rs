//! Names declared below the top level of a module.
//!
//! An imported function can be hidden by any binding of the same name in
//! an enclosing function, block, catch clause or loop head. The rewriter
//! keeps one frame per such scope while it walks the tree and consults the
//! stack before touching a call.

use crate::syntax::ast::*;
use std::collections::HashSet;

/// Frames of declared names, innermost last. The module scope itself is
/// not tracked: a top-level declaration cannot reuse an imported name.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<HashSet<String>>,
}

impl ScopeStack {
    /// Function or method body: parameters, hoisted `var`s, top-level
    /// lexical declarations and, for named function expressions, the
    /// function's own name.
    pub fn enter_function(&mut self, own_name: Option<&str>, params: &[Pattern], body: &[Stmt]) {
        let mut names = HashSet::new();
        if let Some(name) = own_name {
            names.insert(name.to_string());
        }
        for param in params {
            pattern_names(param, &mut names);
        }
        var_names(body, &mut names);
        lexical_names(body, &mut names);
        self.frames.push(names);
    }

    /// `{ ... }`: `let`, `const`, `class` and function declarations.
    pub fn enter_block(&mut self, body: &[Stmt]) {
        let mut names = HashSet::new();
        lexical_names(body, &mut names);
        self.frames.push(names);
    }

    /// All cases of a `switch` share one block.
    pub fn enter_switch(&mut self, cases: &[SwitchCase]) {
        let mut names = HashSet::new();
        for case in cases {
            lexical_names(&case.body, &mut names);
        }
        self.frames.push(names);
    }

    /// `catch (param) { body }`
    pub fn enter_catch(&mut self, clause: &CatchClause) {
        let mut names = HashSet::new();
        if let Some(param) = &clause.param {
            pattern_names(param, &mut names);
        }
        lexical_names(&clause.body, &mut names);
        self.frames.push(names);
    }

    /// `let` and `const` in a `for` head live for the whole loop.
    pub fn enter_for_head(&mut self, init: Option<&ForInit>) {
        let mut names = HashSet::new();
        if let Some(ForInit::Var(decl)) = init {
            if decl.kind != VarKind::Var {
                for declarator in &decl.declarators {
                    pattern_names(&declarator.target, &mut names);
                }
            }
        }
        self.frames.push(names);
    }

    /// A class body sees the class's own name.
    pub fn enter_class(&mut self, name: Option<&str>) {
        self.frames.push(name.map(str::to_string).into_iter().collect());
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    /// Whether a binding of `name` below the top level is in scope.
    pub fn is_shadowed(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }
}

fn pattern_names(pattern: &Pattern, out: &mut HashSet<String>) {
    match pattern {
        Pattern::Ident(name) => {
            out.insert(name.clone());
        }
        Pattern::Object(props) => {
            for prop in props {
                match prop {
                    PatternProp::KeyValue { value, .. } => pattern_names(value, out),
                    PatternProp::Rest(target) => pattern_names(target, out),
                }
            }
        }
        Pattern::Array(items) => {
            for item in items.iter().flatten() {
                pattern_names(item, out);
            }
        }
        Pattern::Default(target, _) | Pattern::Rest(target) => pattern_names(target, out),
    }
}

/// Declarations scoped to the block that directly contains them.
fn lexical_names(body: &[Stmt], out: &mut HashSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Var(decl) if decl.kind != VarKind::Var => {
                for declarator in &decl.declarators {
                    pattern_names(&declarator.target, out);
                }
            }
            Stmt::Function(Function {
                name: Some(name), ..
            })
            | Stmt::Class(Class {
                name: Some(name), ..
            }) => {
                out.insert(name.clone());
            }
            _ => {}
        }
    }
}

/// `var` declarations anywhere in a function body outside nested
/// functions.
fn var_names(body: &[Stmt], out: &mut HashSet<String>) {
    for stmt in body {
        var_names_in(stmt, out);
    }
}

fn var_names_in(stmt: &Stmt, out: &mut HashSet<String>) {
    let declared = |decl: &VarDecl, out: &mut HashSet<String>| {
        if decl.kind == VarKind::Var {
            for declarator in &decl.declarators {
                pattern_names(&declarator.target, out);
            }
        }
    };
    match stmt {
        Stmt::Var(decl) => declared(decl, out),
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            var_names_in(consequent, out);
            if let Some(alternate) = alternate {
                var_names_in(alternate, out);
            }
        }
        Stmt::For { init, body, .. } => {
            if let Some(ForInit::Var(decl)) = init {
                declared(decl, out);
            }
            var_names_in(body, out);
        }
        Stmt::ForIn { left, body, .. } | Stmt::ForOf { left, body, .. } => {
            if let ForInit::Var(decl) = left {
                declared(decl, out);
            }
            var_names_in(body, out);
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
            var_names_in(body, out)
        }
        Stmt::Block(body) => var_names(body, out),
        Stmt::Switch { cases, .. } => {
            for case in cases {
                var_names(&case.body, out);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            var_names(block, out);
            if let Some(handler) = handler {
                var_names(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                var_names(finalizer, out);
            }
        }
        _ => {}
    }
}
