//! Second pass: replace recognized calls with addressed store calls.
//!
//! The pass rewrites the tree and, at the same time, records each
//! replacement as an edit of the source text. [`rewrite_source`] applies
//! those edits to the original text, so comments, formatting and quoting
//! outside the replaced calls survive byte for byte.

use crate::address::{extract, SkipReason};
use crate::imports::{Binding, ImportTable};
use crate::module_table::{CallKind, ModuleTable};
use crate::scope::ScopeStack;
use crate::syntax::ast::*;
use crate::syntax::{parse, print_expr};
use crate::ParseError;
use easm_state::{Key, Path};

/// A call that was rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenCall {
    /// Canonical function name.
    pub function: String,
    pub path: Path,
}

/// A recognized call that was left as written.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCall {
    /// Canonical function name.
    pub function: String,
    pub reason: SkipReason,
}

/// What one rewrite pass did, in traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteReport {
    pub rewritten: Vec<RewrittenCall>,
    pub skipped: Vec<SkippedCall>,
}

impl RewriteReport {
    /// Every recognized call was rewritten.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Rewrite every recognized virtual-path call in `program`.
pub fn rewrite(program: Program, modules: &ModuleTable) -> Program {
    rewrite_with_report(program, modules).0
}

/// [`rewrite`], also reporting each recognized call.
pub fn rewrite_with_report(mut program: Program, modules: &ModuleTable) -> (Program, RewriteReport) {
    let (report, _) = run(&mut program, modules);
    (program, report)
}

/// Parse a module and rewrite it in place: only the text of rewritten
/// calls changes.
pub fn rewrite_source(source: &str, modules: &ModuleTable) -> Result<String, ParseError> {
    rewrite_source_with_report(source, modules).map(|(out, _)| out)
}

/// [`rewrite_source`], also reporting each recognized call.
pub fn rewrite_source_with_report(
    source: &str,
    modules: &ModuleTable,
) -> Result<(String, RewriteReport), ParseError> {
    let mut program = parse(source)?;
    let (report, mut edits) = run(&mut program, modules);
    edits.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });
    let splice = Splice {
        source,
        edits: &edits,
    };
    let mut out = String::with_capacity(source.len());
    splice.render(TextRange::new(0, source.len()), &mut out);
    Ok((out, report))
}

fn run(program: &mut Program, modules: &ModuleTable) -> (RewriteReport, Vec<Edit>) {
    let imports = ImportTable::collect(program, modules);
    let mut rewriter = Rewriter {
        imports: &imports,
        scopes: ScopeStack::default(),
        report: RewriteReport::default(),
        edits: Vec::new(),
    };
    if !imports.is_empty() {
        rewriter.block(&mut program.body);
    }
    tracing::debug!(
        rewritten = rewriter.report.rewritten.len(),
        skipped = rewriter.report.skipped.len(),
        "rewrite pass complete"
    );
    (rewriter.report, rewriter.edits)
}

// ----------------------------------------------------------------------
// Splicing
// ----------------------------------------------------------------------

/// Replacement text for one source range.
#[derive(Debug)]
struct Edit {
    range: TextRange,
    parts: Vec<Part>,
}

#[derive(Debug)]
enum Part {
    Text(String),
    /// Original text of a range, with any edits inside it applied.
    Source(TextRange),
}

struct Splice<'a> {
    source: &'a str,
    /// Sorted by start, outermost first on ties.
    edits: &'a [Edit],
}

impl Splice<'_> {
    fn render(&self, range: TextRange, out: &mut String) {
        let mut cursor = range.start;
        let first = self.edits.partition_point(|e| e.range.start < range.start);
        for edit in &self.edits[first..] {
            if edit.range.start >= range.end {
                break;
            }
            // nested edits are reached through the parts of their parent
            if edit.range.start < cursor || edit.range.end > range.end {
                continue;
            }
            out.push_str(&self.source[cursor..edit.range.start]);
            for part in &edit.parts {
                match part {
                    Part::Text(text) => out.push_str(text),
                    Part::Source(inner) => self.render(*inner, out),
                }
            }
            cursor = edit.range.end;
        }
        out.push_str(&self.source[cursor..range.end]);
    }
}

// ----------------------------------------------------------------------
// Rewriting
// ----------------------------------------------------------------------

struct Rewriter<'a> {
    imports: &'a ImportTable,
    scopes: ScopeStack,
    report: RewriteReport,
    edits: Vec<Edit>,
}

impl Rewriter<'_> {
    fn rewrite_call(&mut self, expr: &mut Expr) {
        let call_range = expr.range;
        let ExprKind::Call {
            callee,
            args,
            optional: false,
        } = &mut expr.kind
        else {
            return;
        };
        let Some(binding) = self.imports.resolve_callee(callee) else {
            return;
        };
        if let Some(name) = ImportTable::root_name(callee) {
            if self.scopes.is_shadowed(name) {
                tracing::trace!(name, "import shadowed by a local binding");
                return;
            }
        }

        let address = match args
            .first()
            .ok_or(SkipReason::MissingArgument)
            .and_then(extract)
        {
            Ok(address) => address,
            Err(reason) => {
                self.skip(binding, reason);
                return;
            }
        };

        let keys = key_array(&address.path);
        let keys_text = print_expr(&keys);
        match binding.kind {
            CallKind::StoreMethod => {
                let second = std::mem::take(args).into_iter().nth(1);
                let mut parts = vec![
                    Part::Source(address.receiver.range),
                    Part::Text(format!(".{}({}", binding.canonical, keys_text)),
                ];
                if let Some(second) = &second {
                    parts.push(Part::Text(", ".to_string()));
                    parts.push(Part::Source(second.range));
                }
                parts.push(Part::Text(")".to_string()));
                self.record(call_range, parts);

                let mut new_args = vec![keys];
                new_args.extend(second);
                *expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(Expr::member(address.receiver, binding.canonical.as_str())),
                        args: new_args,
                        optional: false,
                    },
                    call_range,
                );
            }
            CallKind::SubStoreFactory => {
                let arg_range = args[0].range;
                self.record(
                    arg_range,
                    vec![
                        Part::Source(address.receiver.range),
                        Part::Text(format!(".getSubStore({})", keys_text)),
                    ],
                );
                args[0] = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(Expr::member(address.receiver, "getSubStore")),
                        args: vec![keys],
                        optional: false,
                    },
                    arg_range,
                );
            }
        }

        tracing::debug!(function = %binding.canonical, path = %address.path, "rewrote call");
        self.report.rewritten.push(RewrittenCall {
            function: binding.canonical,
            path: address.path,
        });
    }

    fn record(&mut self, range: TextRange, parts: Vec<Part>) {
        // trees built by hand have nothing to splice into
        if !range.is_empty() {
            self.edits.push(Edit { range, parts });
        }
    }

    fn skip(&mut self, binding: Binding, reason: SkipReason) {
        tracing::debug!(function = %binding.canonical, %reason, "left call unchanged");
        self.report.skipped.push(SkippedCall {
            function: binding.canonical,
            reason,
        });
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    fn block(&mut self, body: &mut [Stmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn scoped_block(&mut self, body: &mut [Stmt]) {
        self.scopes.enter_block(body);
        self.block(body);
        self.scopes.exit();
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Import(_)
            | Stmt::Empty
            | Stmt::Debugger
            | Stmt::Break(_)
            | Stmt::Continue(_) => {}
            Stmt::Export(ExportDecl::Decl(inner)) => self.stmt(inner),
            Stmt::Export(ExportDecl::Default(expr)) => self.expr(expr),
            Stmt::Export(ExportDecl::Named { .. } | ExportDecl::All { .. }) => {}
            Stmt::Var(decl) => self.var_decl(decl),
            Stmt::Function(function) => self.function(function, false),
            Stmt::Class(class) => self.class(class, false),
            Stmt::Return(arg) => {
                if let Some(arg) = arg {
                    self.expr(arg);
                }
            }
            Stmt::Throw(expr) | Stmt::Expr(expr) => self.expr(expr),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alternate) = alternate {
                    self.stmt(alternate);
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.scopes.enter_for_head(init.as_ref());
                if let Some(init) = init {
                    self.for_init(init);
                }
                if let Some(test) = test {
                    self.expr(test);
                }
                if let Some(update) = update {
                    self.expr(update);
                }
                self.stmt(body);
                self.scopes.exit();
            }
            Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body, .. } => {
                self.scopes.enter_for_head(Some(&*left));
                self.for_init(left);
                self.expr(right);
                self.stmt(body);
                self.scopes.exit();
            }
            Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.expr(discriminant);
                self.scopes.enter_switch(cases);
                for case in cases.iter_mut() {
                    if let Some(test) = &mut case.test {
                        self.expr(test);
                    }
                    self.block(&mut case.body);
                }
                self.scopes.exit();
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.scoped_block(block);
                if let Some(handler) = handler {
                    self.scopes.enter_catch(handler);
                    if let Some(param) = &mut handler.param {
                        self.pattern(param);
                    }
                    self.block(&mut handler.body);
                    self.scopes.exit();
                }
                if let Some(finalizer) = finalizer {
                    self.scoped_block(finalizer);
                }
            }
            Stmt::Labeled { body, .. } => self.stmt(body),
            Stmt::Block(body) => self.scoped_block(body),
        }
    }

    fn var_decl(&mut self, decl: &mut VarDecl) {
        for declarator in &mut decl.declarators {
            self.pattern(&mut declarator.target);
            if let Some(init) = &mut declarator.init {
                self.expr(init);
            }
        }
    }

    fn for_init(&mut self, init: &mut ForInit) {
        match init {
            ForInit::Var(decl) => self.var_decl(decl),
            ForInit::Expr(expr) => self.expr(expr),
        }
    }

    /// A declaration's name belongs to the enclosing scope; an expression's
    /// name is visible only inside its own body.
    fn function(&mut self, function: &mut Function, is_expression: bool) {
        let own_name = if is_expression {
            function.name.as_deref()
        } else {
            None
        };
        self.scopes
            .enter_function(own_name, &function.params, &function.body);
        for param in &mut function.params {
            self.pattern(param);
        }
        self.block(&mut function.body);
        self.scopes.exit();
    }

    fn class(&mut self, class: &mut Class, is_expression: bool) {
        if let Some(super_class) = &mut class.super_class {
            self.expr(super_class);
        }
        let own_name = if is_expression {
            class.name.as_deref()
        } else {
            None
        };
        self.scopes.enter_class(own_name);
        for member in &mut class.body {
            match member {
                ClassMember::Method { key, function, .. } => {
                    self.prop_key(key);
                    self.function(function, false);
                }
                ClassMember::Field { key, value, .. } => {
                    self.prop_key(key);
                    if let Some(value) = value {
                        self.expr(value);
                    }
                }
                ClassMember::StaticBlock(body) => {
                    self.scopes.enter_function(None, &[], body);
                    self.block(body);
                    self.scopes.exit();
                }
            }
        }
        self.scopes.exit();
    }

    fn pattern(&mut self, pattern: &mut Pattern) {
        match pattern {
            Pattern::Ident(_) => {}
            Pattern::Object(props) => {
                for prop in props {
                    match prop {
                        PatternProp::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.pattern(value);
                        }
                        PatternProp::Rest(target) => self.pattern(target),
                    }
                }
            }
            Pattern::Array(items) => {
                for item in items.iter_mut().flatten() {
                    self.pattern(item);
                }
            }
            Pattern::Default(target, default) => {
                self.pattern(target);
                self.expr(default);
            }
            Pattern::Rest(target) => self.pattern(target),
        }
    }

    fn prop_key(&mut self, key: &mut PropKey) {
        if let PropKey::Computed(expr) = key {
            self.expr(expr);
        }
    }

    fn template(&mut self, template: &mut Template) {
        for expr in &mut template.exprs {
            self.expr(expr);
        }
    }

    /// Pre-order: the node is rewritten first, then the children of
    /// whatever now stands in its place are visited.
    fn expr(&mut self, expr: &mut Expr) {
        self.rewrite_call(expr);

        match &mut expr.kind {
            ExprKind::Ident(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Num(_)
            | ExprKind::Str(_)
            | ExprKind::Regex { .. }
            | ExprKind::MetaProperty { .. } => {}
            ExprKind::Template(template) => self.template(template),
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.expr(tag);
                self.template(quasi);
            }
            ExprKind::Array(items) => {
                for item in items.iter_mut().flatten() {
                    self.expr(item);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            self.prop_key(key);
                            self.expr(value);
                        }
                        Prop::Shorthand(_) => {}
                        Prop::Method { key, function, .. } => {
                            self.prop_key(key);
                            self.function(function, false);
                        }
                        Prop::Spread(arg) => self.expr(arg),
                    }
                }
            }
            ExprKind::Function(function) => self.function(function, true),
            ExprKind::Class(class) => self.class(class, true),
            ExprKind::Arrow { params, body, .. } => {
                match body {
                    ArrowBody::Expr(_) => self.scopes.enter_function(None, params, &[]),
                    ArrowBody::Block(stmts) => self.scopes.enter_function(None, params, stmts),
                }
                for param in params.iter_mut() {
                    self.pattern(param);
                }
                match body {
                    ArrowBody::Expr(body) => self.expr(body),
                    ArrowBody::Block(body) => self.block(body),
                }
                self.scopes.exit();
            }
            ExprKind::Member { object, .. } => self.expr(object),
            ExprKind::Index { object, index, .. } => {
                self.expr(object);
                self.expr(index);
            }
            ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Import(args) | ExprKind::Sequence(args) => {
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Chain(arg)
            | ExprKind::Unary { arg, .. }
            | ExprKind::Update { arg, .. }
            | ExprKind::Spread(arg)
            | ExprKind::Await(arg) => self.expr(arg),
            ExprKind::Yield { arg, .. } => {
                if let Some(arg) = arg {
                    self.expr(arg);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
        }
    }
}

/// `["items", 2]`: the address literal handed to the store.
fn key_array(path: &Path) -> Expr {
    ExprKind::Array(
        path.iter()
            .map(|key| {
                Some(match key {
                    Key::Name(name) => Expr::str(name.clone()),
                    Key::Index(i) => Expr::num(i.to_string()),
                    // extraction only yields names and indices
                    Key::Symbol(symbol) => Expr::str(symbol.description()),
                })
            })
            .collect(),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::print_program;

    fn run(source: &str) -> (String, RewriteReport) {
        let (program, report) = rewrite_with_report(parse(source).unwrap(), &ModuleTable::default());
        (print_program(&program), report)
    }

    fn splice(source: &str) -> String {
        rewrite_source(source, &ModuleTable::default()).unwrap()
    }

    // ========================================================================
    // Tree rewriting
    // ========================================================================

    #[test]
    fn test_store_method_call() {
        let (out, report) = run("import { get } from '@easm/core';\nget(store.state.user.name);");
        assert_eq!(
            out,
            "import { get } from \"@easm/core\";\nstore.get([\"user\", \"name\"]);\n"
        );
        assert_eq!(report.rewritten.len(), 1);
        assert_eq!(report.rewritten[0].function, "get");
        assert!(report.is_clean());
    }

    #[test]
    fn test_extra_arguments_after_second_are_dropped() {
        let (out, _) = run("import { set } from '@easm/core';\nset(s.state.a, 1, 2);");
        assert!(out.ends_with("s.set([\"a\"], 1);\n"), "{out}");
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let (out, report) = run("import { pop } from '@easm/core';\npop();");
        assert!(out.ends_with("pop();\n"));
        assert_eq!(
            report.skipped,
            vec![SkippedCall {
                function: "pop".into(),
                reason: SkipReason::MissingArgument
            }]
        );
    }

    #[test]
    fn test_nested_calls_are_rewritten() {
        let (out, report) = run(
            "import { get, set } from '@easm/core';\n\
             set(store.state.selected, get(store.state.items[0]));",
        );
        assert!(
            out.ends_with("store.set([\"selected\"], store.get([\"items\", 0]));\n"),
            "{out}"
        );
        let functions: Vec<_> = report.rewritten.iter().map(|c| c.function.as_str()).collect();
        assert_eq!(functions, ["set", "get"]);
    }

    #[test]
    fn test_calls_inside_functions_and_receivers() {
        let (out, _) = run(
            "import { get } from '@easm/core';\n\
             export const view = ({ store }) => get(pick(get(root.state.stores)[0]).state.name);",
        );
        assert!(
            out.contains("pick(root.get([\"stores\"])[0]).get([\"name\"])"),
            "{out}"
        );
    }

    #[test]
    fn test_no_recognized_imports_leaves_program_untouched() {
        let source = "get(store.state.a);";
        let (out, report) = run(source);
        assert_eq!(out, "get(store.state.a);\n");
        assert_eq!(report, RewriteReport::default());
    }

    #[test]
    fn test_calls_in_every_statement_form() {
        let (_, report) = run(
            "import { get } from '@easm/core';\n\
             for (let i = get(s.state.a); i < get(s.state.b); i++) {}\n\
             for (const k in get(s.state.c)) {}\n\
             while (get(s.state.d)) { do { get(s.state.e) } while (0) }\n\
             switch (get(s.state.f)) { case get(s.state.g): break }\n\
             try { get(s.state.h) } catch (e) { get(s.state.i) } finally { get(s.state.j) }\n\
             class A { x = get(s.state.k); static { get(s.state.l) } m() { return get(s.state.m) } }\n\
             async function* f() { yield get(s.state.n); await get(s.state.o) }\n\
             tag`${get(s.state.p)}`;\n\
             a?.[get(s.state.q)];",
        );
        let paths: Vec<String> = report.rewritten.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(paths.len(), 17, "{paths:?}");
        assert!(report.is_clean());
    }

    #[test]
    fn test_optional_call_is_left_alone() {
        let (out, report) = run("import { get } from '@easm/core';\nget?.(s.state.a);");
        assert!(out.ends_with("get?.(s.state.a);\n"), "{out}");
        assert_eq!(report, RewriteReport::default());
    }

    // ========================================================================
    // Shadowing
    // ========================================================================

    #[test]
    fn test_shadowed_parameter_is_left_alone() {
        let source = "import { get } from '@easm/core';\n\
                      function f(get) { return get(store.state.a); }\n\
                      get(store.state.b);";
        let out = splice(source);
        assert_eq!(
            out,
            "import { get } from '@easm/core';\n\
             function f(get) { return get(store.state.a); }\n\
             store.get([\"b\"]);"
        );
    }

    #[test]
    fn test_shadowing_follows_block_scope() {
        let (_, report) = run(
            "import { get } from '@easm/core';\n\
             { let get = read; get(s.state.hidden) }\n\
             get(s.state.visible);\n\
             try {} catch (get) { get(s.state.caught) }\n\
             function g() { if (x) { var get = 1 } return get(s.state.hoisted) }\n\
             for (const get of xs) get(s.state.looped);\n\
             const h = function get() { return get(s.state.named) };\n\
             const arrow = (get) => get(s.state.param);\n\
             import * as core from '@easm/core';\n\
             function n(core) { core.get(s.state.ns) }\n\
             core.get(s.state.outside);",
        );
        let paths: Vec<String> = report.rewritten.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(paths.len(), 2, "{paths:?}");
        assert_eq!(report.rewritten[0].path, easm_state::path!("visible"));
        assert_eq!(report.rewritten[1].path, easm_state::path!("outside"));
        assert!(report.is_clean());
    }

    // ========================================================================
    // Splicing
    // ========================================================================

    #[test]
    fn test_comments_and_formatting_survive() {
        let source = "import {get} from '@easm/core' // keep me\n\
                      \n\
                      /** docs */\n\
                      export const x = /*#__PURE__*/ get(store.state.a['b'],   ) ;\n\
                      const y = 'single'   // trailing\n";
        assert_eq!(
            splice(source),
            "import {get} from '@easm/core' // keep me\n\
             \n\
             /** docs */\n\
             export const x = /*#__PURE__*/ store.get([\"a\", \"b\"]) ;\n\
             const y = 'single'   // trailing\n"
        );
    }

    #[test]
    fn test_nested_rewrites_splice_into_their_parents() {
        let source = "import { get, set } from '@easm/core';\n\
                      set(store.state.x, get( other.state.y ) /* v */);\n\
                      get(pick(get(root.state.stores)[0]).state.name);";
        assert_eq!(
            splice(source),
            "import { get, set } from '@easm/core';\n\
             store.set([\"x\"], other.get([\"y\"]));\n\
             pick(root.get([\"stores\"])[0]).get([\"name\"]);"
        );
    }

    #[test]
    fn test_factory_argument_is_spliced() {
        let source = "import { connect } from '@easm/react/connect';\n\
                      export default connect(  (app).state.list , render);";
        let modules = ModuleTable::default().with_module(
            "@easm/react/connect",
            crate::ModuleSpec::new(CallKind::SubStoreFactory, ["connect"]),
        );
        assert_eq!(
            rewrite_source(source, &modules).unwrap(),
            "import { connect } from '@easm/react/connect';\n\
             export default connect(  (app).getSubStore([\"list\"]) , render);"
        );
    }

    #[test]
    fn test_untouched_source_is_returned_verbatim() {
        let source = "// nothing to do\nconst a = {b: 1}\n";
        assert_eq!(splice(source), source);
    }
}
