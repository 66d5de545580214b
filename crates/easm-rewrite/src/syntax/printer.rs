//! Pretty printer emitting source that parses back to the same tree.
//!
//! Parentheses are only emitted where precedence, associativity or a
//! statement-start ambiguity demands them.

use super::ast::*;

/// Render a program, one top-level statement per line.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::default();
    for stmt in &program.body {
        printer.stmt(stmt);
        printer.out.push('\n');
    }
    printer.out
}

/// Render a single expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr, prec::ASSIGN);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
    /// Inside the head of a `for` statement, where a bare `in` would end
    /// the initializer.
    no_in: bool,
}

impl Printer {
    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn comma_separated<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            each(self, item);
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(decl) => self.import(decl),
            Stmt::Export(decl) => self.export(decl),
            Stmt::Var(decl) => {
                self.var_decl(decl);
                self.write(";");
            }
            Stmt::Function(function) => self.function(function),
            Stmt::Class(class) => self.class(class),
            Stmt::Return(arg) => {
                self.write("return");
                if let Some(arg) = arg {
                    self.write(" ");
                    self.expr(arg, prec::COMMA);
                }
                self.write(";");
            }
            Stmt::Throw(arg) => {
                self.write("throw ");
                self.expr(arg, prec::COMMA);
                self.write(";");
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.write("if (");
                self.expr(test, prec::COMMA);
                self.write(") ");
                // an inner `if` without `else` would capture ours
                if alternate.is_some() && ends_with_open_if(consequent) {
                    self.block(std::slice::from_ref(&**consequent));
                } else {
                    self.stmt(consequent);
                }
                if let Some(alternate) = alternate {
                    if matches!(**consequent, Stmt::Block(_)) || ends_with_open_if(consequent) {
                        self.write(" ");
                    } else {
                        self.newline();
                    }
                    self.write("else ");
                    self.stmt(alternate);
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.write("for (");
                if let Some(init) = init {
                    self.for_init(init);
                }
                self.write(";");
                if let Some(test) = test {
                    self.write(" ");
                    self.expr(test, prec::COMMA);
                }
                self.write(";");
                if let Some(update) = update {
                    self.write(" ");
                    self.expr(update, prec::COMMA);
                }
                self.write(") ");
                self.stmt(body);
            }
            Stmt::ForIn { left, right, body } => {
                self.write("for (");
                self.for_init(left);
                self.write(" in ");
                self.expr(right, prec::COMMA);
                self.write(") ");
                self.stmt(body);
            }
            Stmt::ForOf {
                is_await,
                left,
                right,
                body,
            } => {
                self.write(if *is_await { "for await (" } else { "for (" });
                self.for_init(left);
                self.write(" of ");
                self.expr(right, prec::ASSIGN);
                self.write(") ");
                self.stmt(body);
            }
            Stmt::While { test, body } => {
                self.write("while (");
                self.expr(test, prec::COMMA);
                self.write(") ");
                self.stmt(body);
            }
            Stmt::DoWhile { body, test } => {
                self.write("do ");
                self.stmt(body);
                self.write(" while (");
                self.expr(test, prec::COMMA);
                self.write(");");
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.switch(discriminant, cases),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.write("try ");
                self.block(block);
                if let Some(handler) = handler {
                    self.write(" catch ");
                    if let Some(param) = &handler.param {
                        self.write("(");
                        self.pattern(param);
                        self.write(") ");
                    }
                    self.block(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.block(finalizer);
                }
            }
            Stmt::Break(label) => self.jump("break", label.as_deref()),
            Stmt::Continue(label) => self.jump("continue", label.as_deref()),
            Stmt::Labeled { label, body } => {
                self.write(label);
                self.write(": ");
                self.stmt(body);
            }
            Stmt::Debugger => self.write("debugger;"),
            Stmt::Block(body) => self.block(body),
            Stmt::Expr(expr) => {
                if starts_ambiguously(expr) {
                    self.parenthesized(expr);
                } else {
                    self.expr(expr, prec::COMMA);
                }
                self.write(";");
            }
            Stmt::Empty => self.write(";"),
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        if body.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.indent += 1;
        for stmt in body {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    fn jump(&mut self, keyword: &str, label: Option<&str>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    fn for_init(&mut self, init: &ForInit) {
        let saved = std::mem::replace(&mut self.no_in, true);
        match init {
            ForInit::Var(decl) => self.var_decl(decl),
            ForInit::Expr(expr) => self.expr(expr, prec::COMMA),
        }
        self.no_in = saved;
    }

    fn switch(&mut self, discriminant: &Expr, cases: &[SwitchCase]) {
        self.write("switch (");
        self.expr(discriminant, prec::COMMA);
        self.write(") {");
        for case in cases {
            self.indent += 1;
            self.newline();
            match &case.test {
                Some(test) => {
                    self.write("case ");
                    self.expr(test, prec::COMMA);
                    self.write(":");
                }
                None => self.write("default:"),
            }
            self.indent += 1;
            for stmt in &case.body {
                self.newline();
                self.stmt(stmt);
            }
            self.indent -= 2;
        }
        if !cases.is_empty() {
            self.newline();
        }
        self.write("}");
    }

    fn import(&mut self, decl: &ImportDecl) {
        self.write("import ");
        let mut clauses = Vec::new();
        let mut named = Vec::new();
        for specifier in &decl.specifiers {
            match specifier {
                ImportSpecifier::Default(local) => clauses.push(local.clone()),
                ImportSpecifier::Namespace(local) => clauses.push(format!("* as {}", local)),
                ImportSpecifier::Named { imported, local } if imported == local => {
                    named.push(local.clone())
                }
                ImportSpecifier::Named { imported, local } => {
                    named.push(format!("{} as {}", imported, local))
                }
            }
        }
        if !named.is_empty() {
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }
        if !clauses.is_empty() {
            self.write(&clauses.join(", "));
            self.write(" from ");
        }
        self.string(&decl.source);
        self.write(";");
    }

    fn export(&mut self, decl: &ExportDecl) {
        self.write("export ");
        match decl {
            ExportDecl::Decl(stmt) => self.stmt(stmt),
            ExportDecl::Default(expr) => {
                self.write("default ");
                match &expr.kind {
                    ExprKind::Function(function) => self.function(function),
                    ExprKind::Class(class) => self.class(class),
                    _ => {
                        if starts_ambiguously(expr) {
                            self.parenthesized(expr);
                        } else {
                            self.expr(expr, prec::ASSIGN);
                        }
                        self.write(";");
                    }
                }
            }
            ExportDecl::Named { specifiers, source } => {
                if specifiers.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{ ");
                    self.comma_separated(specifiers, |p, s| {
                        p.write(&s.local);
                        if s.exported != s.local {
                            p.write(" as ");
                            p.write(&s.exported);
                        }
                    });
                    self.write(" }");
                }
                if let Some(source) = source {
                    self.write(" from ");
                    self.string(source);
                }
                self.write(";");
            }
            ExportDecl::All { exported, source } => {
                self.write("*");
                if let Some(exported) = exported {
                    self.write(" as ");
                    self.write(exported);
                }
                self.write(" from ");
                self.string(source);
                self.write(";");
            }
        }
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.as_str());
        self.write(" ");
        self.comma_separated(&decl.declarators, |p, d| {
            p.pattern(&d.target);
            if let Some(init) = &d.init {
                p.write(" = ");
                p.expr(init, prec::ASSIGN);
            }
        });
    }

    fn function(&mut self, function: &Function) {
        if function.is_async {
            self.write("async ");
        }
        self.write("function");
        if function.is_generator {
            self.write("*");
        }
        if let Some(name) = &function.name {
            self.write(" ");
            self.write(name);
        }
        self.params(&function.params);
        self.write(" ");
        self.function_body(&function.body);
    }

    /// Function bodies reset the `for`-head restriction.
    fn function_body(&mut self, body: &[Stmt]) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.block(body);
        self.no_in = saved;
    }

    fn params(&mut self, params: &[Pattern]) {
        self.write("(");
        self.comma_separated(params, |p, param| p.pattern(param));
        self.write(")");
    }

    /// `static async *key(params) { body }` and accessor forms.
    fn method(&mut self, key: &PropKey, kind: MethodKind, function: &Function) {
        if function.is_async {
            self.write("async ");
        }
        match kind {
            MethodKind::Get => self.write("get "),
            MethodKind::Set => self.write("set "),
            MethodKind::Method => {}
        }
        if function.is_generator {
            self.write("*");
        }
        self.prop_key(key);
        self.params(&function.params);
        self.write(" ");
        self.function_body(&function.body);
    }

    fn class(&mut self, class: &Class) {
        self.write("class");
        if let Some(name) = &class.name {
            self.write(" ");
            self.write(name);
        }
        if let Some(super_class) = &class.super_class {
            self.write(" extends ");
            self.expr(super_class, prec::CALL);
        }
        self.write(" ");
        if class.body.is_empty() {
            self.write("{}");
            return;
        }
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("{");
        self.indent += 1;
        for member in &class.body {
            self.newline();
            match member {
                ClassMember::Method {
                    key,
                    kind,
                    is_static,
                    function,
                } => {
                    if *is_static {
                        self.write("static ");
                    }
                    self.method(key, *kind, function);
                }
                ClassMember::Field {
                    key,
                    is_static,
                    value,
                } => {
                    if *is_static {
                        self.write("static ");
                    }
                    self.prop_key(key);
                    if let Some(value) = value {
                        self.write(" = ");
                        self.expr(value, prec::ASSIGN);
                    }
                    self.write(";");
                }
                ClassMember::StaticBlock(body) => {
                    self.write("static ");
                    self.block(body);
                }
            }
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
        self.no_in = saved;
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(name) => self.write(name),
            Pattern::Object(props) => {
                if props.is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                self.comma_separated(props, |p, prop| match prop {
                    PatternProp::KeyValue {
                        value,
                        shorthand: true,
                        ..
                    } => p.pattern(value),
                    PatternProp::KeyValue { key, value, .. } => {
                        p.prop_key(key);
                        p.write(": ");
                        p.pattern(value);
                    }
                    PatternProp::Rest(target) => {
                        p.write("...");
                        p.pattern(target);
                    }
                });
                self.write(" }");
            }
            Pattern::Array(items) => {
                self.write("[");
                self.comma_separated(items, |p, item| {
                    if let Some(item) = item {
                        p.pattern(item);
                    }
                });
                if matches!(items.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            Pattern::Default(target, default) => {
                self.pattern(target);
                self.write(" = ");
                self.expr(default, prec::ASSIGN);
            }
            Pattern::Rest(target) => {
                self.write("...");
                self.pattern(target);
            }
        }
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) | PropKey::Private(name) => self.write(name),
            PropKey::Str(value) => self.string(value),
            PropKey::Num(raw) => self.write(raw),
            PropKey::Computed(expr) => {
                self.write("[");
                self.expr(expr, prec::ASSIGN);
                self.write("]");
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Print `expr`, parenthesized when it binds looser than `min_prec`.
    fn expr(&mut self, expr: &Expr, min_prec: u8) {
        let bare_in = self.no_in
            && matches!(
                expr.kind,
                ExprKind::Binary {
                    op: BinaryOp::In,
                    ..
                }
            );
        if expr.precedence() < min_prec || bare_in {
            self.parenthesized(expr);
        } else {
            self.expr_inner(expr);
        }
    }

    fn parenthesized(&mut self, expr: &Expr) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("(");
        self.expr_inner(expr);
        self.write(")");
        self.no_in = saved;
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.write(name),
            ExprKind::This => self.write("this"),
            ExprKind::Super => self.write("super"),
            ExprKind::Null => self.write("null"),
            ExprKind::Bool(b) => self.write(if *b { "true" } else { "false" }),
            ExprKind::Num(raw) => self.write(raw),
            ExprKind::Str(value) => self.string(value),
            ExprKind::Regex { pattern, flags } => {
                self.write("/");
                self.write(pattern);
                self.write("/");
                self.write(flags);
            }
            ExprKind::Template(template) => self.template(template),
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.member_object(tag);
                self.template(quasi);
            }
            ExprKind::Array(items) => {
                self.write("[");
                self.comma_separated(items, |p, item| {
                    if let Some(item) = item {
                        p.expr(item, prec::ASSIGN);
                    }
                });
                if matches!(items.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            ExprKind::Object(props) => self.object(props),
            ExprKind::Function(function) => self.function(function),
            ExprKind::Class(class) => self.class(class),
            ExprKind::Arrow {
                is_async,
                params,
                body,
            } => {
                if *is_async {
                    self.write("async ");
                }
                self.params(params);
                self.write(" => ");
                match body {
                    ArrowBody::Block(stmts) => self.function_body(stmts),
                    ArrowBody::Expr(body)
                        if matches!(leftmost(body).kind, ExprKind::Object(_)) =>
                    {
                        self.parenthesized(body)
                    }
                    ArrowBody::Expr(body) => self.expr(body, prec::ASSIGN),
                }
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                self.member_object(object);
                self.write(if *optional { "?." } else { "." });
                self.write(property);
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                self.member_object(object);
                self.write(if *optional { "?.[" } else { "[" });
                self.expr(index, prec::COMMA);
                self.write("]");
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                self.member_object(callee);
                if *optional {
                    self.write("?.");
                }
                self.arguments(args);
            }
            ExprKind::Chain(inner) => self.expr_inner(inner),
            ExprKind::New { callee, args } => {
                self.write("new ");
                if contains_call(callee) {
                    self.parenthesized(callee);
                } else {
                    self.expr(callee, prec::CALL);
                }
                self.arguments(args);
            }
            ExprKind::MetaProperty { meta, property } => {
                self.write(meta);
                self.write(".");
                self.write(property);
            }
            ExprKind::Import(args) => {
                self.write("import");
                self.arguments(args);
            }
            ExprKind::Unary { op, arg } => {
                self.write(op.as_str());
                if op.is_word() || sign_would_merge(*op, arg) {
                    self.write(" ");
                }
                self.expr(arg, prec::PREFIX);
            }
            ExprKind::Await(arg) => {
                self.write("await ");
                self.expr(arg, prec::PREFIX);
            }
            ExprKind::Update {
                increment,
                prefix,
                arg,
            } => {
                let op = if *increment { "++" } else { "--" };
                if *prefix {
                    self.write(op);
                    self.expr(arg, prec::CALL);
                } else {
                    self.expr(arg, prec::CALL);
                    self.write(op);
                }
            }
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                let (left_min, right_min) = if op.is_right_assoc() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                if binary_operand_needs_parens(*op, left, true) {
                    self.parenthesized(left);
                } else {
                    self.expr(left, left_min);
                }
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                if binary_operand_needs_parens(*op, right, false) {
                    self.parenthesized(right);
                } else {
                    self.expr(right, right_min);
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test, prec::LOGICAL_OR);
                self.write(" ? ");
                self.expr(consequent, prec::ASSIGN);
                self.write(" : ");
                self.expr(alternate, prec::ASSIGN);
            }
            ExprKind::Assign { op, target, value } => {
                self.expr(target, prec::CALL);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.expr(value, prec::ASSIGN);
            }
            ExprKind::Sequence(items) => {
                self.comma_separated(items, |p, item| p.expr(item, prec::ASSIGN));
            }
            ExprKind::Spread(arg) => {
                self.write("...");
                self.expr(arg, prec::ASSIGN);
            }
            ExprKind::Yield { delegate, arg } => {
                self.write(if *delegate { "yield*" } else { "yield" });
                if let Some(arg) = arg {
                    self.write(" ");
                    self.expr(arg, prec::ASSIGN);
                }
            }
        }
    }

    fn member_object(&mut self, object: &Expr) {
        // `1.toString` would lex as a malformed number, and a closed
        // optional chain must not absorb what follows it
        if matches!(object.kind, ExprKind::Num(_) | ExprKind::Chain(_)) {
            self.parenthesized(object);
        } else {
            self.expr(object, prec::CALL);
        }
    }

    fn arguments(&mut self, args: &[Expr]) {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.write("(");
        self.comma_separated(args, |p, arg| p.expr(arg, prec::ASSIGN));
        self.write(")");
        self.no_in = saved;
    }

    fn template(&mut self, template: &Template) {
        self.write("`");
        for (i, quasi) in template.quasis.iter().enumerate() {
            self.write(&quasi.raw);
            if let Some(expr) = template.exprs.get(i) {
                self.write("${");
                self.expr(expr, prec::COMMA);
                self.write("}");
            }
        }
        self.write("`");
    }

    fn object(&mut self, props: &[Prop]) {
        if props.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        self.comma_separated(props, |p, prop| match prop {
            Prop::KeyValue { key, value } => {
                p.prop_key(key);
                p.write(": ");
                p.expr(value, prec::ASSIGN);
            }
            Prop::Shorthand(name) => p.write(name),
            Prop::Method {
                key,
                kind,
                function,
            } => p.method(key, *kind, function),
            Prop::Spread(arg) => p.expr(arg, prec::ASSIGN),
        });
        self.write(" }");
    }

    fn string(&mut self, value: &str) {
        self.out.push('"');
        for c in value.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{2028}' => self.out.push_str("\\u2028"),
                '\u{2029}' => self.out.push_str("\\u2029"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

/// The node whose text comes first when `expr` is printed.
fn leftmost(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Member { object, .. } | ExprKind::Index { object, .. } => leftmost(object),
        ExprKind::Call { callee, .. } => leftmost(callee),
        ExprKind::TaggedTemplate { tag, .. } => leftmost(tag),
        ExprKind::Chain(inner) => leftmost(inner),
        ExprKind::Binary { left, .. } => leftmost(left),
        ExprKind::Conditional { test, .. } => leftmost(test),
        ExprKind::Assign { target, .. } => leftmost(target),
        ExprKind::Update {
            prefix: false, arg, ..
        } => leftmost(arg),
        ExprKind::Sequence(items) => items.first().map_or(expr, leftmost),
        _ => expr,
    }
}

/// An expression statement whose first token would read as a block or a
/// declaration. A regular expression is included because after a closing
/// brace its slash reads as division.
fn starts_ambiguously(expr: &Expr) -> bool {
    matches!(
        leftmost(expr).kind,
        ExprKind::Object(_) | ExprKind::Function(_) | ExprKind::Class(_) | ExprKind::Regex { .. }
    )
}

/// `new (f())()` must keep the call inside the callee.
fn contains_call(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } | ExprKind::Chain(_) => true,
        ExprKind::Member { object, .. } | ExprKind::Index { object, .. } => contains_call(object),
        ExprKind::TaggedTemplate { tag, .. } => contains_call(tag),
        _ => false,
    }
}

/// Whether an `else` placed after `stmt` would bind to an `if` inside it.
fn ends_with_open_if(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If {
            alternate: None, ..
        } => true,
        Stmt::If {
            alternate: Some(alternate),
            ..
        } => ends_with_open_if(alternate),
        Stmt::For { body, .. }
        | Stmt::ForIn { body, .. }
        | Stmt::ForOf { body, .. }
        | Stmt::While { body, .. }
        | Stmt::Labeled { body, .. } => ends_with_open_if(body),
        _ => false,
    }
}

/// `- -x` and `+ ++x` must not fuse into a different operator.
fn sign_would_merge(op: UnaryOp, arg: &Expr) -> bool {
    match (op, &arg.kind) {
        (UnaryOp::Minus, ExprKind::Unary { op: UnaryOp::Minus, .. }) => true,
        (UnaryOp::Plus, ExprKind::Unary { op: UnaryOp::Plus, .. }) => true,
        (
            UnaryOp::Minus,
            ExprKind::Update {
                increment: false,
                prefix: true,
                ..
            },
        ) => true,
        (
            UnaryOp::Plus,
            ExprKind::Update {
                increment: true,
                prefix: true,
                ..
            },
        ) => true,
        _ => false,
    }
}

/// Cases precedence alone gets wrong: a unary base of `**`, and `??`
/// mixed with `||` or `&&`.
fn binary_operand_needs_parens(op: BinaryOp, operand: &Expr, is_left: bool) -> bool {
    match &operand.kind {
        ExprKind::Unary { .. } | ExprKind::Await(_) => is_left && op == BinaryOp::Exp,
        ExprKind::Binary { op: inner, .. } => {
            let is_logical = |o: BinaryOp| matches!(o, BinaryOp::Or | BinaryOp::And);
            (op == BinaryOp::Nullish && is_logical(*inner))
                || (is_logical(op) && *inner == BinaryOp::Nullish)
        }
        _ => false,
    }
}
