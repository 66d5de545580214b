//! Recursive-descent parser with precedence climbing for binary operators.
//!
//! Input is parsed with the module goal: strict mode, `await` reserved and
//! top-level `await` allowed. Semicolons are optional wherever a line
//! break, a closing brace or the end of input follows.
//!
//! TypeScript is rejected with a [`ParseError`] rather than misread. Type
//! arguments such as `new Store<State>({})` would otherwise parse as a pair
//! of comparisons, so a `<` that opens a type-shaped run closed by `>` and
//! followed by a call is reported as type syntax.

use super::ast::*;
use super::lexer::{tokenize, Keyword, Span, Token, TokenKind};
use crate::ParseError;

/// Parse a whole module.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

/// Declaration keywords TypeScript adds in statement position.
const TS_DECLARATIONS: &[&str] = &["interface", "type", "namespace", "module", "declare", "abstract"];

/// Member and parameter modifiers TypeScript adds.
const TS_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "readonly",
    "override",
    "declare",
    "abstract",
];

/// Tokens that never appear in a type-argument list are scanned for at most
/// this far.
const TYPE_ARGUMENT_LOOKAHEAD: usize = 64;

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    /// `in` is not a binary operator in the head of a `for` statement.
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            no_in: false,
        })
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.reject_ts_declaration()?;
        match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Import)
                if !self.is_punct_at(1, "(") && !self.is_punct_at(1, ".") =>
            {
                self.parse_import()
            }
            TokenKind::Keyword(Keyword::Export) => self.parse_export(),
            TokenKind::Keyword(Keyword::Const | Keyword::Let | Keyword::Var) => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(Stmt::Var(decl))
            }
            TokenKind::Keyword(Keyword::Function) => Ok(Stmt::Function(self.parse_function(true)?)),
            TokenKind::Ident("async") if self.async_function_ahead() => {
                Ok(Stmt::Function(self.parse_function(true)?))
            }
            TokenKind::Keyword(Keyword::Class) => Ok(Stmt::Class(self.parse_class(true)?)),
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let arg = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                if self.peek().newline_before {
                    return Err(error_at(&self.peek().span, "line break after `throw`"));
                }
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let test = self.parse_paren_expression()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.expect_keyword(Keyword::While)?;
                let test = self.parse_paren_expression()?;
                self.eat_punct(";");
                Ok(Stmt::DoWhile { body, test })
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                let label = self.parse_jump_label()?;
                Ok(Stmt::Break(label))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                let label = self.parse_jump_label()?;
                Ok(Stmt::Continue(label))
            }
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Stmt::Debugger)
            }
            TokenKind::Keyword(Keyword::With) => Err(error_at(
                &self.peek().span,
                "`with` statements are not allowed in modules",
            )),
            TokenKind::Keyword(Keyword::Enum) => Err(self.typescript("`enum` declarations")),
            TokenKind::Ident(label) if self.is_punct_at(1, ":") => {
                self.advance();
                self.advance();
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::Labeled {
                    label: label.to_string(),
                    body,
                })
            }
            TokenKind::Punct("{") => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Punct(";") => {
                self.advance();
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `interface X`, `type X = ...`, `declare const ...` and the like.
    /// Each is a syntax error in JavaScript, so any of these words followed
    /// on the same line by a name is TypeScript.
    fn reject_ts_declaration(&self) -> Result<(), ParseError> {
        let TokenKind::Ident(word) = self.peek().kind else {
            return Ok(());
        };
        if !TS_DECLARATIONS.contains(&word) {
            return Ok(());
        }
        let next = self.peek_at(1);
        let names_something = matches!(
            next.kind,
            TokenKind::Ident(_)
                | TokenKind::Keyword(
                    Keyword::Class | Keyword::Const | Keyword::Let | Keyword::Var | Keyword::Function | Keyword::Enum
                )
        );
        if names_something && !next.newline_before {
            return Err(self.typescript(&format!("`{}` declarations", word)));
        }
        Ok(())
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Import)?;
        let mut specifiers = Vec::new();

        if self.is_contextual("type")
            && (matches!(self.peek_at(1).kind, TokenKind::Punct("{" | "*"))
                || matches!(self.peek_at(1).kind, TokenKind::Ident(w) if w != "from"))
        {
            return Err(self.typescript("type-only imports"));
        }

        if !matches!(self.peek().kind, TokenKind::Str(_)) {
            let mut named_clause = true;
            if matches!(self.peek().kind, TokenKind::Ident(_)) {
                specifiers.push(ImportSpecifier::Default(self.expect_ident()?));
                named_clause = self.eat_punct(",");
            }
            if named_clause {
                if self.eat_punct("*") {
                    self.expect_contextual("as")?;
                    specifiers.push(ImportSpecifier::Namespace(self.expect_ident()?));
                } else if self.eat_punct("{") {
                    while !self.is_punct("}") {
                        let imported = self.module_export_name()?;
                        let local = if self.eat_contextual("as") {
                            self.expect_ident()?
                        } else {
                            imported.clone()
                        };
                        specifiers.push(ImportSpecifier::Named { imported, local });
                        if !self.eat_punct(",") {
                            break;
                        }
                    }
                    self.expect_punct("}")?;
                } else {
                    return Err(self.unexpected("import specifiers"));
                }
            }
            self.expect_contextual("from")?;
        }

        let source = self.expect_string()?;
        self.consume_semicolon()?;
        Ok(Stmt::Import(ImportDecl { specifiers, source }))
    }

    fn parse_export(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Export)?;

        if self.eat_keyword(Keyword::Default) {
            if self.is_keyword(Keyword::Function) || self.async_function_ahead() {
                let function = self.parse_function(false)?;
                self.eat_punct(";");
                return Ok(Stmt::Export(ExportDecl::Default(
                    ExprKind::Function(Box::new(function)).into(),
                )));
            }
            if self.is_keyword(Keyword::Class) {
                let class = self.parse_class(false)?;
                self.eat_punct(";");
                return Ok(Stmt::Export(ExportDecl::Default(
                    ExprKind::Class(Box::new(class)).into(),
                )));
            }
            if self.is_contextual("interface") || self.is_contextual("abstract") {
                return Err(self.typescript("default type exports"));
            }
            let expr = self.parse_assignment()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Export(ExportDecl::Default(expr)));
        }

        if self.eat_punct("*") {
            let exported = if self.eat_contextual("as") {
                Some(self.module_export_name()?)
            } else {
                None
            };
            self.expect_contextual("from")?;
            let source = self.expect_string()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Export(ExportDecl::All { exported, source }));
        }

        if self.is_contextual("type") && self.is_punct_at(1, "{") {
            return Err(self.typescript("type-only exports"));
        }

        if self.eat_punct("{") {
            let mut specifiers = Vec::new();
            while !self.is_punct("}") {
                let local = self.module_export_name()?;
                let exported = if self.eat_contextual("as") {
                    self.module_export_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
            let source = if self.eat_contextual("from") {
                Some(self.expect_string()?)
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(Stmt::Export(ExportDecl::Named { specifiers, source }));
        }

        self.reject_ts_declaration()?;
        if self.is_keyword(Keyword::Enum) {
            return Err(self.typescript("`enum` declarations"));
        }
        let is_decl = [
            Keyword::Const,
            Keyword::Let,
            Keyword::Var,
            Keyword::Function,
            Keyword::Class,
        ]
        .into_iter()
        .any(|k| self.is_keyword(k))
            || self.async_function_ahead();
        if !is_decl {
            return Err(self.unexpected("declaration"));
        }
        let decl = self.parse_statement()?;
        Ok(Stmt::Export(ExportDecl::Decl(Box::new(decl))))
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, ParseError> {
        let kind = if self.eat_keyword(Keyword::Const) {
            VarKind::Const
        } else if self.eat_keyword(Keyword::Let) {
            VarKind::Let
        } else if self.eat_keyword(Keyword::Var) {
            VarKind::Var
        } else {
            return Err(self.unexpected("declaration"));
        };

        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            if self.is_punct(":") || (self.is_punct("!") && self.is_punct_at(1, ":")) {
                return Err(self.typescript("type annotations"));
            }
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { target, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(VarDecl { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::If)?;
        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let for_token = self.peek().span;
        self.expect_keyword(Keyword::For)?;
        let is_await = self.eat_keyword(Keyword::Await);
        self.expect_punct("(")?;

        let init = if self.is_punct(";") {
            None
        } else if [Keyword::Const, Keyword::Let, Keyword::Var]
            .into_iter()
            .any(|k| self.is_keyword(k))
        {
            Some(ForInit::Var(self.without_in(|p| p.parse_var_decl())?))
        } else {
            Some(ForInit::Expr(self.without_in(|p| p.parse_expression())?))
        };

        if let Some(left) = init.as_ref() {
            let is_of = self.is_contextual("of");
            if is_of || self.is_keyword(Keyword::In) {
                if !is_iteration_target(left) {
                    return Err(error_at(&self.peek().span, "invalid left-hand side in for loop"));
                }
                self.advance();
                let right = if is_of {
                    self.with_in(|p| p.parse_assignment())?
                } else {
                    self.with_in(|p| p.parse_expression())?
                };
                self.expect_punct(")")?;
                let body = Box::new(self.parse_statement()?);
                let left = init.ok_or_else(|| error_at(&for_token, "missing loop target"))?;
                return Ok(if is_of {
                    Stmt::ForOf {
                        is_await,
                        left,
                        right,
                        body,
                    }
                } else {
                    Stmt::ForIn { left, right, body }
                });
            }
        }
        if is_await {
            return Err(self.unexpected("`of`"));
        }

        self.expect_punct(";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.with_in(|p| p.parse_expression())?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.with_in(|p| p.parse_expression())?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Switch)?;
        let discriminant = self.parse_paren_expression()?;
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        while !self.is_punct("}") {
            let test = if self.eat_keyword(Keyword::Case) {
                Some(self.parse_expression()?)
            } else if self.eat_keyword(Keyword::Default) {
                None
            } else {
                return Err(self.unexpected("`case`"));
            };
            self.expect_punct(":")?;
            let mut body = Vec::new();
            while !self.is_punct("}")
                && !self.is_keyword(Keyword::Case)
                && !self.is_keyword(Keyword::Default)
                && !self.at_eof()
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect_punct("}")?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block()?;
        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.eat_punct("(") {
                let param = self.parse_binding_target()?;
                if self.is_punct(":") {
                    return Err(self.typescript("type annotations"));
                }
                self.expect_punct(")")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_jump_label(&mut self) -> Result<Option<String>, ParseError> {
        let label = match self.peek().kind {
            TokenKind::Ident(name) if !self.peek().newline_before => {
                self.advance();
                Some(name.to_string())
            }
            _ => None,
        };
        self.consume_semicolon()?;
        Ok(label)
    }

    fn parse_paren_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct("(")?;
        let expr = self.with_in(|p| p.parse_expression())?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") && !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        self.expect_punct("}")?;
        Ok(body)
    }

    fn async_function_ahead(&self) -> bool {
        self.is_contextual("async")
            && matches!(self.peek_at(1).kind, TokenKind::Keyword(Keyword::Function))
            && !self.peek_at(1).newline_before
    }

    /// `[async] function [*] [name] (params) { body }`
    fn parse_function(&mut self, require_name: bool) -> Result<Function, ParseError> {
        let is_async = self.eat_contextual("async");
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_punct("*");
        let name = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?)
        } else if require_name {
            return Err(self.unexpected("function name"));
        } else {
            None
        };
        if self.is_punct("<") {
            return Err(self.typescript("type parameters"));
        }
        let (params, body) = self.parse_function_rest()?;
        Ok(Function {
            name,
            is_async,
            is_generator,
            params,
            body,
        })
    }

    /// Parameter list and body shared by functions and methods.
    fn parse_function_rest(&mut self) -> Result<(Vec<Pattern>, Vec<Stmt>), ParseError> {
        let params = self.parse_params()?;
        if self.is_punct(":") {
            return Err(self.typescript("return type annotations"));
        }
        let body = self.with_in(|p| p.parse_block())?;
        Ok((params, body))
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>, ParseError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            if self.ts_modifier_ahead() {
                return Err(self.typescript("parameter properties"));
            }
            if self.eat_punct("...") {
                params.push(Pattern::Rest(Box::new(self.parse_binding_target()?)));
                self.reject_annotation()?;
            } else {
                params.push(self.parse_pattern()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    fn parse_class(&mut self, require_name: bool) -> Result<Class, ParseError> {
        self.expect_keyword(Keyword::Class)?;
        let name = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?)
        } else if require_name {
            return Err(self.unexpected("class name"));
        } else {
            None
        };
        if self.is_punct("<") {
            return Err(self.typescript("type parameters"));
        }
        let super_class = if self.eat_keyword(Keyword::Extends) {
            Some(Box::new(self.parse_call_member()?))
        } else {
            None
        };
        if self.is_contextual("implements") {
            return Err(self.typescript("`implements` clauses"));
        }

        self.expect_punct("{")?;
        let body = self.with_in(|p| {
            let mut body = Vec::new();
            while !p.is_punct("}") && !p.at_eof() {
                if p.eat_punct(";") {
                    continue;
                }
                body.push(p.parse_class_member()?);
            }
            Ok(body)
        })?;
        self.expect_punct("}")?;
        Ok(Class {
            name,
            super_class,
            body,
        })
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        if self.is_contextual("static") && self.is_punct_at(1, "{") {
            self.advance();
            return Ok(ClassMember::StaticBlock(self.parse_block()?));
        }
        let is_static = self.is_contextual("static") && self.names_member_at(1);
        if is_static {
            self.advance();
        }
        if self.ts_modifier_ahead() {
            return Err(self.typescript("member modifiers"));
        }

        let (kind, is_async, is_generator) = self.parse_method_prefix();
        let key = self.parse_prop_key()?;
        if self.is_punct("(") || kind != MethodKind::Method || is_async || is_generator {
            if self.is_punct("<") {
                return Err(self.typescript("type parameters"));
            }
            let (params, body) = self.parse_function_rest()?;
            return Ok(ClassMember::Method {
                key,
                kind,
                is_static,
                function: Function {
                    name: None,
                    is_async,
                    is_generator,
                    params,
                    body,
                },
            });
        }

        if self.is_punct(":") || self.is_punct("?") || self.is_punct("!") {
            return Err(self.typescript("field type annotations"));
        }
        let value = if self.eat_punct("=") {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        if !self.eat_punct(";") && !self.is_punct("}") && !self.peek().newline_before {
            return Err(self.unexpected("`;`"));
        }
        Ok(ClassMember::Field {
            key,
            is_static,
            value,
        })
    }

    /// `get`, `set`, `async` and `*` before a method name. Each of the words
    /// is an ordinary name when nothing that names a member follows it.
    fn parse_method_prefix(&mut self) -> (MethodKind, bool, bool) {
        let mut kind = MethodKind::Method;
        let mut is_async = false;
        if self.is_contextual("async") && self.names_member_at(1) && !self.peek_at(1).newline_before {
            self.advance();
            is_async = true;
        } else if (self.is_contextual("get") || self.is_contextual("set")) && self.names_member_at(1) {
            kind = if self.is_contextual("get") {
                MethodKind::Get
            } else {
                MethodKind::Set
            };
            self.advance();
        }
        let is_generator = kind == MethodKind::Method && self.eat_punct("*");
        (kind, is_async, is_generator)
    }

    /// Whether the token `n` ahead can start a member name.
    fn names_member_at(&self, n: usize) -> bool {
        matches!(
            self.peek_at(n).kind,
            TokenKind::Ident(_)
                | TokenKind::Keyword(_)
                | TokenKind::PrivateName(_)
                | TokenKind::Str(_)
                | TokenKind::Num(_)
                | TokenKind::Punct("[" | "*")
        )
    }

    fn ts_modifier_ahead(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Ident(word) if TS_MODIFIERS.contains(&word))
            && !self.peek_at(1).newline_before
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Ident(_) | TokenKind::Keyword(_) | TokenKind::PrivateName(_) | TokenKind::Punct("[")
            )
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        let target = self.parse_binding_target()?;
        self.reject_annotation()?;
        if self.eat_punct("=") {
            let default = self.with_in(|p| p.parse_assignment())?;
            return Ok(Pattern::Default(Box::new(target), Box::new(default)));
        }
        Ok(target)
    }

    fn reject_annotation(&self) -> Result<(), ParseError> {
        let optional = self.is_punct("?") && matches!(self.peek_at(1).kind, TokenKind::Punct(":" | "," | ")"));
        if self.is_punct(":") || optional {
            return Err(self.typescript("type annotations"));
        }
        Ok(())
    }

    fn parse_binding_target(&mut self) -> Result<Pattern, ParseError> {
        if self.eat_punct("[") {
            let mut items = Vec::new();
            while !self.is_punct("]") {
                if self.eat_punct(",") {
                    items.push(None);
                    continue;
                }
                if self.eat_punct("...") {
                    items.push(Some(Pattern::Rest(Box::new(self.parse_binding_target()?))));
                } else {
                    items.push(Some(self.parse_pattern()?));
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("]")?;
            return Ok(Pattern::Array(items));
        }

        if self.eat_punct("{") {
            let mut props = Vec::new();
            while !self.is_punct("}") {
                if self.eat_punct("...") {
                    props.push(PatternProp::Rest(self.parse_binding_target()?));
                } else {
                    let key = self.parse_prop_key()?;
                    if self.eat_punct(":") {
                        let value = self.parse_pattern()?;
                        props.push(PatternProp::KeyValue {
                            key,
                            value,
                            shorthand: false,
                        });
                    } else {
                        let PropKey::Ident(name) = &key else {
                            return Err(self.unexpected("`:`"));
                        };
                        let mut value = Pattern::Ident(name.clone());
                        if self.eat_punct("=") {
                            let default = self.with_in(|p| p.parse_assignment())?;
                            value = Pattern::Default(Box::new(value), Box::new(default));
                        }
                        props.push(PatternProp::KeyValue {
                            key,
                            value,
                            shorthand: true,
                        });
                    }
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
            return Ok(Pattern::Object(props));
        }

        Ok(Pattern::Ident(self.expect_ident()?))
    }

    fn parse_prop_key(&mut self) -> Result<PropKey, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok(PropKey::Ident(name.to_string())),
            TokenKind::Keyword(k) => Ok(PropKey::Ident(k.as_str().to_string())),
            TokenKind::PrivateName(name) => Ok(PropKey::Private(name.to_string())),
            TokenKind::Str(s) => Ok(PropKey::Str(s)),
            TokenKind::Num(raw) => Ok(PropKey::Num(raw.to_string())),
            TokenKind::Punct("[") => {
                let expr = self.with_in(|p| p.parse_assignment())?;
                self.expect_punct("]")?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            other => Err(error_at(
                &token.span,
                format!("expected property name, found {}", describe(&other)),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.parse_assignment()?);
        }
        Ok(self.finish(start, ExprKind::Sequence(items)))
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }
        if self.is_keyword(Keyword::Yield) {
            return self.parse_yield();
        }

        let start = self.start();
        let left = self.parse_conditional()?;
        let Some(op) = self.peek_punct().and_then(AssignOp::from_punct) else {
            return Ok(left);
        };
        if !is_assign_target(&left, op) {
            return Err(error_at(&self.peek().span, "invalid assignment target"));
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(self.finish(
            start,
            ExprKind::Assign {
                op,
                target: Box::new(left),
                value: Box::new(value),
            },
        ))
    }

    fn is_arrow_ahead(&self) -> bool {
        let paren_arrow = |open: usize| {
            self.matching_close(open).is_some_and(|close| {
                matches!(
                    self.tokens.get(close + 1),
                    Some(Token {
                        kind: TokenKind::Punct("=>"),
                        newline_before: false,
                        ..
                    })
                )
            })
        };
        match self.peek().kind {
            TokenKind::Ident("async") if !self.peek_at(1).newline_before => {
                match self.peek_at(1).kind {
                    TokenKind::Ident(_) => self.is_punct_at(2, "=>"),
                    TokenKind::Punct("(") => paren_arrow(self.pos + 1),
                    _ => self.is_punct_at(1, "=>"),
                }
            }
            TokenKind::Ident(_) => self.is_punct_at(1, "=>") && !self.peek_at(1).newline_before,
            TokenKind::Punct("(") => paren_arrow(self.pos),
            _ => false,
        }
    }

    /// Index of the bracket closing the one at `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn parse_arrow(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let is_async = self.is_contextual("async") && !self.is_punct_at(1, "=>");
        if is_async {
            self.advance();
        }
        let params = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            vec![Pattern::Ident(self.expect_ident()?)]
        } else {
            self.parse_params()?
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            ArrowBody::Block(self.with_in(|p| p.parse_block())?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };
        Ok(self.finish(
            start,
            ExprKind::Arrow {
                is_async,
                params,
                body,
            },
        ))
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_keyword(Keyword::Yield)?;
        let delegate = !self.peek().newline_before && self.eat_punct("*");
        let ends_here = self.peek().newline_before
            || matches!(
                self.peek().kind,
                TokenKind::Punct(")" | "]" | "}" | "," | ";" | ":")
                    | TokenKind::Eof
                    | TokenKind::Template { head: false, .. }
            );
        let arg = if ends_here && !delegate {
            None
        } else {
            Some(Box::new(self.parse_assignment()?))
        };
        Ok(self.finish(start, ExprKind::Yield { delegate, arg }))
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let test = self.parse_binary(prec::LOGICAL_OR)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.with_in(|p| p.parse_assignment())?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Ok(self.finish(
            start,
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        ))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let right = self.parse_binary(next_min)?;
            left = self.finish(
                start,
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek().kind {
            TokenKind::Punct(p) => BinaryOp::from_punct(p),
            TokenKind::Keyword(Keyword::Instanceof) => Some(BinaryOp::Instanceof),
            TokenKind::Keyword(Keyword::In) if !self.no_in => Some(BinaryOp::In),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let op = match self.peek().kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Minus),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::Typeof),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(self.finish(
                start,
                ExprKind::Unary {
                    op,
                    arg: Box::new(arg),
                },
            ));
        }

        if self.eat_keyword(Keyword::Await) {
            let arg = self.parse_unary()?;
            return Ok(self.finish(start, ExprKind::Await(Box::new(arg))));
        }

        if self.is_punct("++") || self.is_punct("--") {
            let increment = self.is_punct("++");
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(self.finish(
                start,
                ExprKind::Update {
                    increment,
                    prefix: true,
                    arg: Box::new(arg),
                },
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let expr = self.parse_call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.peek().newline_before {
            let increment = self.is_punct("++");
            self.advance();
            return Ok(self.finish(
                start,
                ExprKind::Update {
                    increment,
                    prefix: false,
                    arg: Box::new(expr),
                },
            ));
        }
        Ok(expr)
    }

    fn parse_call_member(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut expr = if self.is_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut in_chain = false;
        loop {
            if self.is_punct("<") && self.type_arguments_ahead() {
                return Err(self.typescript("type arguments"));
            }
            let optional = self.eat_punct("?.");
            in_chain |= optional;
            let kind = if optional && self.is_punct("(") {
                ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional,
                }
            } else if self.eat_punct("[") {
                let index = self.with_in(|p| p.parse_expression())?;
                self.expect_punct("]")?;
                ExprKind::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional,
                }
            } else if optional || self.eat_punct(".") {
                ExprKind::Member {
                    object: Box::new(expr),
                    property: self.member_property()?,
                    optional,
                }
            } else if self.is_punct("(") {
                ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional: false,
                }
            } else if matches!(self.peek().kind, TokenKind::Template { head: true, .. }) {
                if in_chain {
                    return Err(error_at(
                        &self.peek().span,
                        "tagged template in an optional chain",
                    ));
                }
                ExprKind::TaggedTemplate {
                    tag: Box::new(expr),
                    quasi: self.parse_template(true)?,
                }
            } else {
                break;
            };
            expr = self.finish(start, kind);
        }
        if in_chain {
            let range = expr.range;
            expr = Expr::new(ExprKind::Chain(Box::new(expr)), range);
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_keyword(Keyword::New)?;
        if self.eat_punct(".") {
            self.expect_contextual("target")?;
            return Ok(self.finish(
                start,
                ExprKind::MetaProperty {
                    meta: "new".into(),
                    property: "target".into(),
                },
            ));
        }

        let callee_start = self.start();
        let mut callee = if self.is_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let kind = if self.eat_punct(".") {
                ExprKind::Member {
                    object: Box::new(callee),
                    property: self.member_property()?,
                    optional: false,
                }
            } else if self.eat_punct("[") {
                let index = self.with_in(|p| p.parse_expression())?;
                self.expect_punct("]")?;
                ExprKind::Index {
                    object: Box::new(callee),
                    index: Box::new(index),
                    optional: false,
                }
            } else if matches!(self.peek().kind, TokenKind::Template { head: true, .. }) {
                ExprKind::TaggedTemplate {
                    tag: Box::new(callee),
                    quasi: self.parse_template(true)?,
                }
            } else if self.is_punct("?.") {
                return Err(error_at(&self.peek().span, "optional chain in a `new` callee"));
            } else {
                break;
            };
            callee = self.finish(callee_start, kind);
        }
        if self.is_punct("<") && self.type_arguments_ahead() {
            return Err(self.typescript("type arguments"));
        }
        let args = if self.is_punct("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.finish(
            start,
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
        ))
    }

    /// From a `<`: a run of tokens that only occur in types, closed by the
    /// matching `>` and followed by an argument list or a template.
    fn type_arguments_ahead(&self) -> bool {
        let mut depth = 0usize;
        let end = self.tokens.len().min(self.pos + TYPE_ARGUMENT_LOOKAHEAD);
        for i in self.pos..end {
            let closes = match self.tokens[i].kind {
                TokenKind::Punct("<") => {
                    depth += 1;
                    0
                }
                TokenKind::Punct(">") => 1,
                TokenKind::Punct(">>") => 2,
                TokenKind::Punct(">>>") => 3,
                TokenKind::Ident(_)
                | TokenKind::Str(_)
                | TokenKind::Num(_)
                | TokenKind::Keyword(
                    Keyword::Typeof | Keyword::Null | Keyword::Void | Keyword::True | Keyword::False | Keyword::This,
                )
                | TokenKind::Punct("." | "," | "[" | "]" | "|" | "&" | "{" | "}" | ":" | ";" | "?" | "=>") => 0,
                _ => return false,
            };
            if closes > 0 {
                let Some(rest) = depth.checked_sub(closes) else {
                    return false;
                };
                depth = rest;
                if depth == 0 {
                    return matches!(
                        self.tokens.get(i + 1).map(|t| &t.kind),
                        Some(TokenKind::Punct("(") | TokenKind::Template { head: true, .. })
                    );
                }
            }
        }
        false
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct("(")?;
        let args = self.with_in(|p| {
            let mut args = Vec::new();
            while !p.is_punct(")") {
                args.push(p.parse_spread_or_assignment()?);
                if !p.eat_punct(",") {
                    break;
                }
            }
            Ok(args)
        })?;
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_spread_or_assignment(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.eat_punct("...") {
            let arg = self.parse_assignment()?;
            return Ok(self.finish(start, ExprKind::Spread(Box::new(arg))));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.is_keyword(Keyword::Function) || self.async_function_ahead() {
            let function = self.parse_function(false)?;
            return Ok(self.finish(start, ExprKind::Function(Box::new(function))));
        }
        if self.is_keyword(Keyword::Class) {
            let class = self.parse_class(false)?;
            return Ok(self.finish(start, ExprKind::Class(Box::new(class))));
        }
        if matches!(self.peek().kind, TokenKind::Template { head: true, .. }) {
            let template = self.parse_template(false)?;
            return Ok(self.finish(start, ExprKind::Template(template)));
        }

        let token = self.advance();
        let kind = match token.kind {
            TokenKind::Ident(name) => ExprKind::Ident(name.to_string()),
            TokenKind::Keyword(Keyword::This) => ExprKind::This,
            TokenKind::Keyword(Keyword::Super) => ExprKind::Super,
            TokenKind::Keyword(Keyword::Null) => ExprKind::Null,
            TokenKind::Keyword(Keyword::True) => ExprKind::Bool(true),
            TokenKind::Keyword(Keyword::False) => ExprKind::Bool(false),
            TokenKind::Keyword(Keyword::Import) => {
                if self.eat_punct(".") {
                    self.expect_contextual("meta")?;
                    ExprKind::MetaProperty {
                        meta: "import".into(),
                        property: "meta".into(),
                    }
                } else {
                    ExprKind::Import(self.parse_arguments()?)
                }
            }
            TokenKind::Num(raw) => ExprKind::Num(raw.to_string()),
            TokenKind::Str(value) => ExprKind::Str(value),
            TokenKind::Regex { pattern, flags } => ExprKind::Regex {
                pattern: pattern.to_string(),
                flags: flags.to_string(),
            },
            TokenKind::Punct("(") => {
                let inner = self.with_in(|p| p.parse_expression())?;
                self.expect_punct(")")?;
                // the range widens to cover the parentheses
                return Ok(self.finish(start, inner.kind));
            }
            TokenKind::Punct("[") => {
                let items = self.with_in(|p| {
                    let mut items = Vec::new();
                    while !p.is_punct("]") {
                        if p.eat_punct(",") {
                            items.push(None);
                            continue;
                        }
                        items.push(Some(p.parse_spread_or_assignment()?));
                        if !p.eat_punct(",") {
                            break;
                        }
                    }
                    Ok(items)
                })?;
                self.expect_punct("]")?;
                ExprKind::Array(items)
            }
            TokenKind::Punct("{") => ExprKind::Object(self.with_in(|p| p.parse_object_rest())?),
            TokenKind::Punct("<") => return Err(error_at(&token.span, "JSX and type assertions are not supported")),
            other => {
                return Err(error_at(
                    &token.span,
                    format!("expected expression, found {}", describe(&other)),
                ))
            }
        };
        Ok(self.finish(start, kind))
    }

    /// Template literal from its head token. Untagged templates must cook.
    fn parse_template(&mut self, tagged: bool) -> Result<Template, ParseError> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut expect_head = true;
        loop {
            let token = self.advance();
            let TokenKind::Template {
                raw,
                cooked,
                head,
                tail,
            } = token.kind
            else {
                return Err(error_at(&token.span, "expected template continuation"));
            };
            if head != expect_head {
                return Err(error_at(&token.span, "unexpected template continuation"));
            }
            if cooked.is_none() && !tagged {
                return Err(error_at(&token.span, "malformed escape sequence in template"));
            }
            quasis.push(TemplateElement {
                raw: raw.to_string(),
                cooked,
            });
            if tail {
                break;
            }
            exprs.push(self.with_in(|p| p.parse_expression())?);
            expect_head = false;
        }
        Ok(Template { quasis, exprs })
    }

    /// Object literal members after the opening brace.
    fn parse_object_rest(&mut self) -> Result<Vec<Prop>, ParseError> {
        let mut props = Vec::new();
        while !self.is_punct("}") {
            let start = self.start();
            if self.eat_punct("...") {
                let arg = self.parse_assignment()?;
                props.push(Prop::Spread(self.finish(start, ExprKind::Spread(Box::new(arg)))));
            } else {
                props.push(self.parse_property()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(props)
    }

    fn parse_property(&mut self) -> Result<Prop, ParseError> {
        let prefixed = !matches!(self.peek_at(1).kind, TokenKind::Punct("," | ":" | "(" | "}" | "="));
        let (kind, is_async, is_generator) = if prefixed {
            self.parse_method_prefix()
        } else {
            (MethodKind::Method, false, false)
        };
        let key_start = self.start();
        let key = self.parse_prop_key()?;

        if self.is_punct("(") || kind != MethodKind::Method || is_async || is_generator {
            let (params, body) = self.parse_function_rest()?;
            return Ok(Prop::Method {
                key,
                kind,
                function: Function {
                    name: None,
                    is_async,
                    is_generator,
                    params,
                    body,
                },
            });
        }
        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            return Ok(Prop::KeyValue { key, value });
        }
        let PropKey::Ident(name) = key else {
            return Err(self.unexpected("`:`"));
        };
        if self.eat_punct("=") {
            // `{ a = 1 } = obj`: only meaningful as a destructuring target,
            // kept as the equivalent `a: a = 1`
            let target = self.finish(key_start, ExprKind::Ident(name.clone()));
            let default = self.parse_assignment()?;
            let value = self.finish(
                key_start,
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(target),
                    value: Box::new(default),
                },
            );
            return Ok(Prop::KeyValue {
                key: PropKey::Ident(name),
                value,
            });
        }
        Ok(Prop::Shorthand(name))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    fn peek_punct(&self) -> Option<&'static str> {
        match self.peek().kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset where the next token starts.
    fn start(&self) -> usize {
        self.peek().span.start.byte
    }

    /// Close a node that began at `start` with the last consumed token.
    fn finish(&self, start: usize, kind: ExprKind) -> Expr {
        let end = match self.pos.checked_sub(1) {
            Some(prev) => self.tokens[prev].span.end.byte,
            None => start,
        };
        Expr::new(kind, TextRange::new(start, end.max(start)))
    }

    fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn without_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, true);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn at_statement_end(&self) -> bool {
        self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before
    }

    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(";") || self.at_statement_end() {
            return Ok(());
        }
        Err(self.unexpected("`;`"))
    }

    fn is_punct(&self, p: &str) -> bool {
        self.is_punct_at(0, p)
    }

    fn is_punct_at(&self, n: usize, p: &str) -> bool {
        matches!(self.peek_at(n).kind, TokenKind::Punct(q) if q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", p)))
        }
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(k)
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(k) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", k.as_str())))
        }
    }

    /// `as`, `from`, `of`, `async`: identifiers with meaning in some
    /// positions only.
    fn is_contextual(&self, word: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Ident(s) if s == word)
    }

    fn eat_contextual(&mut self, word: &str) -> bool {
        if self.is_contextual(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_contextual(&mut self, word: &str) -> Result<(), ParseError> {
        if self.eat_contextual(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", word)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name.to_string())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    /// Property names after `.` may be reserved words or private names.
    fn member_property(&mut self) -> Result<String, ParseError> {
        if let TokenKind::PrivateName(name) = self.peek().kind {
            self.advance();
            return Ok(name.to_string());
        }
        self.property_name()
    }

    fn property_name(&mut self) -> Result<String, ParseError> {
        match self.peek().kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name.to_string())
            }
            TokenKind::Keyword(k) => {
                self.advance();
                Ok(k.as_str().to_string())
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn module_export_name(&mut self) -> Result<String, ParseError> {
        if matches!(self.peek().kind, TokenKind::Str(_)) {
            return self.expect_string();
        }
        self.property_name()
    }

    fn typescript(&self, what: &str) -> ParseError {
        error_at(
            &self.peek().span,
            format!("TypeScript {} are not supported", what),
        )
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if !token.newline_before {
            // `value as Type`, `value satisfies Type`
            if let TokenKind::Ident(word @ ("as" | "satisfies")) = token.kind {
                return self.typescript(&format!("`{}` expressions", word));
            }
            // `value!` directly after an operand
            let touches_previous = self
                .pos
                .checked_sub(1)
                .is_some_and(|prev| self.tokens[prev].span.end.byte == token.span.start.byte);
            if token.kind == TokenKind::Punct("!") && touches_previous {
                return self.typescript("non-null assertions");
            }
        }
        error_at(
            &token.span,
            format!("expected {}, found {}", expected, describe(&token.kind)),
        )
    }
}

fn error_at(span: &Span, message: impl Into<String>) -> ParseError {
    ParseError::new(message, span.start.line, span.start.col)
}

fn describe(kind: &TokenKind<'_>) -> String {
    match kind {
        TokenKind::Ident(name) => format!("identifier `{}`", name),
        TokenKind::PrivateName(name) => format!("private name `{}`", name),
        TokenKind::Keyword(k) => format!("`{}`", k.as_str()),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Num(raw) => format!("number `{}`", raw),
        TokenKind::Regex { .. } => "regular expression".to_string(),
        TokenKind::Template { .. } => "template literal".to_string(),
        TokenKind::Punct(p) => format!("`{}`", p),
        TokenKind::Eof => "end of input".to_string(),
    }
}

fn is_assign_target(expr: &Expr, op: AssignOp) -> bool {
    match expr.kind {
        ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => true,
        ExprKind::Array(_) | ExprKind::Object(_) => op == AssignOp::Assign,
        _ => false,
    }
}

/// Left side of `for (... in/of ...)`: one declarator without initializer,
/// or an assignment target.
fn is_iteration_target(left: &ForInit) -> bool {
    match left {
        ForInit::Var(decl) => decl.declarators.len() == 1 && decl.declarators[0].init.is_none(),
        ForInit::Expr(expr) => is_assign_target(expr, AssignOp::Assign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        match parse(source).unwrap().body.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn stmt(source: &str) -> Stmt {
        let mut body = parse(source).unwrap().body;
        assert_eq!(body.len(), 1, "{:?}", body);
        body.remove(0)
    }

    fn error(source: &str) -> ParseError {
        parse(source).unwrap_err()
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    #[test]
    fn test_member_chain() {
        assert_eq!(
            expr("store.state.items[2]"),
            Expr::index(
                Expr::member(Expr::member(Expr::ident("store"), "state"), "items"),
                Expr::num("2")
            )
        );
    }

    #[test]
    fn test_ranges_cover_source_text() {
        let source = "x = (a.b)[0] + f(1, 2)";
        let e = expr(source);
        assert_eq!(e.range, TextRange::new(0, source.len()));
        let ExprKind::Assign { value, .. } = e.kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { left, right, .. } = value.kind else {
            panic!("expected binary");
        };
        assert_eq!(&source[left.range.start..left.range.end], "(a.b)[0]");
        assert_eq!(&source[right.range.start..right.range.end], "f(1, 2)");
    }

    #[test]
    fn test_precedence_climbing() {
        let e = expr("a + b * c - d");
        let ExprKind::Binary { op, left, right } = e.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert_eq!(*right, Expr::ident("d"));
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));

        let e = expr("a ** b ** c");
        let ExprKind::Binary { right, .. } = e.kind else {
            panic!("expected binary");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn test_sequence_expression() {
        assert!(matches!(expr("a, b, c").kind, ExprKind::Sequence(ref items) if items.len() == 3));
        let e = expr("f((a, b))");
        let ExprKind::Call { args, .. } = e.kind else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(args[0].kind, ExprKind::Sequence(_)));
    }

    #[test]
    fn test_arrow_functions() {
        assert!(matches!(expr("x => x + 1").kind, ExprKind::Arrow { ref params, .. } if params.len() == 1));
        assert!(matches!(
            expr("({ a, b = 2 }, ...rest) => { return a }").kind,
            ExprKind::Arrow { body: ArrowBody::Block(_), ref params, .. } if params.len() == 2
        ));
        assert!(matches!(
            expr("async (a) => await a").kind,
            ExprKind::Arrow { is_async: true, body: ArrowBody::Expr(ref body), .. }
                if matches!(body.kind, ExprKind::Await(_))
        ));
        assert!(matches!(expr("async x => x").kind, ExprKind::Arrow { is_async: true, .. }));
        // a call to something named `async`
        assert!(matches!(expr("async(a)").kind, ExprKind::Call { .. }));
        // a parenthesized expression is not an arrow
        assert_eq!(expr("(a)"), Expr::ident("a"));
    }

    #[test]
    fn test_optional_chaining() {
        let e = expr("a?.b.c()");
        let ExprKind::Chain(inner) = e.kind else {
            panic!("expected chain");
        };
        let ExprKind::Call { callee, optional: false, .. } = inner.kind else {
            panic!("expected call");
        };
        let ExprKind::Member { object, property, optional: false } = callee.kind else {
            panic!("expected member");
        };
        assert_eq!(property, "c");
        assert!(matches!(object.kind, ExprKind::Member { optional: true, .. }));

        assert!(matches!(expr("f?.(x)").kind, ExprKind::Chain(ref c) if matches!(c.kind, ExprKind::Call { optional: true, .. })));
        assert!(matches!(expr("a?.[0]").kind, ExprKind::Chain(ref c) if matches!(c.kind, ExprKind::Index { optional: true, .. })));
        assert!(matches!(expr("c ? .5 : 1").kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn test_templates_and_regex() {
        let e = expr("`a${b}c${d + 1}`");
        let ExprKind::Template(template) = e.kind else {
            panic!("expected template");
        };
        assert_eq!(template.quasis.len(), 3);
        assert_eq!(template.exprs.len(), 2);

        assert!(matches!(expr("tag`x${y}`").kind, ExprKind::TaggedTemplate { .. }));
        assert!(matches!(expr("String.raw`\\unicode`").kind, ExprKind::TaggedTemplate { .. }));
        assert!(error("`\\unicode`").message.contains("malformed escape"));

        assert_eq!(
            expr("/ab+c/gi").kind,
            ExprKind::Regex {
                pattern: "ab+c".into(),
                flags: "gi".into()
            }
        );
    }

    #[test]
    fn test_array_holes_and_spread() {
        let ExprKind::Array(items) = expr("[a, , ...b]").kind else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert!(items[1].is_none());
        assert!(matches!(items[2].as_ref().map(|e| &e.kind), Some(ExprKind::Spread(_))));
    }

    #[test]
    fn test_object_literal_forms() {
        let ExprKind::Object(props) = expr("({ a: 1, b, 'c': 2, [k]: 3, m() { return 1 }, get g() { return 2 }, set g(v) {}, async *gen() {}, get: 4, ...rest })").kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 10);
        assert_eq!(props[1], Prop::Shorthand("b".into()));
        assert!(matches!(props[4], Prop::Method { kind: MethodKind::Method, .. }));
        assert!(matches!(props[5], Prop::Method { kind: MethodKind::Get, .. }));
        assert!(matches!(props[6], Prop::Method { kind: MethodKind::Set, .. }));
        assert!(matches!(
            props[7],
            Prop::Method { function: Function { is_async: true, is_generator: true, .. }, .. }
        ));
        assert!(matches!(props[8], Prop::KeyValue { key: PropKey::Ident(ref k), .. } if k == "get"));
        assert!(matches!(props[9], Prop::Spread(_)));
    }

    #[test]
    fn test_new_and_calls() {
        assert!(matches!(expr("new Map()").kind, ExprKind::New { ref args, .. } if args.is_empty()));
        assert!(matches!(expr("new a.B(1).c()").kind, ExprKind::Call { .. }));
        let Stmt::Function(f) = stmt("function F() { return new.target }") else {
            panic!("expected function");
        };
        assert!(matches!(
            f.body[0],
            Stmt::Return(Some(Expr { kind: ExprKind::MetaProperty { .. }, .. }))
        ));
        assert!(matches!(expr("import.meta.url").kind, ExprKind::Member { .. }));
        assert!(matches!(expr("import('./lazy.js')").kind, ExprKind::Import(ref args) if args.len() == 1));
        assert!(matches!(expr("super.method()").kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_destructuring_assignment() {
        assert!(matches!(expr("[a, b] = [b, a]").kind, ExprKind::Assign { .. }));
        assert!(matches!(expr("({ a, b: { c } } = obj)").kind, ExprKind::Assign { .. }));
        assert!(matches!(expr("({ a = 1 } = obj)").kind, ExprKind::Assign { .. }));
    }

    #[test]
    fn test_generators_and_await() {
        let Stmt::Function(f) = stmt("function* g() { yield; yield* other(); const x = yield 1 }") else {
            panic!("expected function");
        };
        assert!(f.is_generator);
        assert!(matches!(f.body[0], Stmt::Expr(Expr { kind: ExprKind::Yield { arg: None, .. }, .. })));
        assert!(matches!(f.body[1], Stmt::Expr(Expr { kind: ExprKind::Yield { delegate: true, .. }, .. })));

        let Stmt::Function(f) = stmt("async function load() { return await fetch(url) }") else {
            panic!("expected function");
        };
        assert!(f.is_async);
        // top-level await in a module
        assert!(matches!(expr("await ready").kind, ExprKind::Await(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = error("a + b = c");
        assert!(err.message.contains("invalid assignment target"));
        assert!(error("[a] += 1").message.contains("invalid assignment target"));
    }

    // ========================================================================
    // Statements
    // ========================================================================

    #[test]
    fn test_imports() {
        let program = parse(
            r#"
            import def, { get, set as write } from "@easm/core";
            import * as actions from '@easm/core/actions'
            import "./side-effect.css";
            "#,
        )
        .unwrap();
        assert_eq!(
            program.body,
            vec![
                Stmt::Import(ImportDecl {
                    specifiers: vec![
                        ImportSpecifier::Default("def".into()),
                        ImportSpecifier::Named {
                            imported: "get".into(),
                            local: "get".into()
                        },
                        ImportSpecifier::Named {
                            imported: "set".into(),
                            local: "write".into()
                        },
                    ],
                    source: "@easm/core".into(),
                }),
                Stmt::Import(ImportDecl {
                    specifiers: vec![ImportSpecifier::Namespace("actions".into())],
                    source: "@easm/core/actions".into(),
                }),
                Stmt::Import(ImportDecl {
                    specifiers: vec![],
                    source: "./side-effect.css".into(),
                }),
            ]
        );
    }

    #[test]
    fn test_export_forms() {
        let program = parse(
            "export const x = 1;\nexport default function App() {}\nexport { x as y } from './m'\n\
             export * from './all'\nexport * as ns from './ns'\nexport class C {}\nexport async function f() {}",
        )
        .unwrap();
        assert!(matches!(program.body[0], Stmt::Export(ExportDecl::Decl(_))));
        assert!(matches!(
            program.body[1],
            Stmt::Export(ExportDecl::Default(Expr { kind: ExprKind::Function(_), .. }))
        ));
        assert!(matches!(
            program.body[2],
            Stmt::Export(ExportDecl::Named { source: Some(_), .. })
        ));
        assert!(matches!(program.body[3], Stmt::Export(ExportDecl::All { exported: None, .. })));
        assert!(matches!(program.body[4], Stmt::Export(ExportDecl::All { exported: Some(_), .. })));
        assert!(matches!(program.body[5], Stmt::Export(ExportDecl::Decl(ref d)) if matches!(**d, Stmt::Class(_))));
        assert!(matches!(program.body[6], Stmt::Export(ExportDecl::Decl(ref d)) if matches!(**d, Stmt::Function(Function { is_async: true, .. }))));
    }

    #[test]
    fn test_asi_on_newlines() {
        let program = parse("const a = 1\nlet b = a\nb++\nreturn\nfoo()").unwrap();
        assert_eq!(program.body.len(), 5);
        assert_eq!(program.body[3], Stmt::Return(None));
    }

    #[test]
    fn test_missing_semicolon_on_same_line_fails() {
        let err = error("let a = 1 let b = 2");
        assert_eq!((err.line, err.column), (1, 11));
        assert!(err.message.contains("expected `;`"), "{}", err.message);
    }

    #[test]
    fn test_for_statements() {
        assert!(matches!(
            stmt("for (let i = 0, n = xs.length; i < n; i++) total += xs[i]"),
            Stmt::For { init: Some(ForInit::Var(_)), test: Some(_), update: Some(_), .. }
        ));
        assert!(matches!(stmt("for (;;) {}"), Stmt::For { init: None, test: None, update: None, .. }));
        assert!(matches!(stmt("for (const [k, v] of entries) {}"), Stmt::ForOf { is_await: false, .. }));
        assert!(matches!(stmt("for await (const chunk of stream) {}"), Stmt::ForOf { is_await: true, .. }));
        assert!(matches!(stmt("for (key in obj) {}"), Stmt::ForIn { left: ForInit::Expr(_), .. }));
        // `in` inside parentheses of a for-init is an operator again
        assert!(matches!(stmt("for (var x = ('a' in o); x;) {}"), Stmt::For { .. }));
        assert!(error("for (let a = 1 of xs) {}").message.contains("invalid left-hand side"));
    }

    #[test]
    fn test_loops_and_jumps() {
        let Stmt::Labeled { label, body } = stmt("outer: while (a) { do { if (b) continue outer; else break } while (c) }") else {
            panic!("expected labeled statement");
        };
        assert_eq!(label, "outer");
        assert!(matches!(*body, Stmt::While { .. }));
        assert!(matches!(stmt("debugger;"), Stmt::Debugger));
    }

    #[test]
    fn test_switch_statement() {
        let Stmt::Switch { cases, .. } = stmt("switch (x) { case 1: case 2: a(); break; default: b() }") else {
            panic!("expected switch");
        };
        assert_eq!(cases.len(), 3);
        assert!(cases[0].body.is_empty());
        assert_eq!(cases[1].body.len(), 2);
        assert!(cases[2].test.is_none());
    }

    #[test]
    fn test_try_statement() {
        assert!(matches!(
            stmt("try { a() } catch ({ message }) { log(message) } finally { done() }"),
            Stmt::Try { handler: Some(CatchClause { param: Some(Pattern::Object(_)), .. }), finalizer: Some(_), .. }
        ));
        assert!(matches!(
            stmt("try { a() } catch { }"),
            Stmt::Try { handler: Some(CatchClause { param: None, .. }), finalizer: None, .. }
        ));
        assert!(error("try {}").message.contains("`catch` or `finally`"));
    }

    #[test]
    fn test_class_declaration() {
        let Stmt::Class(class) = stmt(
            "class Counter extends Base { static count = 0; #value = 1; name\n\
             constructor() { super(); } get value() { return this.#value } static { Counter.count++ }\n\
             async *items() {} static create() { return new Counter() } }",
        ) else {
            panic!("expected class");
        };
        assert_eq!(class.name.as_deref(), Some("Counter"));
        assert!(class.super_class.is_some());
        assert_eq!(class.body.len(), 8);
        assert!(matches!(class.body[0], ClassMember::Field { is_static: true, .. }));
        assert!(matches!(class.body[1], ClassMember::Field { key: PropKey::Private(ref n), .. } if n == "#value"));
        assert!(matches!(class.body[2], ClassMember::Field { value: None, .. }));
        assert!(matches!(class.body[4], ClassMember::Method { kind: MethodKind::Get, .. }));
        assert!(matches!(class.body[5], ClassMember::StaticBlock(_)));
        assert!(matches!(class.body[7], ClassMember::Method { is_static: true, .. }));
    }

    #[test]
    fn test_with_is_rejected() {
        assert!(error("with (o) {}").message.contains("not allowed in modules"));
    }

    // ========================================================================
    // TypeScript
    // ========================================================================

    fn typescript_error(source: &str) -> ParseError {
        let err = error(source);
        assert!(err.message.contains("TypeScript"), "{}: {}", source, err.message);
        err
    }

    #[test]
    fn test_type_arguments_are_rejected() {
        let err = typescript_error("const store = new Store<IState>({});");
        assert_eq!((err.line, err.column), (1, 24));
        typescript_error("useStore<Map<string, number[]>>(x)");
        typescript_error("f<A | B>`tpl`");
        // plain comparisons still parse
        assert!(matches!(expr("a < b && c > (d)").kind, ExprKind::Binary { .. }));
        assert!(parse("for (let i = 0; i < n; i++) { if (i > (m)) break }").is_ok());
    }

    #[test]
    fn test_type_declarations_are_rejected() {
        typescript_error("interface State { count: number }");
        typescript_error("type Id = string;");
        typescript_error("export type { State } from './state';");
        typescript_error("export interface Props {}");
        typescript_error("declare const VERSION: string;");
        typescript_error("enum Color { Red }");
        typescript_error("abstract class Shape {}");
        typescript_error("import type { State } from './state';");
        // the same words as ordinary names
        assert!(parse("const type = 1; type = interface_ + 1; declare(type)").is_ok());
        assert!(parse("import type from './type.js'").is_ok());
    }

    #[test]
    fn test_annotations_are_rejected() {
        let err = typescript_error("const x: number = 1;");
        assert_eq!((err.line, err.column), (1, 8));
        typescript_error("function f(a: string, b?: number) {}");
        typescript_error("function f(): void {}");
        typescript_error("const f = (a: string) => a;");
        typescript_error("class A { count: number = 0 }");
        typescript_error("class A { private count = 0 }");
        typescript_error("class A { constructor(private store) {} }");
        typescript_error("class A<T> {}");
        typescript_error("class A implements B {}");
        typescript_error("function id<T>(x) { return x }");
        typescript_error("const s = value as string;");
        typescript_error("const n = maybe!.length;");
    }
}
