//! Syntax tree for ECMAScript modules.
//!
//! Expressions remember the byte range they were parsed from so a rewrite
//! can be spliced into the original text. Equality ignores those ranges:
//! two trees compare equal when they have the same shape.

/// Byte offsets `start..end` into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Nodes built by hand rather than parsed have an empty range.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A parsed compilation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Import(ImportDecl),
    Export(ExportDecl),
    Var(VarDecl),
    Function(Function),
    Class(Class),
    Return(Option<Expr>),
    Throw(Expr),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        is_await: bool,
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Debugger,
    Block(Vec<Stmt>),
    Expr(Expr),
    Empty,
}

/// First clause of a `for` head: a declaration or an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// `import ... from "source";`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import local from ...`
    Default(String),
    /// `import * as local from ...`
    Namespace(String),
    /// `import { imported as local } from ...`
    Named { imported: String, local: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export const ...`, `export function ...`, `export class ...`
    Decl(Box<Stmt>),
    /// `export default <expr>`
    Default(Expr),
    /// `export { local as exported } [from "source"]`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export * [as exported] from "source"`
    All {
        exported: Option<String>,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

/// Binding targets in declarations and parameter lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object(Vec<PatternProp>),
    Array(Vec<Option<Pattern>>),
    /// `target = default`
    Default(Box<Pattern>, Box<Expr>),
    /// `...target`
    Rest(Box<Pattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternProp {
    /// `key: value`, or `key` / `key = default` when `shorthand`.
    KeyValue {
        key: PropKey,
        value: Pattern,
        shorthand: bool,
    },
    Rest(Pattern),
}

/// A function declaration, expression or method body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Function {
    pub name: Option<String>,
    pub is_async: bool,
    pub is_generator: bool,
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<String>,
    pub super_class: Option<Box<Expr>>,
    pub body: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Method {
        key: PropKey,
        kind: MethodKind,
        is_static: bool,
        function: Function,
    },
    Field {
        key: PropKey,
        is_static: bool,
        value: Option<Expr>,
    },
    /// `static { ... }`
    StaticBlock(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(String),
    Computed(Box<Expr>),
    /// `#name`, hash included.
    Private(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    KeyValue {
        key: PropKey,
        value: Expr,
    },
    Shorthand(String),
    Method {
        key: PropKey,
        kind: MethodKind,
        function: Function,
    },
    Spread(Expr),
}

/// One literal chunk of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Text as written between the delimiters.
    pub raw: String,
    /// Text with escapes processed; `None` when an escape is malformed,
    /// which only tagged templates allow.
    pub cooked: Option<String>,
}

/// `` `a${x}b` ``: one more quasi than expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub quasis: Vec<TemplateElement>,
    pub exprs: Vec<Expr>,
}

impl Template {
    /// The cooked text of a template without substitutions.
    pub fn as_plain(&self) -> Option<&str> {
        match self.quasis.as_slice() {
            [only] if self.exprs.is_empty() => only.cooked.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    /// Word operators need a space before their operand.
    pub fn is_word(self) -> bool {
        matches!(self, UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Nullish,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Instanceof,
    In,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Nullish => "??",
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Instanceof => "instanceof",
            BinaryOp::In => "in",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
        }
    }

    pub fn from_punct(p: &str) -> Option<Self> {
        Some(match p {
            "??" => BinaryOp::Nullish,
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&" => BinaryOp::BitAnd,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::LtEq,
            ">=" => BinaryOp::GtEq,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "**" => BinaryOp::Exp,
            _ => return None,
        })
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Nullish | BinaryOp::Or => prec::LOGICAL_OR,
            BinaryOp::And => prec::LOGICAL_AND,
            BinaryOp::BitOr => prec::BIT_OR,
            BinaryOp::BitXor => prec::BIT_XOR,
            BinaryOp::BitAnd => prec::BIT_AND,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                prec::EQUALITY
            }
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::LtEq
            | BinaryOp::GtEq
            | BinaryOp::Instanceof
            | BinaryOp::In => prec::RELATIONAL,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => prec::SHIFT,
            BinaryOp::Add | BinaryOp::Sub => prec::ADDITIVE,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => prec::MULTIPLICATIVE,
            BinaryOp::Exp => prec::EXPONENT,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinaryOp::Exp
    }
}

/// Expression binding powers shared by the parser and the printer.
pub mod prec {
    pub const COMMA: u8 = 1;
    pub const ASSIGN: u8 = 2;
    pub const CONDITIONAL: u8 = 3;
    pub const LOGICAL_OR: u8 = 4;
    pub const LOGICAL_AND: u8 = 5;
    pub const BIT_OR: u8 = 6;
    pub const BIT_XOR: u8 = 7;
    pub const BIT_AND: u8 = 8;
    pub const EQUALITY: u8 = 9;
    pub const RELATIONAL: u8 = 10;
    pub const SHIFT: u8 = 11;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 13;
    pub const EXPONENT: u8 = 14;
    pub const PREFIX: u8 = 15;
    pub const POSTFIX: u8 = 16;
    pub const CALL: u8 = 18;
    pub const PRIMARY: u8 = 20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Nullish,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Exp => "**=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::UShr => ">>>=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::And => "&&=",
            AssignOp::Or => "||=",
            AssignOp::Nullish => "??=",
        }
    }

    pub fn from_punct(p: &str) -> Option<Self> {
        Some(match p {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Rem,
            "**=" => AssignOp::Exp,
            "<<=" => AssignOp::Shl,
            ">>=" => AssignOp::Shr,
            ">>>=" => AssignOp::UShr,
            "&=" => AssignOp::BitAnd,
            "|=" => AssignOp::BitOr,
            "^=" => AssignOp::BitXor,
            "&&=" => AssignOp::And,
            "||=" => AssignOp::Or,
            "??=" => AssignOp::Nullish,
            _ => return None,
        })
    }
}

/// An expression and where it came from.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Source text of the node, parentheses included. Empty for nodes
    /// built by hand.
    pub range: TextRange,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Self {
            kind,
            range: TextRange::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    This,
    Super,
    Null,
    Bool(bool),
    /// Numeric or BigInt literal as written.
    Num(String),
    /// String literal, unescaped.
    Str(String),
    Regex {
        pattern: String,
        flags: String,
    },
    Template(Template),
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Template,
    },
    /// Array literal; `None` marks a hole.
    Array(Vec<Option<Expr>>),
    Object(Vec<Prop>),
    Function(Box<Function>),
    Class(Box<Class>),
    Arrow {
        is_async: bool,
        params: Vec<Pattern>,
        body: ArrowBody,
    },
    /// `object.property`, or `object?.property` inside a chain. Private
    /// names keep their hash.
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    /// Outermost node of an optional chain such as `a?.b.c()`.
    Chain(Box<Expr>),
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `new.target`, `import.meta`
    MetaProperty {
        meta: String,
        property: String,
    },
    /// `import(source)`
    Import(Vec<Expr>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    /// `++x`, `x--`
    Update {
        increment: bool,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `a, b`
    Sequence(Vec<Expr>),
    /// `...arg` inside array literals and argument lists.
    Spread(Box<Expr>),
    Yield {
        delegate: bool,
        arg: Option<Box<Expr>>,
    },
    Await(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, range: TextRange) -> Self {
        Self { kind, range }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        ExprKind::Ident(name.into()).into()
    }

    pub fn num(raw: impl Into<String>) -> Self {
        ExprKind::Num(raw.into()).into()
    }

    pub fn str(value: impl Into<String>) -> Self {
        ExprKind::Str(value.into()).into()
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        ExprKind::Member {
            object: Box::new(object),
            property: property.into(),
            optional: false,
        }
        .into()
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        ExprKind::Index {
            object: Box::new(object),
            index: Box::new(index),
            optional: false,
        }
        .into()
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        ExprKind::Call {
            callee: Box::new(callee),
            args,
            optional: false,
        }
        .into()
    }

    /// Binding power of the expression's outermost operator.
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Sequence(_) => prec::COMMA,
            ExprKind::Arrow { .. }
            | ExprKind::Assign { .. }
            | ExprKind::Spread(_)
            | ExprKind::Yield { .. } => prec::ASSIGN,
            ExprKind::Conditional { .. } => prec::CONDITIONAL,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Unary { .. } | ExprKind::Await(_) => prec::PREFIX,
            ExprKind::Update { prefix: true, .. } => prec::PREFIX,
            ExprKind::Update { prefix: false, .. } => prec::POSTFIX,
            ExprKind::Member { .. }
            | ExprKind::Index { .. }
            | ExprKind::Call { .. }
            | ExprKind::Chain(_)
            | ExprKind::New { .. }
            | ExprKind::TaggedTemplate { .. }
            | ExprKind::MetaProperty { .. }
            | ExprKind::Import(_) => prec::CALL,
            _ => prec::PRIMARY,
        }
    }
}
