//! Tokenizer for ECMAScript module source.
//!
//! Two places need context the token stream alone cannot give. A `/` is
//! read as a regular expression when the previous token cannot end an
//! expression. A `}` closes a template substitution when the innermost open
//! brace is the `${` of a template.

use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub byte: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Import,
    Export,
    Default,
    Const,
    Let,
    Var,
    Function,
    Class,
    Extends,
    Super,
    Return,
    Throw,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Debugger,
    With,
    New,
    True,
    False,
    Null,
    This,
    Typeof,
    Void,
    Delete,
    Instanceof,
    In,
    Await,
    Yield,
    Enum,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Default => "default",
            Keyword::Const => "const",
            Keyword::Let => "let",
            Keyword::Var => "var",
            Keyword::Function => "function",
            Keyword::Class => "class",
            Keyword::Extends => "extends",
            Keyword::Super => "super",
            Keyword::Return => "return",
            Keyword::Throw => "throw",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Finally => "finally",
            Keyword::Debugger => "debugger",
            Keyword::With => "with",
            Keyword::New => "new",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::This => "this",
            Keyword::Typeof => "typeof",
            Keyword::Void => "void",
            Keyword::Delete => "delete",
            Keyword::Instanceof => "instanceof",
            Keyword::In => "in",
            Keyword::Await => "await",
            Keyword::Yield => "yield",
            Keyword::Enum => "enum",
        }
    }

    /// Keywords after which an expression may end, so a following `/`
    /// divides.
    fn ends_expression(self) -> bool {
        matches!(
            self,
            Keyword::This | Keyword::Super | Keyword::Null | Keyword::True | Keyword::False
        )
    }
}

fn keyword_from(text: &str) -> Option<Keyword> {
    Some(match text {
        "import" => Keyword::Import,
        "export" => Keyword::Export,
        "default" => Keyword::Default,
        "const" => Keyword::Const,
        "let" => Keyword::Let,
        "var" => Keyword::Var,
        "function" => Keyword::Function,
        "class" => Keyword::Class,
        "extends" => Keyword::Extends,
        "super" => Keyword::Super,
        "return" => Keyword::Return,
        "throw" => Keyword::Throw,
        "if" => Keyword::If,
        "else" => Keyword::Else,
        "for" => Keyword::For,
        "while" => Keyword::While,
        "do" => Keyword::Do,
        "switch" => Keyword::Switch,
        "case" => Keyword::Case,
        "break" => Keyword::Break,
        "continue" => Keyword::Continue,
        "try" => Keyword::Try,
        "catch" => Keyword::Catch,
        "finally" => Keyword::Finally,
        "debugger" => Keyword::Debugger,
        "with" => Keyword::With,
        "new" => Keyword::New,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "null" => Keyword::Null,
        "this" => Keyword::This,
        "typeof" => Keyword::Typeof,
        "void" => Keyword::Void,
        "delete" => Keyword::Delete,
        "instanceof" => Keyword::Instanceof,
        "in" => Keyword::In,
        "await" => Keyword::Await,
        "yield" => Keyword::Yield,
        "enum" => Keyword::Enum,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    Ident(&'a str),
    /// `#name`, hash included.
    PrivateName(&'a str),
    Keyword(Keyword),
    /// Unescaped string literal contents.
    Str(String),
    /// Numeric or BigInt literal as written.
    Num(&'a str),
    Regex {
        pattern: &'a str,
        flags: &'a str,
    },
    /// Literal text of a template. `head` when it opens at a backtick,
    /// `tail` when it closes at one; a template without substitutions is
    /// a single token that is both.
    Template {
        raw: &'a str,
        cooked: Option<String>,
        head: bool,
        tail: bool,
    },
    Punct(&'static str),
    Eof,
}

impl TokenKind<'_> {
    /// Whether a `/` after this token starts a regular expression.
    fn allows_regex(&self) -> bool {
        match self {
            TokenKind::Ident(_)
            | TokenKind::PrivateName(_)
            | TokenKind::Str(_)
            | TokenKind::Num(_)
            | TokenKind::Regex { .. } => false,
            TokenKind::Template { tail, .. } => !tail,
            TokenKind::Keyword(k) => !k.ends_expression(),
            TokenKind::Punct(p) => !matches!(*p, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Eof => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

// Longest first so that prefixes never shadow longer operators.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".",
];

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
    line: usize,
    col: usize,
    newline_before: bool,
    regex_allowed: bool,
    /// One entry per open brace; `true` for a template `${`.
    braces: Vec<bool>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            idx: 0,
            line: 1,
            col: 1,
            newline_before: false,
            regex_allowed: true,
            braces: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, ParseError> {
        self.skip_hashbang();
        let mut out = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            self.regex_allowed = token.kind.allows_regex();
            out.push(token);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    fn skip_hashbang(&mut self) {
        if self.input.starts_with("#!") {
            while self.peek_char().is_some_and(|c| c != '\n') {
                self.advance_char();
            }
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        self.newline_before = false;
        self.skip_trivia()?;
        let start = self.position();
        let Some(c) = self.peek_char() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        if c == '"' || c == '\'' {
            return self.lex_string(start, c);
        }
        if c == '`' {
            self.advance_char();
            return self.lex_template(start, true);
        }
        if c == '}' && self.braces.last() == Some(&true) {
            self.braces.pop();
            self.advance_char();
            return self.lex_template(start, false);
        }
        if c.is_ascii_digit()
            || (c == '.' && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit()))
        {
            return Ok(self.lex_number(start));
        }
        if is_ident_start(c) {
            return Ok(self.lex_identifier(start));
        }
        if c == '#' && self.input[self.idx + 1..].chars().next().is_some_and(is_ident_start) {
            self.advance_char();
            while self.peek_char().is_some_and(is_ident_continue) {
                self.advance_char();
            }
            let name = &self.input[start.byte..self.idx];
            return Ok(self.token(TokenKind::PrivateName(name), start));
        }
        if c == '/' && self.regex_allowed {
            return self.lex_regex(start);
        }

        let rest = &self.input[self.idx..];
        if let Some(&punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            // `a?.5:b` is a conditional, not an optional chain
            let punct = if punct == "?." && self.peek_byte_at(2).is_some_and(|b| b.is_ascii_digit()) {
                "?"
            } else {
                punct
            };
            for _ in 0..punct.len() {
                self.advance_char();
            }
            match punct {
                "{" => self.braces.push(false),
                "}" => {
                    self.braces.pop();
                }
                _ => {}
            }
            return Ok(self.token(TokenKind::Punct(punct), start));
        }

        Err(self.error(format!("unexpected character {:?}", c), start))
    }

    fn token(&self, kind: TokenKind<'a>, start: Position) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position()),
            newline_before: self.newline_before,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek_char() {
            match c {
                '\n' | '\u{2028}' | '\u{2029}' => {
                    self.newline_before = true;
                    self.advance_char();
                }
                c if c.is_whitespace() || c == '\u{feff}' => self.advance_char(),
                '/' if self.peek_byte_at(1) == Some(b'/') => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.advance_char();
                    }
                }
                '/' if self.peek_byte_at(1) == Some(b'*') => {
                    let start = self.position();
                    self.advance_char();
                    self.advance_char();
                    loop {
                        match self.peek_char() {
                            None => return Err(self.error("unterminated comment", start)),
                            Some('*') if self.peek_byte_at(1) == Some(b'/') => {
                                self.advance_char();
                                self.advance_char();
                                break;
                            }
                            Some('\n') => {
                                self.newline_before = true;
                                self.advance_char();
                            }
                            Some(_) => self.advance_char(),
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_string(&mut self, start: Position, quote: char) -> Result<Token<'a>, ParseError> {
        self.advance_char();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.error("unterminated string literal", start)),
                Some(c) if c == quote => {
                    self.advance_char();
                    return Ok(self.token(TokenKind::Str(value), start));
                }
                Some('\\') => {
                    self.advance_char();
                    self.lex_escape(&mut value, start)?;
                }
                Some(c) => {
                    value.push(c);
                    self.advance_char();
                }
            }
        }
    }

    fn lex_escape(&mut self, out: &mut String, start: Position) -> Result<(), ParseError> {
        let Some(c) = self.peek_char() else {
            return Err(self.error("unterminated string literal", start));
        };
        self.advance_char();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            '1'..='9' | '0' => return Err(self.error("octal escape sequences are not allowed", start)),
            // line continuations
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.advance_char();
                }
            }
            'x' => {
                let code = self.lex_hex_digits(2, start)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = if self.peek_char() == Some('{') {
                    self.advance_char();
                    let begin = self.idx;
                    while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.advance_char();
                    }
                    let digits = &self.input[begin..self.idx];
                    if self.peek_char() != Some('}') {
                        return Err(self.error("malformed unicode escape", start));
                    }
                    self.advance_char();
                    u32::from_str_radix(digits, 16)
                        .map_err(|_| self.error("malformed unicode escape", start))?
                } else {
                    self.lex_hex_digits(4, start)?
                };
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_hex_digits(&mut self, count: usize, start: Position) -> Result<u32, ParseError> {
        let begin = self.idx;
        for _ in 0..count {
            if !self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error("malformed escape sequence", start));
            }
            self.advance_char();
        }
        u32::from_str_radix(&self.input[begin..self.idx], 16)
            .map_err(|_| self.error("malformed escape sequence", start))
    }

    /// Template text after its opening backtick or `}`, up to and including
    /// the closing backtick or `${`.
    fn lex_template(&mut self, start: Position, head: bool) -> Result<Token<'a>, ParseError> {
        let content_start = self.idx;
        let mut cooked = Some(String::new());
        loop {
            match self.peek_char() {
                None => return Err(self.error("unterminated template literal", start)),
                Some('`') => {
                    let raw = &self.input[content_start..self.idx];
                    self.advance_char();
                    let kind = TokenKind::Template {
                        raw,
                        cooked,
                        head,
                        tail: true,
                    };
                    return Ok(self.token(kind, start));
                }
                Some('$') if self.peek_byte_at(1) == Some(b'{') => {
                    let raw = &self.input[content_start..self.idx];
                    self.advance_char();
                    self.advance_char();
                    self.braces.push(true);
                    let kind = TokenKind::Template {
                        raw,
                        cooked,
                        head,
                        tail: false,
                    };
                    return Ok(self.token(kind, start));
                }
                Some('\\') => {
                    self.advance_char();
                    let mut escaped = String::new();
                    match self.lex_escape(&mut escaped, start) {
                        Ok(()) => {
                            if let Some(text) = cooked.as_mut() {
                                text.push_str(&escaped);
                            }
                        }
                        // tagged templates may carry malformed escapes
                        Err(_) => cooked = None,
                    }
                }
                Some('\r') => {
                    self.advance_char();
                    if self.peek_char() == Some('\n') {
                        self.advance_char();
                    }
                    if let Some(text) = cooked.as_mut() {
                        text.push('\n');
                    }
                }
                Some(c) => {
                    if let Some(text) = cooked.as_mut() {
                        text.push(c);
                    }
                    self.advance_char();
                }
            }
        }
    }

    fn lex_regex(&mut self, start: Position) -> Result<Token<'a>, ParseError> {
        self.advance_char();
        let body_start = self.idx;
        let mut in_class = false;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(self.error("unterminated regular expression", start))
                }
                Some('\\') => {
                    self.advance_char();
                    if matches!(self.peek_char(), None | Some('\n')) {
                        return Err(self.error("unterminated regular expression", start));
                    }
                    self.advance_char();
                }
                Some('[') => {
                    in_class = true;
                    self.advance_char();
                }
                Some(']') => {
                    in_class = false;
                    self.advance_char();
                }
                Some('/') if !in_class => break,
                Some(_) => self.advance_char(),
            }
        }
        let pattern = &self.input[body_start..self.idx];
        self.advance_char();
        let flags_start = self.idx;
        while self.peek_char().is_some_and(is_ident_continue) {
            self.advance_char();
        }
        let flags = &self.input[flags_start..self.idx];
        Ok(self.token(TokenKind::Regex { pattern, flags }, start))
    }

    fn lex_number(&mut self, start: Position) -> Token<'a> {
        let start_idx = self.idx;
        let is_digit = |c: char| c.is_ascii_digit() || c == '_';
        let radix_prefixed = self.peek_char() == Some('0')
            && matches!(
                self.peek_byte_at(1),
                Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
            );
        if radix_prefixed {
            self.advance_char();
            self.advance_char();
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.advance_char();
            }
        } else {
            while self.peek_char().is_some_and(is_digit) {
                self.advance_char();
            }
            if self.peek_char() == Some('.') {
                self.advance_char();
                while self.peek_char().is_some_and(is_digit) {
                    self.advance_char();
                }
            }
            if matches!(self.peek_char(), Some('e') | Some('E')) {
                self.advance_char();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance_char();
                }
                while self.peek_char().is_some_and(is_digit) {
                    self.advance_char();
                }
            }
        }
        // BigInt suffix
        if self.peek_char() == Some('n') {
            self.advance_char();
        }
        self.token(TokenKind::Num(&self.input[start_idx..self.idx]), start)
    }

    fn lex_identifier(&mut self, start: Position) -> Token<'a> {
        let start_idx = self.idx;
        self.advance_char();
        while self.peek_char().is_some_and(is_ident_continue) {
            self.advance_char();
        }
        let text = &self.input[start_idx..self.idx];
        let kind = match keyword_from(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(text),
        };
        self.token(kind, start)
    }

    fn advance_char(&mut self) {
        let Some(c) = self.peek_char() else {
            return;
        };
        self.idx += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
            byte: self.idx,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.idx..].chars().next()
    }

    fn peek_byte_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.idx + n).copied()
    }

    fn error(&self, message: impl Into<String>, at: Position) -> ParseError {
        ParseError::new(message, at.line, at.col)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '\u{200c}' || c == '\u{200d}'
}

pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn template<'a>(raw: &'a str, cooked: Option<&str>, head: bool, tail: bool) -> TokenKind<'a> {
        TokenKind::Template {
            raw,
            cooked: cooked.map(str::to_string),
            head,
            tail,
        }
    }

    #[test]
    fn test_tokenize_member_call() {
        assert_eq!(
            kinds("get(store.state.items[2])"),
            vec![
                TokenKind::Ident("get"),
                TokenKind::Punct("("),
                TokenKind::Ident("store"),
                TokenKind::Punct("."),
                TokenKind::Ident("state"),
                TokenKind::Punct("."),
                TokenKind::Ident("items"),
                TokenKind::Punct("["),
                TokenKind::Num("2"),
                TokenKind::Punct("]"),
                TokenKind::Punct(")"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            kinds("a === b >>>= c => ...d"),
            vec![
                TokenKind::Ident("a"),
                TokenKind::Punct("==="),
                TokenKind::Ident("b"),
                TokenKind::Punct(">>>="),
                TokenKind::Ident("c"),
                TokenKind::Punct("=>"),
                TokenKind::Punct("..."),
                TokenKind::Ident("d"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_optional_chain_versus_conditional() {
        assert_eq!(
            kinds("a?.b ?? c?.5:d"),
            vec![
                TokenKind::Ident("a"),
                TokenKind::Punct("?."),
                TokenKind::Ident("b"),
                TokenKind::Punct("??"),
                TokenKind::Ident("c"),
                TokenKind::Punct("?"),
                TokenKind::Num(".5"),
                TokenKind::Punct(":"),
                TokenKind::Ident("d"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nA\u{1F600}\x41""#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\nA\u{1F600}A".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0 1.5 .5 1e3 0xff 0b101 1_000 10n 1.5.x"),
            vec![
                TokenKind::Num("0"),
                TokenKind::Num("1.5"),
                TokenKind::Num(".5"),
                TokenKind::Num("1e3"),
                TokenKind::Num("0xff"),
                TokenKind::Num("0b101"),
                TokenKind::Num("1_000"),
                TokenKind::Num("10n"),
                TokenKind::Num("1.5"),
                TokenKind::Punct("."),
                TokenKind::Ident("x"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_regex_or_division_by_previous_token() {
        assert_eq!(
            kinds("x = /a[/]b\\/c/gi.test(y) / 2"),
            vec![
                TokenKind::Ident("x"),
                TokenKind::Punct("="),
                TokenKind::Regex {
                    pattern: "a[/]b\\/c",
                    flags: "gi"
                },
                TokenKind::Punct("."),
                TokenKind::Ident("test"),
                TokenKind::Punct("("),
                TokenKind::Ident("y"),
                TokenKind::Punct(")"),
                TokenKind::Punct("/"),
                TokenKind::Num("2"),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("return /x/"),
            vec![
                TokenKind::Keyword(Keyword::Return),
                TokenKind::Regex {
                    pattern: "x",
                    flags: ""
                },
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("a / b / c").iter().filter(|k| **k == TokenKind::Punct("/")).count(), 2);
    }

    #[test]
    fn test_template_substitutions() {
        assert_eq!(
            kinds("`a${ {b: 1}.b }c${d}\\n`"),
            vec![
                template("a", Some("a"), true, false),
                TokenKind::Punct("{"),
                TokenKind::Ident("b"),
                TokenKind::Punct(":"),
                TokenKind::Num("1"),
                TokenKind::Punct("}"),
                TokenKind::Punct("."),
                TokenKind::Ident("b"),
                template("c", Some("c"), false, false),
                TokenKind::Ident("d"),
                template("\\n", Some("\n"), false, true),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_template_with_malformed_escape_has_no_cooked_text() {
        assert_eq!(
            kinds(r"`\unicode`"),
            vec![template(r"\unicode", None, true, true), TokenKind::Eof]
        );
    }

    #[test]
    fn test_private_names_and_hashbang() {
        assert_eq!(
            kinds("#!/usr/bin/env node\nthis.#count"),
            vec![
                TokenKind::Keyword(Keyword::This),
                TokenKind::Punct("."),
                TokenKind::PrivateName("#count"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = tokenize("a // note\n/* multi\nline */ b c").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("a"));
        assert!(!tokens[0].newline_before);
        assert_eq!(tokens[1].kind, TokenKind::Ident("b"));
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].span.start.line, 3);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("import x from"),
            vec![
                TokenKind::Keyword(Keyword::Import),
                TokenKind::Ident("x"),
                TokenKind::Ident("from"),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("for await of"),
            vec![
                TokenKind::Keyword(Keyword::For),
                TokenKind::Keyword(Keyword::Await),
                TokenKind::Ident("of"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        let err = tokenize("a\n  \"open").unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));

        let err = tokenize("`x ${y}").unwrap_err();
        assert!(err.message.contains("unterminated template"));

        let err = tokenize("x = /open\n").unwrap_err();
        assert!(err.message.contains("unterminated regular expression"));

        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.column, 3);
    }
}
