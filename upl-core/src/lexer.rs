//! Lexer for UPL source text.
//!
//! Token patterns are tried in a fixed order at every position and the
//! first one that matches wins, so longer or more specific patterns sit
//! ahead of the general ones (`!println` before `!print`, `==` before
//! `=`). Comments and horizontal whitespace are dropped; newlines are
//! kept because the parser uses them as statement separators.

use tracing::{debug, trace};

use crate::ast::Number;
use crate::error::CoreError;
use crate::span::{Span, line_column};

/// Kind of a token, together with its literal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    PrintLn,  // !println
    Print,    // !print
    Escape,   // !expyth
    Function, // function.create
    Var,
    If,
    True,
    False,

    // Identifiers and literals
    Ident(String),
    Number(Number),
    /// String literal text, surrounding quotes included.
    Str(String),

    // Operators and punctuation
    Concat,   // ..
    NotEqual, // !=
    Equal,    // ==
    Assign,   // =
    LParen,
    RParen,
    LBrace,
    RBrace,
    Greater,
    Less,
    Newline,
}

impl TokenKind {
    /// Short human-readable description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Number(Number::Integer(value)) => format!("number `{value}`"),
            TokenKind::Number(Number::Float(value)) => format!("number `{value:?}`"),
            TokenKind::Str(text) => format!("string {text}"),
            TokenKind::Newline => "newline".to_string(),
            other => format!("`{}`", other.fixed_text().unwrap_or("?")),
        }
    }

    /// The literal text of tokens that have only one spelling.
    pub fn fixed_text(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .chain(OPERATORS.iter())
            .find(|(_, kind)| kind == self)
            .map(|(text, _)| *text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Keywords in trial order. A keyword matches wherever its text starts,
/// so `varx` lexes as `var` followed by the identifier `x`.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("!println", TokenKind::PrintLn),
    ("!print", TokenKind::Print),
    ("!expyth", TokenKind::Escape),
    ("function.create", TokenKind::Function),
    ("var", TokenKind::Var),
    ("if", TokenKind::If),
    ("True", TokenKind::True),
    ("False", TokenKind::False),
];

/// Operators in trial order; two-character forms come first.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("..", TokenKind::Concat),
    ("!=", TokenKind::NotEqual),
    ("==", TokenKind::Equal),
    ("=", TokenKind::Assign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (">", TokenKind::Greater),
    ("<", TokenKind::Less),
];

/// Lex a whole source string into tokens.
///
/// Fails on the first character that no pattern accepts; nothing
/// after it is examined.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CoreError> {
    let tokens = Lexer {
        source,
        bytes: source.as_bytes(),
        index: 0,
    }
    .run()?;
    debug!(tokens = tokens.len(), bytes = source.len(), "lexed source");
    Ok(tokens)
}

struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let start = self.index;

            let kind = if let Some(kind) = self.lex_keyword() {
                kind
            } else if is_ident_start(ch) {
                self.lex_ident()
            } else if ch.is_ascii_digit() {
                self.lex_number()?
            } else if let Some(kind) = self.lex_string() {
                kind
            } else if let Some(kind) = self.lex_operator() {
                kind
            } else {
                match ch {
                    b'\n' => {
                        self.index += 1;
                        TokenKind::Newline
                    }
                    b'#' => {
                        self.skip_comment();
                        continue;
                    }
                    b' ' | b'\t' | b'\r' => {
                        self.skip_whitespace();
                        continue;
                    }
                    _ => return Err(self.unexpected_char(start)),
                }
            };

            let token = Token {
                kind,
                span: Span::new(start as u32, self.index as u32),
            };
            trace!(?token, "token");
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn rest(&self) -> &'src str {
        &self.source[self.index..]
    }

    fn lex_keyword(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        for (text, kind) in KEYWORDS {
            if !rest.starts_with(text) {
                continue;
            }
            self.index += text.len();
            return Some(kind.clone());
        }
        None
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.index;
        while self.peek_char().is_some_and(is_ident_continue) {
            self.index += 1;
        }
        TokenKind::Ident(self.source[start..self.index].to_string())
    }

    /// digits, then an optional `.` and more digits. A `.` that begins
    /// `..` is left for the concatenation operator.
    fn lex_number(&mut self) -> Result<TokenKind, CoreError> {
        let start = self.index;
        self.skip_digits();

        let mut is_float = false;
        if self.peek_char() == Some(b'.') && self.peek_next() != Some(b'.') {
            is_float = true;
            self.index += 1;
            self.skip_digits();
        }

        let text = &self.source[start..self.index];
        let number = if is_float {
            let value = text.parse::<f64>().map_err(|err| CoreError::InvalidLiteral {
                position: start,
                message: format!("invalid number `{text}`: {err}"),
            })?;
            if !value.is_finite() {
                return Err(CoreError::InvalidLiteral {
                    position: start,
                    message: format!("number `{text}` is out of range"),
                });
            }
            Number::Float(value)
        } else {
            text.parse::<i64>().map(Number::Integer).map_err(|err| {
                CoreError::InvalidLiteral {
                    position: start,
                    message: format!("invalid number `{text}`: {err}"),
                }
            })?
        };
        Ok(TokenKind::Number(number))
    }

    /// A double-quoted run with no escapes. An unterminated quote does
    /// not match, so it ends up reported as an unexpected character.
    fn lex_string(&mut self) -> Option<TokenKind> {
        if self.peek_char() != Some(b'"') {
            return None;
        }
        let close = self.rest()[1..].find('"')?;
        let end = self.index + close + 2;
        let text = self.source[self.index..end].to_string();
        self.index = end;
        Some(TokenKind::Str(text))
    }

    fn lex_operator(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        let (text, kind) = OPERATORS.iter().find(|(text, _)| rest.starts_with(text))?;
        self.index += text.len();
        Some(kind.clone())
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.index += 1;
        }
    }

    fn skip_comment(&mut self) {
        while self.peek_char().is_some_and(|ch| ch != b'\n') {
            self.index += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(b' ' | b'\t' | b'\r')) {
            self.index += 1;
        }
    }

    fn unexpected_char(&self, start: usize) -> CoreError {
        let found = self.source[start..].chars().next().unwrap_or('\0');
        let (line, column) = line_column(self.source, start);
        CoreError::Lex {
            found,
            position: start,
            line,
            column,
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
