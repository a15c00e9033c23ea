//! Recursive-descent parser from tokens to [`Program`].
//!
//! The cursor only moves forward. Conditions are told apart with a
//! fixed-offset lookahead instead of backtracking, and the first
//! malformed construct aborts the whole parse.

use tracing::{debug, trace};

use crate::ast::{Block, CompareOp, Condition, Expr, Program, Stmt, Value};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};

/// Deepest allowed block nesting. Python's tokenizer refuses indentation
/// past 100 levels, so a deeper program could never run.
pub const MAX_NESTING: usize = 64;

pub fn parse(tokens: &[Token]) -> Result<Program, CoreError> {
    let mut cursor = Cursor {
        tokens,
        index: 0,
        depth: 0,
    };
    let mut program = Vec::new();
    while !cursor.at_end() {
        if let Some(stmt) = parse_statement(&mut cursor)? {
            program.push(stmt);
        }
    }
    debug!(statements = program.len(), "parsed program");
    Ok(program)
}

/// Position in the token sequence, threaded through every parse function.
struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize,
    /// Number of enclosing `{` blocks.
    depth: usize,
}

impl<'t> Cursor<'t> {
    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&'t TokenKind> {
        self.tokens.get(self.index + offset).map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), CoreError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.index += 1;
                Ok(())
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_ident(&mut self) -> Result<String, CoreError> {
        match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Ident(name)) => {
                self.index += 1;
                Ok(name.clone())
            }
            _ => Err(self.error("an identifier")),
        }
    }

    fn error(&self, expected: &str) -> CoreError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), |token| token.kind.describe());
        CoreError::Parse {
            index: self.index,
            expected: expected.to_string(),
            found,
        }
    }
}

/// Parses one statement. Newlines are consumed and yield `None`.
fn parse_statement(cursor: &mut Cursor<'_>) -> Result<Option<Stmt>, CoreError> {
    let Some(token) = cursor.peek() else {
        return Err(cursor.error("a statement"));
    };
    let stmt = match &token.kind {
        TokenKind::PrintLn => parse_output(cursor, true)?,
        TokenKind::Print => parse_output(cursor, false)?,
        TokenKind::Escape => parse_escape(cursor)?,
        TokenKind::Var => parse_variable(cursor)?,
        TokenKind::If => parse_if(cursor)?,
        TokenKind::Function => parse_function(cursor)?,
        TokenKind::Ident(_) => parse_call(cursor)?,
        TokenKind::Newline => {
            cursor.advance();
            return Ok(None);
        }
        _ => return Err(cursor.error("a statement")),
    };
    trace!(kind = stmt.kind_name(), next = cursor.index, "parsed statement");
    Ok(Some(stmt))
}

fn parse_output(cursor: &mut Cursor<'_>, newline: bool) -> Result<Stmt, CoreError> {
    cursor.advance();
    cursor.expect(&TokenKind::LParen, "`(`")?;
    let value = parse_expr(cursor)?;
    cursor.expect(&TokenKind::RParen, "`)`")?;
    Ok(Stmt::Output { value, newline })
}

fn parse_escape(cursor: &mut Cursor<'_>) -> Result<Stmt, CoreError> {
    cursor.advance();
    cursor.expect(&TokenKind::LParen, "`(`")?;
    let source = match cursor.peek().map(|token| &token.kind) {
        Some(TokenKind::Str(text)) => text.clone(),
        _ => return Err(cursor.error("a string literal")),
    };
    cursor.advance();
    cursor.expect(&TokenKind::RParen, "`)`")?;
    Ok(Stmt::Escape { source })
}

fn parse_variable(cursor: &mut Cursor<'_>) -> Result<Stmt, CoreError> {
    cursor.advance();
    let name = cursor.expect_ident()?;
    cursor.expect(&TokenKind::Assign, "`=`")?;
    let expr = parse_expr(cursor)?;
    Ok(Stmt::VariableDecl { name, expr })
}

fn parse_if(cursor: &mut Cursor<'_>) -> Result<Stmt, CoreError> {
    cursor.advance();
    let condition = parse_condition(cursor)?;
    let body = parse_braced_block(cursor)?;
    Ok(Stmt::If { condition, body })
}

fn parse_function(cursor: &mut Cursor<'_>) -> Result<Stmt, CoreError> {
    cursor.advance();
    let name = cursor.expect_ident()?;
    cursor.expect(&TokenKind::LParen, "`(`")?;
    cursor.expect(&TokenKind::RParen, "`)` (functions take no parameters)")?;
    let body = parse_braced_block(cursor)?;
    Ok(Stmt::FunctionDecl { name, body })
}

fn parse_call(cursor: &mut Cursor<'_>) -> Result<Stmt, CoreError> {
    let name = cursor.expect_ident()?;
    cursor.expect(&TokenKind::LParen, "`(` to call a function")?;
    cursor.expect(&TokenKind::RParen, "`)` (calls take no arguments)")?;
    Ok(Stmt::Call { name })
}

/// `value (.. value)*`, nested to the right once the chain is read.
fn parse_expr(cursor: &mut Cursor<'_>) -> Result<Expr, CoreError> {
    let first = parse_value(cursor)?;
    let mut rest = Vec::new();
    while cursor.peek_kind_at(0) == Some(&TokenKind::Concat) {
        cursor.advance();
        rest.push(parse_value(cursor)?);
    }
    Ok(Expr::chain(first, rest))
}

fn parse_value(cursor: &mut Cursor<'_>) -> Result<Value, CoreError> {
    let value = match cursor.peek().map(|token| &token.kind) {
        Some(TokenKind::Str(text)) => Value::Str(text.clone()),
        Some(TokenKind::Number(number)) => Value::Number(*number),
        Some(TokenKind::True) => Value::Bool(true),
        Some(TokenKind::False) => Value::Bool(false),
        Some(TokenKind::Ident(name)) => Value::Ident(name.clone()),
        _ => return Err(cursor.error("a value")),
    };
    cursor.advance();
    Ok(value)
}

/// `( value op value )` or `( bool-or-identifier )`.
fn parse_condition(cursor: &mut Cursor<'_>) -> Result<Condition, CoreError> {
    cursor.expect(&TokenKind::LParen, "`(`")?;

    let condition = if let Some(op) = cursor.peek_kind_at(1).and_then(compare_op) {
        let left = parse_value(cursor)?;
        cursor.advance();
        let right = parse_value(cursor)?;
        Condition::Compare { op, left, right }
    } else {
        let value = match cursor.peek().map(|token| &token.kind) {
            Some(TokenKind::True) => Value::Bool(true),
            Some(TokenKind::False) => Value::Bool(false),
            Some(TokenKind::Ident(name)) => Value::Ident(name.clone()),
            _ => return Err(cursor.error("a comparison, boolean or identifier condition")),
        };
        cursor.advance();
        Condition::Truthy(value)
    };

    cursor.expect(&TokenKind::RParen, "`)` to close the condition")?;
    Ok(condition)
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Equal => Some(CompareOp::Equal),
        TokenKind::NotEqual => Some(CompareOp::NotEqual),
        TokenKind::Greater => Some(CompareOp::Greater),
        TokenKind::Less => Some(CompareOp::Less),
        _ => None,
    }
}

fn parse_braced_block(cursor: &mut Cursor<'_>) -> Result<Block, CoreError> {
    if cursor.peek_kind_at(0) == Some(&TokenKind::LBrace) && cursor.depth == MAX_NESTING {
        return Err(cursor.error(&format!("at most {MAX_NESTING} nested blocks")));
    }
    cursor.expect(&TokenKind::LBrace, "`{`")?;
    cursor.depth += 1;
    let block = parse_block(cursor)?;
    cursor.depth -= 1;
    cursor.expect(&TokenKind::RBrace, "`}` to close the block")?;
    Ok(block)
}

/// Statements up to, not including, the `}` at this nesting level.
fn parse_block(cursor: &mut Cursor<'_>) -> Result<Block, CoreError> {
    let mut block = Vec::new();
    while let Some(token) = cursor.peek() {
        if token.kind == TokenKind::RBrace {
            break;
        }
        if let Some(stmt) = parse_statement(cursor)? {
            block.push(stmt);
        }
    }
    Ok(block)
}
