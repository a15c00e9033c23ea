use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("lex error at byte {position} (line {line}, column {column}): unexpected character {found:?}")]
    Lex {
        found: char,
        position: usize,
        line: usize,
        column: usize,
    },
    #[error("lex error at byte {position}: {message}")]
    InvalidLiteral { position: usize, message: String },
    #[error("parse error at token {index}: expected {expected}, found {found}")]
    Parse {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("generation error in {node}: {message}")]
    Generation { node: &'static str, message: String },
}

impl CoreError {
    pub fn is_lex(&self) -> bool {
        matches!(self, CoreError::Lex { .. } | CoreError::InvalidLiteral { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, CoreError::Parse { .. })
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, CoreError::Generation { .. })
    }
}
