//! Core compiler pipeline for the UPL scripting language.
//!
//! The pipeline is strictly sequential:
//!
//!   source .upl
//!     -> lexer    (tokens)
//!     -> parser   (statement tree)
//!     -> codegen  (Python source text)
//!
//! Reading files and running the generated program belong to the
//! caller (see the `upl-cli` crate).

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod error;
pub mod span;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod ast;
pub mod lexer;
pub mod parser;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen::generate;
pub use compiler::{CompilationArtifact, compile};
pub use error::CoreError;
pub use lexer::tokenize;
pub use parser::parse as parse_tokens;
