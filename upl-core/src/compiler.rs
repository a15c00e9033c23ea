use tracing::info;

use crate::ast::Program;
use crate::codegen::generate;
use crate::error::CoreError;
use crate::lexer::tokenize;
use crate::parser::parse;

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    pub token_count: usize,
    pub program: Program,
    /// Generated Python source.
    pub code: String,
}

/// Runs lexer, parser and code generator in order. Each stage finishes
/// before the next one starts and the first error ends the compilation.
pub fn compile(source: &str) -> Result<CompilationArtifact, CoreError> {
    let tokens = tokenize(source)?;
    let program = parse(&tokens)?;
    let code = generate(&program)?;
    info!(
        tokens = tokens.len(),
        statements = program.len(),
        "compiled source"
    );
    Ok(CompilationArtifact {
        token_count: tokens.len(),
        program,
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt, Value};

    #[test]
    fn compiles_hello_world() {
        let artifact = compile("!println(\"hi\")").expect("compile");
        assert_eq!(artifact.token_count, 4);
        assert_eq!(
            artifact.program,
            vec![Stmt::Output {
                value: Expr::Value(Value::Str("\"hi\"".to_string())),
                newline: true,
            }]
        );
        assert_eq!(
            artifact.code,
            "import builtins as __upl_builtins\n__upl_builtins.print(\"hi\")\n"
        );
    }

    #[test]
    fn same_source_gives_identical_code() {
        let source = "var x = \"5\"\n!println(x)\nfunction.create f() { !println(\"called\") }\nf()\n";
        let first = compile(source).expect("compile");
        let second = compile(source).expect("compile");
        assert_eq!(first.code, second.code);
    }

    #[test]
    fn lex_error_stops_before_parsing() {
        // `if (` alone would be a parse error; the lexer must fail first.
        let err = compile("if (\n@").unwrap_err();
        assert!(matches!(err, CoreError::Lex { found: '@', position: 5, .. }));
    }

    #[test]
    fn parse_error_produces_no_code() {
        let err = compile("!println(\"ok\")\nif (1 == 1)").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn undefined_call_still_compiles() {
        let artifact = compile("missing()").expect("compile");
        assert_eq!(artifact.code, "import builtins as __upl_builtins\nmissing()\n");
    }

    #[test]
    fn long_chain_compiles_and_drops_cleanly() {
        let mut source = String::from("var s = \"a\"");
        source.push_str(&" .. \"a\"".repeat(100_000));
        let artifact = compile(&source).expect("compile");
        assert_eq!(artifact.program.len(), 1);
        assert!(artifact.code.contains("s = \"%s%s"));
    }

    #[test]
    fn float_overflow_is_a_lex_error_not_a_generation_error() {
        let source = format!("!println({}.0)", "9".repeat(400));
        let err = compile(&source).unwrap_err();
        assert!(err.is_lex());
    }
}
