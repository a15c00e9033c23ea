//! Python back end.
//!
//! Walks the tree and writes one Python line per statement, with four
//! spaces of indentation per block level. Every UPL name lives in the
//! module globals: function bodies declare the names they assign as
//! `global`, and escape fragments run against the module globals.
//!
//! User names share that namespace with Python's builtins, so the
//! generated code never looks a builtin up by its plain name. A prelude
//! binds the `builtins` module to a reserved name, and user names that
//! would collide with it or with a Python keyword are renamed.

use tracing::{debug, trace};

use crate::ast::{CompareOp, Condition, Expr, Number, Stmt, Value};
use crate::error::CoreError;

const INDENT: &str = "    ";

/// First line of every non-empty generated program.
pub const PRELUDE: &str = "import builtins as __upl_builtins";

/// Prefix reserved for names the generator introduces.
const RESERVED_PREFIX: &str = "__upl_";

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Generate the Python program for `program`.
pub fn generate(program: &[Stmt]) -> Result<String, CoreError> {
    let mut out = String::new();
    if !program.is_empty() {
        push_line(&mut out, 0, PRELUDE);
    }
    for stmt in program {
        emit_statement(stmt, 0, &mut out)?;
    }
    debug!(lines = out.lines().count(), "generated python");
    Ok(out)
}

fn emit_statement(stmt: &Stmt, depth: usize, out: &mut String) -> Result<(), CoreError> {
    trace!(kind = stmt.kind_name(), depth, "emit statement");
    match stmt {
        Stmt::Output { value, newline } => {
            let rendered = render_expr(value)?;
            if *newline {
                push_line(out, depth, &format!("__upl_builtins.print({rendered})"));
            } else {
                push_line(
                    out,
                    depth,
                    &format!("__upl_builtins.print({rendered}, end='')"),
                );
            }
        }
        Stmt::Escape { source } => {
            check_string_literal(source, "escape")?;
            push_line(
                out,
                depth,
                &format!("__upl_builtins.exec({source}, __upl_builtins.globals())"),
            );
        }
        Stmt::VariableDecl { name, expr } => {
            check_identifier(name, "variable declaration")?;
            let rendered = render_expr(expr)?;
            push_line(out, depth, &format!("{} = {rendered}", python_name(name)));
        }
        Stmt::If { condition, body } => {
            let rendered = render_condition(condition)?;
            push_line(out, depth, &format!("if {rendered}:"));
            emit_block(body, depth + 1, out)?;
        }
        Stmt::FunctionDecl { name, body } => {
            check_identifier(name, "function declaration")?;
            push_line(out, depth, &format!("def {}():", python_name(name)));
            let globals: Vec<String> = assigned_names(body).into_iter().map(python_name).collect();
            if !globals.is_empty() {
                push_line(out, depth + 1, &format!("global {}", globals.join(", ")));
            }
            emit_block(body, depth + 1, out)?;
        }
        Stmt::Call { name } => {
            check_identifier(name, "call")?;
            push_line(out, depth, &format!("{}()", python_name(name)));
        }
    }
    Ok(())
}

fn emit_block(block: &[Stmt], depth: usize, out: &mut String) -> Result<(), CoreError> {
    if block.is_empty() {
        push_line(out, depth, "pass");
        return Ok(());
    }
    for stmt in block {
        emit_statement(stmt, depth, out)?;
    }
    Ok(())
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}

/// The Python spelling of a UPL name. Keywords and names in the reserved
/// prefix get a prefix of their own; everything else is unchanged.
fn python_name(name: &str) -> String {
    if PYTHON_KEYWORDS.contains(&name) {
        format!("{RESERVED_PREFIX}kw_{name}")
    } else if name.starts_with(RESERVED_PREFIX) {
        format!("{RESERVED_PREFIX}user_{name}")
    } else {
        name.to_string()
    }
}

/// Names a function body binds, in first-occurrence order. Nested `if`
/// bodies are searched; nested function bodies have their own list.
fn assigned_names(body: &[Stmt]) -> Vec<&str> {
    fn collect<'a>(block: &'a [Stmt], names: &mut Vec<&'a str>) {
        for stmt in block {
            match stmt {
                Stmt::VariableDecl { name, .. } | Stmt::FunctionDecl { name, .. } => {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
                Stmt::If { body, .. } => collect(body, names),
                _ => {}
            }
        }
    }

    let mut names = Vec::new();
    collect(body, &mut names);
    names
}

/// A concatenation becomes one `%` format with a `%s` per operand, which
/// converts each operand the way `str` does without naming it.
fn render_expr(expr: &Expr) -> Result<String, CoreError> {
    match expr {
        Expr::Value(value) => render_value(value),
        Expr::Concat { .. } => {
            let operands = expr
                .operands()
                .into_iter()
                .map(render_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!(
                "\"{}\" % ({})",
                "%s".repeat(operands.len()),
                operands.join(", ")
            ))
        }
    }
}

fn render_value(value: &Value) -> Result<String, CoreError> {
    match value {
        Value::Str(text) => {
            check_string_literal(text, "string literal")?;
            Ok(text.clone())
        }
        Value::Number(Number::Integer(value)) => Ok(value.to_string()),
        Value::Number(Number::Float(value)) => {
            if !value.is_finite() {
                return Err(CoreError::Generation {
                    node: "number",
                    message: format!("{value} has no literal form"),
                });
            }
            Ok(format!("{value:?}"))
        }
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Ident(name) => {
            check_identifier(name, "identifier")?;
            Ok(python_name(name))
        }
    }
}

fn render_condition(condition: &Condition) -> Result<String, CoreError> {
    match condition {
        Condition::Truthy(value) => render_value(value),
        Condition::Compare { op, left, right } => {
            let op = match op {
                CompareOp::Equal => "==",
                CompareOp::NotEqual => "!=",
                CompareOp::Greater => ">",
                CompareOp::Less => "<",
            };
            Ok(format!("{} {op} {}", render_value(left)?, render_value(right)?))
        }
    }
}

fn check_identifier(name: &str, node: &'static str) -> Result<(), CoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::Generation {
            node,
            message: format!("{name:?} is not an identifier"),
        })
    }
}

fn check_string_literal(text: &str, node: &'static str) -> Result<(), CoreError> {
    let valid = text.len() >= 2
        && text.starts_with('"')
        && text.ends_with('"')
        && !text[1..text.len() - 1].contains('"');
    if valid {
        Ok(())
    } else {
        Err(CoreError::Generation {
            node,
            message: format!("{text:?} is not a double-quoted literal"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile(source: &str) -> String {
        let tokens = tokenize(source).expect("tokenize");
        let program = parse(&tokens).expect("parse");
        generate(&program).expect("generate")
    }

    #[test]
    fn empty_program_generates_nothing() {
        assert_eq!(compile(""), "");
    }

    /// `compile(source)` with the prelude line stripped.
    fn body(source: &str) -> String {
        let code = compile(source);
        let rest = code.strip_prefix(PRELUDE).expect("prelude");
        rest.strip_prefix('\n').expect("prelude line").to_string()
    }

    #[test]
    fn non_empty_program_starts_with_the_prelude() {
        assert_eq!(
            compile("f()"),
            "import builtins as __upl_builtins\nf()\n"
        );
    }

    #[test]
    fn generates_output_statements() {
        assert_eq!(
            body("!println(\"hi\")\n!print(\"no newline\")"),
            "__upl_builtins.print(\"hi\")\n__upl_builtins.print(\"no newline\", end='')\n"
        );
    }

    #[test]
    fn renders_literals() {
        assert_eq!(
            body("var a = 5\nvar b = 2.5\nvar c = True\nvar d = False\nvar e = a\nvar f = 3."),
            "a = 5\nb = 2.5\nc = True\nd = False\ne = a\nf = 3.0\n"
        );
    }

    #[test]
    fn concatenation_formats_every_operand() {
        assert_eq!(
            body("!println(\"a\" .. 1 .. x)"),
            "__upl_builtins.print(\"%s%s%s\" % (\"a\", 1, x))\n"
        );
    }

    #[test]
    fn concatenation_does_not_name_shadowable_builtins() {
        let code = body("var str = \"s\"\nvar globals = 1\n!println(str .. \"!\")\n!expyth(\"y = 2\")");
        assert_eq!(
            code,
            "str = \"s\"\nglobals = 1\n__upl_builtins.print(\"%s%s\" % (str, \"!\"))\n__upl_builtins.exec(\"y = 2\", __upl_builtins.globals())\n"
        );
    }

    #[test]
    fn python_keywords_and_reserved_names_are_renamed() {
        assert_eq!(
            body("var class = 1\nvar __upl_builtins = 2\n!println(class .. __upl_builtins)\nfunction.create def() { var pass = 3 }\ndef()"),
            "__upl_kw_class = 1\n__upl_user___upl_builtins = 2\n__upl_builtins.print(\"%s%s\" % (__upl_kw_class, __upl_user___upl_builtins))\ndef __upl_kw_def():\n    global __upl_kw_pass\n    __upl_kw_pass = 3\n__upl_kw_def()\n"
        );
    }

    #[test]
    fn long_concatenation_renders_without_recursing() {
        let mut source = String::from("!println(x");
        for _ in 0..100_000 {
            source.push_str(" .. x");
        }
        source.push(')');
        let code = body(&source);
        assert!(code.starts_with("__upl_builtins.print(\"%s%s"));
        assert_eq!(code.matches(", x").count(), 100_000);
    }

    #[test]
    fn escape_passes_literal_through() {
        assert_eq!(
            body("!expyth(\"x = 1+1\")"),
            "__upl_builtins.exec(\"x = 1+1\", __upl_builtins.globals())\n"
        );
    }

    #[test]
    fn if_blocks_indent_by_depth() {
        let source = "if (1 == 1) {\n  if (x) {\n    !println(\"deep\")\n  }\n  !println(\"shallow\")\n}\n!println(\"top\")";
        assert_eq!(
            body(source),
            "if 1 == 1:\n    if x:\n        __upl_builtins.print(\"deep\")\n    __upl_builtins.print(\"shallow\")\n__upl_builtins.print(\"top\")\n"
        );
    }

    #[test]
    fn renders_every_comparison_operator() {
        assert_eq!(
            body("if (a != b) { }\nif (a > 1) { }\nif (a < \"z\") { }"),
            "if a != b:\n    pass\nif a > 1:\n    pass\nif a < \"z\":\n    pass\n"
        );
    }

    #[test]
    fn functions_declare_assigned_names_global() {
        let source = "function.create f() {\n  var x = 1\n  if (x == 1) { var y = 2\n var x = 3 }\n  function.create g() { var z = 1 }\n  !println(x)\n}\nf()";
        assert_eq!(
            body(source),
            "def f():\n    global x, y, g\n    x = 1\n    if x == 1:\n        y = 2\n        x = 3\n    def g():\n        global z\n        z = 1\n    __upl_builtins.print(x)\nf()\n"
        );
    }

    #[test]
    fn function_without_assignments_has_no_global_line() {
        assert_eq!(
            body("function.create f() { !println(\"called\") }\nf()"),
            "def f():\n    __upl_builtins.print(\"called\")\nf()\n"
        );
    }

    #[test]
    fn empty_function_body_is_pass() {
        assert_eq!(body("function.create f() {}"), "def f():\n    pass\n");
    }

    #[test]
    fn generation_is_deterministic() {
        let source = "var x = \"5\"\nif (x) { !print(x .. \"!\") }\n";
        assert_eq!(compile(source), compile(source));
    }

    #[test]
    fn rejects_malformed_identifier() {
        let program = vec![Stmt::Call {
            name: "not a name".to_string(),
        }];
        let err = generate(&program).unwrap_err();
        assert!(matches!(err, CoreError::Generation { node: "call", .. }));
    }

    #[test]
    fn rejects_unquoted_string_value() {
        let program = vec![Stmt::Output {
            value: Expr::Value(Value::Str("bare".to_string())),
            newline: true,
        }];
        assert!(generate(&program).unwrap_err().is_generation());
    }

    #[test]
    fn rejects_escape_with_inner_quote() {
        let program = vec![Stmt::Escape {
            source: "\"a\" + \"b\"".to_string(),
        }];
        let err = generate(&program).unwrap_err();
        assert!(matches!(err, CoreError::Generation { node: "escape", .. }));
    }

    #[test]
    fn rejects_non_finite_float() {
        let program = vec![Stmt::VariableDecl {
            name: "x".to_string(),
            expr: Expr::Value(Value::Number(Number::Float(f64::NAN))),
        }];
        assert!(generate(&program).unwrap_err().is_generation());
    }
}
