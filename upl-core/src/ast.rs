//! Syntax tree produced by the parser.
//!
//! Every node is owned by the sequence or node that contains it; the
//! tree has no back-references.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// A single primary: a literal or an identifier reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String literal text with its surrounding quotes.
    Str(String),
    Number(Number),
    Bool(bool),
    Ident(String),
}

/// A value, or `left .. right` with chains nesting to the right.
///
/// Chains can be as long as the source allows, so `Clone`, `PartialEq`,
/// `Debug` and `Drop` walk them in a loop rather than recursing.
pub enum Expr {
    Value(Value),
    Concat { left: Value, right: Box<Expr> },
}

impl Expr {
    /// Builds `first .. rest[0] .. rest[1] ..`, nested to the right.
    pub fn chain(first: Value, mut rest: Vec<Value>) -> Expr {
        let Some(last) = rest.pop() else {
            return Expr::Value(first);
        };
        let mut tail = Expr::Value(last);
        while let Some(left) = rest.pop() {
            tail = Expr::Concat {
                left,
                right: Box::new(tail),
            };
        }
        Expr::Concat {
            left: first,
            right: Box::new(tail),
        }
    }

    /// Operands in source order. A bare value has exactly one.
    pub fn operands(&self) -> Vec<&Value> {
        let mut operands = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expr::Value(value) => {
                    operands.push(value);
                    return operands;
                }
                Expr::Concat { left, right } => {
                    operands.push(left);
                    current = &**right;
                }
            }
        }
    }
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        match self {
            Expr::Value(value) => Expr::Value(value.clone()),
            Expr::Concat { left, .. } => {
                let rest = self.operands().into_iter().skip(1).cloned().collect();
                Expr::chain(left.clone(), rest)
            }
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.operands() == other.operands()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Expr::Concat { .. } => f.debug_tuple("Concat").field(&self.operands()).finish(),
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let Expr::Concat { right, .. } = self else {
            return;
        };
        let mut next = std::mem::replace(&mut **right, Expr::Value(Value::Bool(false)));
        while let Expr::Concat { right, .. } = &mut next {
            let following = std::mem::replace(&mut **right, Expr::Value(Value::Bool(false)));
            next = following;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Decided by the runtime truthiness of the value.
    Truthy(Value),
    Compare {
        op: CompareOp,
        left: Value,
        right: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Output { value: Expr, newline: bool },
    VariableDecl { name: String, expr: Expr },
    If { condition: Condition, body: Block },
    FunctionDecl { name: String, body: Block },
    Call { name: String },
    /// Host source text executed verbatim when the program runs.
    Escape { source: String },
}

pub type Block = Vec<Stmt>;

/// Top-level statements in source order.
pub type Program = Vec<Stmt>;

impl Stmt {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Output { .. } => "output",
            Stmt::VariableDecl { .. } => "variable declaration",
            Stmt::If { .. } => "if",
            Stmt::FunctionDecl { .. } => "function declaration",
            Stmt::Call { .. } => "call",
            Stmt::Escape { .. } => "escape",
        }
    }
}
