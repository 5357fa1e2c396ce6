//! The expression tree produced by the parser: one variant per syntactic
//! construct. The `Display` impl renders the debug form of each node, which
//! is not normally user-visible but is handy in tests and when poking at the
//! parser.

use std::fmt;
use std::rc::Rc;

use crate::value::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(Number),
    Bool(bool),
    Unit,
    /// Reference to a binding, resolved against the environment at
    /// evaluation time.
    Var(String),
    /// Top-level `define`; evaluating installs the value in the top-level
    /// layer and yields a quiet value carrying the name.
    Bind { name: String, value: Box<Expr> },
    /// `let` and `let*`; the flag selects sequential scoping. The body is
    /// always a `Seq`.
    Let {
        bindings: Vec<(String, Expr)>,
        body: Box<Expr>,
        sequential: bool,
    },
    /// `begin`: value of the last expression.
    Seq(Vec<Expr>),
    /// `cond`, with `if` lowered onto it. The vectors run in parallel.
    Cond {
        predicates: Vec<Expr>,
        branches: Vec<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// `cons`, and the spine of `list` after the parser folds it.
    Cons(Box<Expr>, Box<Expr>),
    /// `lambda`; the self-name comes from `(define (f ...) ...)` sugar. The
    /// body is shared with the closures created from this node.
    Lambda {
        params: Vec<String>,
        body: Rc<Expr>,
        name: Option<String>,
    },
    /// Procedure application: head evaluated first, then each argument in
    /// order.
    Call { head: Box<Expr>, args: Vec<Expr> },
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Bool(b) => f.write_str(if *b { "#t" } else { "#f" }),
            Expr::Unit => f.write_str("()"),
            Expr::Var(name) => write!(f, "#<Var> {name}"),
            Expr::Bind { name, value } => write!(f, "#<Bind> ({name}, {value})"),
            Expr::Let {
                bindings,
                sequential,
                ..
            } => {
                write!(f, "#<Let{}> (", if *sequential { "*" } else { "" })?;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({name}, {value})")?;
                }
                f.write_str(")")
            }
            Expr::Seq(exprs) => {
                f.write_str("#<Seq>[ ")?;
                write_joined(f, exprs)?;
                f.write_str(" ]")
            }
            Expr::Cond {
                predicates,
                branches,
            } => {
                f.write_str("#<Cond>")?;
                for (i, (pred, branch)) in predicates.iter().zip(branches).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({pred}, {branch})")?;
                }
                Ok(())
            }
            Expr::And(exprs) => {
                f.write_str("#<And>[ ")?;
                write_joined(f, exprs)?;
                f.write_str(" ]")
            }
            Expr::Or(exprs) => {
                f.write_str("#<Or>[ ")?;
                write_joined(f, exprs)?;
                f.write_str(" ]")
            }
            Expr::Cons(first, second) => write!(f, "({first} . {second})"),
            Expr::Lambda { params, name, .. } => {
                write!(f, "#<Lambda>: [{}] ( ", name.as_deref().unwrap_or(""))?;
                for param in params {
                    write!(f, "{param} ")?;
                }
                f.write_str(") ")
            }
            Expr::Call { head, args } => {
                write!(f, "#<Proc>[ {head}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                f.write_str(" ]")
            }
        }
    }
}
