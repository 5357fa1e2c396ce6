//! Runtime values produced by evaluation. The main enum, [`Value`], covers
//! every result an expression can have: integers, booleans, the unit value
//! `()`, pairs (and the proper lists built out of them), built-in and
//! user-defined procedures, and the internal "quiet" marker used for
//! statements that produce no printable value. Display logic matches the
//! canonical S-expression renderings, including the dotted-pair versus list
//! forms.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::Expr;
use crate::evaluator::Environment;

/// Type alias for number values in the interpreter.
pub type Number = i64;

/// Signature shared by every built-in procedure: a function over the
/// already-evaluated argument values.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// A user-defined procedure: parameter list, body, the environment captured
/// when the defining `lambda` expression was evaluated, and the self-name
/// injected by `(define (f ...) ...)` sugar to allow recursion.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Expr>,
    pub env: Environment,
    pub name: Option<String>,
}

/// The result of every evaluation.
#[derive(Clone)]
pub enum Value {
    /// Signed machine-word integers.
    Int(Number),
    /// `#t` / `#f`.
    Bool(bool),
    /// The empty list `()`.
    Unit,
    /// A cons cell. Both halves are shared so list tails alias freely.
    Pair(Rc<Value>, Rc<Value>),
    /// A built-in procedure, materialized on demand from the builtin table.
    Builtin { name: &'static str, func: BuiltinFn },
    /// A user-defined procedure together with its captured environment.
    Closure(Rc<Closure>),
    /// Marker for results that should not normally be printed. `define`
    /// carries the bound name as its message; `display`, `newline` and a
    /// `cond` with no matching clause carry none.
    Quiet(Option<String>),
}

impl Value {
    /// Everything but `#f` counts as true in conditionals.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// A value is a proper list iff it is `()` or a pair whose second
    /// element is a proper list.
    pub fn is_list(&self) -> bool {
        let mut node = self;
        loop {
            match node {
                Value::Unit => return true,
                Value::Pair(_, rest) => node = rest,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => f.write_str(if *b { "#t" } else { "#f" }),
            Value::Unit => f.write_str("()"),
            Value::Pair(first, second) => write_pair(f, first, second, true),
            Value::Builtin { name, .. } => write!(f, "#<Builtin>: {name}"),
            Value::Closure(closure) => {
                write!(f, "#<Lambda>: [{}] ( ", closure.name.as_deref().unwrap_or(""))?;
                for param in &closure.params {
                    write!(f, "{param} ")?;
                }
                f.write_str(") ")
            }
            Value::Quiet(message) => f.write_str(message.as_deref().unwrap_or("")),
        }
    }
}

/// Pairs print as `(A . B)` unless the tail is a proper list, in which case
/// the whole spine prints in list form. The outermost call always emits the
/// surrounding parentheses; inner recursions along a list spine suppress
/// them so nested elements keep their boundaries without extra parens.
fn write_pair(
    f: &mut fmt::Formatter<'_>,
    first: &Value,
    second: &Value,
    outer: bool,
) -> fmt::Result {
    let list_tail = second.is_list();
    if !list_tail || outer {
        f.write_str("(")?;
    }
    match first {
        Value::Pair(a, b) => write_pair(f, a, b, true)?,
        other => write!(f, "{other}")?,
    }
    if !matches!(second, Value::Unit) {
        f.write_str(if list_tail { " " } else { " . " })?;
        match second {
            Value::Pair(a, b) => write_pair(f, a, b, false)?,
            other => write!(f, "{other}")?,
        }
    }
    if !list_tail || outer {
        f.write_str(")")?;
    }
    Ok(())
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Unit => write!(f, "Unit"),
            Value::Pair(first, second) => write!(f, "Pair({first:?}, {second:?})"),
            Value::Builtin { name, .. } => write!(f, "Builtin({name})"),
            Value::Closure(closure) => {
                write!(
                    f,
                    "Closure(params={:?}, name={:?})",
                    closure.params, closure.name
                )
            }
            Value::Quiet(message) => write!(f, "Quiet({message:?})"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            (Value::Pair(a1, b1), Value::Pair(a2, b2)) => a1 == a2 && b1 == b2,
            // Builtins are compared by name, closures by identity.
            (Value::Builtin { name: a, .. }, Value::Builtin { name: b, .. }) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Quiet(a), Value::Quiet(b)) => a == b,
            _ => false,
        }
    }
}
