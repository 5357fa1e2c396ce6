//! lilt - a tree-walking interpreter for a minimal Scheme-like Lisp dialect.
//!
//! The crate implements the full pipeline from character input to a printed
//! value:
//!
//! ```scheme
//! (define (fact n)
//!   (if (= n 0) 1 (* n (fact (- n 1)))))
//! (fact 6)                ; 720
//! (cons 1 (list 2 3))     ; (1 2 3)
//! ```
//!
//! Input flows through a resettable, depth-tracking tokenizer (which is what
//! lets the REPL accumulate multi-line expressions), a recursive-descent
//! parser that dispatches on special-form keywords, and an AST evaluator with
//! lexical closures over a three-layer environment: a local frame, a shared
//! mutable top-level, and an immutable built-in table.
//!
//! ## Modules
//!
//! - `lexer`: character stream to tokens, with multi-line accumulation
//! - `parser`: tokens to AST, including special-form syntax checking
//! - `ast`: the expression tree produced by the parser
//! - `value`: runtime values (integers, booleans, pairs, procedures)
//! - `evaluator`: the environment model and the evaluation function
//! - `builtins`: the built-in procedure table

/// Maximum nesting depth the parser accepts, keeping pathological inputs
/// from overflowing the parse stack.
pub const MAX_PARSE_DEPTH: usize = 512;

/// Maximum evaluation recursion depth. Generous enough for realistic
/// programs while keeping runaway recursion from overflowing the host stack.
pub const MAX_EVAL_DEPTH: usize = 2048;

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod value;

/// Every recoverable fault the interpreter can report. The driver renders
/// these with an `error:` prefix and keeps running; only invocation problems
/// (bad arguments, unreadable files) terminate the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Lexical fault, e.g. a `)` with no matching `(`.
    #[error("tokenizer: {0}")]
    Lex(String),
    /// Structural fault detected while parsing the token stream.
    #[error("parser: {0}")]
    Parse(String),
    /// A special form used with the wrong shape, named after the form.
    #[error("{form}: {message}")]
    Form {
        form: &'static str,
        message: &'static str,
    },
    /// Name lookup failure during evaluation.
    #[error("unbound variable: {0}")]
    Unbound(String),
    /// A built-in procedure rejected its arguments.
    #[error("procedure `{name}`: {message}")]
    Builtin { name: &'static str, message: String },
    /// Any other evaluation fault (division by zero, overflow, calling a
    /// non-callable, recursion depth exhaustion).
    #[error("runtime: {0}")]
    Runtime(String),
}

impl Error {
    /// Arity failure for a built-in that takes an exact argument count.
    pub(crate) fn exact_arity(name: &'static str, expected: usize, got: usize) -> Self {
        Error::Builtin {
            name,
            message: format!("expected exactly {expected} args, got {got}"),
        }
    }

    /// Arity failure for a built-in with a minimum argument count.
    pub(crate) fn min_arity(name: &'static str, expected: usize, got: usize) -> Self {
        Error::Builtin {
            name,
            message: format!("expected at least {expected} args, got {got}"),
        }
    }
}
