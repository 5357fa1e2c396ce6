//! The environment model and the evaluation function.
//!
//! An [`Environment`] is a three-layer lookup: a local frame owned by the
//! scope, the shared mutable top-level written by `define`, and the
//! immutable built-in table. Child scopes are made by cloning the parent
//! (copying only the local frame); this is what gives closures their
//! capture-at-evaluation-time behavior. The top-level map itself is owned by
//! the [`Interpreter`] driver and held weakly by every environment, so
//! recursive top-level closures never form strong reference cycles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::ast::Expr;
use crate::builtins;
use crate::lexer::{Progress, Tokenizer};
use crate::parser;
use crate::value::{Closure, Value};
use crate::{Error, MAX_EVAL_DEPTH};

type Bindings = HashMap<String, Value>;

/// Environment for variable bindings.
#[derive(Clone, Default)]
pub struct Environment {
    local: Bindings,
    top: Weak<RefCell<Bindings>>,
}

impl Environment {
    /// Search local frame, then top-level, then built-ins; first hit wins,
    /// so built-ins are shadowable by defines and locals.
    pub fn find(&self, name: &str) -> Result<Value, Error> {
        if let Some(value) = self.local.get(name) {
            return Ok(value.clone());
        }
        if let Some(top) = self.top.upgrade()
            && let Some(value) = top.borrow().get(name)
        {
            return Ok(value.clone());
        }
        if let Some(builtin) = builtins::find(name) {
            return Ok(builtin);
        }
        Err(Error::Unbound(name.to_string()))
    }

    pub(crate) fn bind_local(&mut self, name: String, value: Value) {
        self.local.insert(name, value);
    }

    /// Write into the shared top-level layer, overwriting (and thereby
    /// releasing) any prior binding.
    pub(crate) fn bind_top(&self, name: String, value: Value) -> Result<(), Error> {
        let top = self
            .top
            .upgrade()
            .ok_or_else(|| Error::Runtime("top-level environment is gone".to_string()))?;
        top.borrow_mut().insert(name, value);
        Ok(())
    }
}

/// Owns the top-level binding table and hands out environments that share
/// it. One interpreter backs a whole REPL session or batch run.
pub struct Interpreter {
    top: Rc<RefCell<Bindings>>,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            top: Rc::new(RefCell::new(Bindings::new())),
        }
    }

    /// A fresh environment with an empty local frame over this
    /// interpreter's top-level and the built-in table.
    pub fn global_env(&self) -> Environment {
        Environment {
            local: Bindings::new(),
            top: Rc::downgrade(&self.top),
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, Error> {
        eval(expr, &self.global_env())
    }

    /// Batch entry point: tokenize a whole file or stdin capture, wrap the
    /// top-level forms in an implicit `begin`, and evaluate.
    pub fn eval_source(&self, source: &str) -> Result<Value, Error> {
        let mut tokenizer = Tokenizer::new();
        if tokenizer.feed(source)? == Progress::Incomplete {
            return Err(Error::Parse(
                "input does not form a valid expression".to_string(),
            ));
        }
        let program = parser::parse_program(tokenizer.tokens())?;
        self.eval(&program)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate an expression against an environment.
pub fn eval(expr: &Expr, env: &Environment) -> Result<Value, Error> {
    eval_at(expr, env, 0)
}

fn eval_at(expr: &Expr, env: &Environment, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::Runtime(format!(
            "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Unit => Ok(Value::Unit),

        Expr::Var(name) => env.find(name),

        Expr::Seq(exprs) => match exprs.split_last() {
            None => Ok(Value::Quiet(None)),
            Some((last, init)) => {
                for expr in init {
                    eval_at(expr, env, depth + 1)?;
                }
                // The final expression's value flows out unmodified.
                eval_at(last, env, depth + 1)
            }
        },

        Expr::Bind { name, value } => {
            let value = eval_at(value, env, depth + 1)?;
            env.bind_top(name.clone(), value)?;
            Ok(Value::Quiet(Some(name.clone())))
        }

        Expr::Let {
            bindings,
            body,
            sequential,
        } => {
            let mut scope = env.clone();
            for (name, expr) in bindings {
                // `let` evaluates every binding in the outer environment;
                // `let*` lets later bindings see earlier ones.
                let value = if *sequential {
                    eval_at(expr, &scope, depth + 1)?
                } else {
                    eval_at(expr, env, depth + 1)?
                };
                scope.bind_local(name.clone(), value);
            }
            eval_at(body, &scope, depth + 1)
        }

        Expr::Cond {
            predicates,
            branches,
        } => {
            for (predicate, branch) in predicates.iter().zip(branches) {
                if eval_at(predicate, env, depth + 1)?.is_truthy() {
                    return eval_at(branch, env, depth + 1);
                }
            }
            Ok(Value::Quiet(None))
        }

        Expr::And(exprs) => {
            let mut value = Value::Bool(true);
            for expr in exprs {
                value = eval_at(expr, env, depth + 1)?;
                if !value.is_truthy() {
                    break;
                }
            }
            Ok(value)
        }

        Expr::Or(exprs) => {
            for expr in exprs {
                let value = eval_at(expr, env, depth + 1)?;
                if value.is_truthy() {
                    return Ok(value);
                }
            }
            Ok(Value::Bool(false))
        }

        Expr::Cons(first, second) => {
            let first = eval_at(first, env, depth + 1)?;
            let second = eval_at(second, env, depth + 1)?;
            Ok(Value::Pair(Rc::new(first), Rc::new(second)))
        }

        Expr::Lambda { params, body, name } => Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            body: Rc::clone(body),
            env: env.clone(),
            name: name.clone(),
        }))),

        Expr::Call { head, args } => {
            let callee = eval_at(head, env, depth + 1)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_at(arg, env, depth + 1)?);
            }
            apply(&callee, &values, depth)
        }
    }
}

fn apply(callee: &Value, args: &[Value], depth: usize) -> Result<Value, Error> {
    match callee {
        Value::Builtin { func, .. } => func(args),
        Value::Closure(closure) => {
            if args.len() != closure.params.len() {
                return Err(Error::Runtime(format!(
                    "lambda function requires {} args; called with {}",
                    closure.params.len(),
                    args.len()
                )));
            }
            // A call frame is a copy of the captured environment with the
            // parameters (and the self-name, when present) bound locally.
            let mut frame = closure.env.clone();
            for (param, value) in closure.params.iter().zip(args) {
                frame.bind_local(param.clone(), value.clone());
            }
            if let Some(name) = &closure.name {
                frame.bind_local(name.clone(), callee.clone());
            }
            eval_at(&closure.body, &frame, depth + 1)
        }
        _ => Err(Error::Runtime(
            "non-callable type cannot be called".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Evaluation outcome expected by a test case.
    enum Expected {
        Prints(&'static str),
        IsError(&'static str),
    }
    use Expected::{IsError, Prints};

    fn run(interpreter: &Interpreter, source: &str) -> Result<Value, Error> {
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(source)?;
        let expr = parser::parse_expression(tokenizer.tokens())?;
        interpreter.eval(&expr)
    }

    /// Each group shares one interpreter, so defines carry across cases the
    /// way they do across REPL entries.
    fn run_groups(groups: Vec<Vec<(&str, Expected)>>) {
        for (g, group) in groups.into_iter().enumerate() {
            let interpreter = Interpreter::new();
            for (i, (source, expected)) in group.into_iter().enumerate() {
                let id = format!("group {} case {} ({source})", g + 1, i + 1);
                match (run(&interpreter, source), expected) {
                    (Ok(value), Prints(text)) => {
                        assert_eq!(value.to_string(), text, "{id}");
                    }
                    (Err(err), IsError(fragment)) => {
                        let message = err.to_string();
                        assert!(
                            message.contains(fragment),
                            "{id}: error {message:?} should contain {fragment:?}"
                        );
                    }
                    (Ok(value), IsError(fragment)) => {
                        panic!("{id}: expected error containing {fragment:?}, got {value:?}");
                    }
                    (Err(err), Prints(text)) => {
                        panic!("{id}: expected {text:?}, got error {err}");
                    }
                }
            }
        }
    }

    #[test]
    fn literals_and_arithmetic() {
        run_groups(vec![vec![
            ("42", Prints("42")),
            ("#t", Prints("#t")),
            ("#f", Prints("#f")),
            ("()", Prints("()")),
            ("(+ 1 2 3)", Prints("6")),
            ("(+)", Prints("0")),
            ("(*)", Prints("1")),
            ("(* 2 3 4)", Prints("24")),
            ("(- 10 3 2)", Prints("5")),
            // Left-fold subtraction and division: a single operand is
            // returned untouched.
            ("(- 5)", Prints("5")),
            ("(/ 5)", Prints("5")),
            ("(/ 100 5 2)", Prints("10")),
            ("(/ 7 2)", Prints("3")),
            ("(abs -4)", Prints("4")),
            ("(expt 2 10)", Prints("1024")),
            ("(modulo 7 3)", Prints("1")),
            ("(modulo -7 3)", Prints("-1")),
            ("(max 3 1 2)", Prints("3")),
            ("(min 3 1 2)", Prints("1")),
            ("(zero? 0)", Prints("#t")),
            ("(zero? 1)", Prints("#f")),
            ("(+ (* 2 3) (- 8 2))", Prints("12")),
        ]]);
    }

    #[test]
    fn comparisons_chain_over_adjacent_pairs() {
        run_groups(vec![vec![
            ("(= 5 5 5)", Prints("#t")),
            ("(= 5 5 4)", Prints("#f")),
            ("(< 1 2 3)", Prints("#t")),
            ("(< 1 3 2)", Prints("#f")),
            ("(> 3 2 1)", Prints("#t")),
            ("(<= 1 1 2)", Prints("#t")),
            ("(>= 2 2 1)", Prints("#t")),
            // Vacuous and singleton comparisons hold.
            ("(=)", Prints("#t")),
            ("(< 5)", Prints("#t")),
        ]]);
    }

    #[test]
    fn truthiness_and_short_circuit() {
        run_groups(vec![vec![
            ("(if #f 1 2)", Prints("2")),
            ("(if 0 1 2)", Prints("1")),
            ("(if () 1 2)", Prints("1")),
            ("(and)", Prints("#t")),
            ("(or)", Prints("#f")),
            ("(and 1 2 3)", Prints("3")),
            ("(and 1 #f 3)", Prints("#f")),
            ("(or #f 2 3)", Prints("2")),
            ("(or #f #f)", Prints("#f")),
            // Short-circuit: the unbound variable is never evaluated.
            ("(and #f nonexistent)", Prints("#f")),
            ("(or 1 nonexistent)", Prints("1")),
            ("(and #t nonexistent)", IsError("unbound variable: nonexistent")),
            ("(not #f)", Prints("#t")),
            ("(not 0)", Prints("#f")),
        ]]);
    }

    #[test]
    fn cond_returns_first_truthy_branch() {
        run_groups(vec![vec![
            ("(cond ((= 1 2) 0) ((> 3 1) 42))", Prints("42")),
            ("(cond (#t 1) (#t 2))", Prints("1")),
            // No matching clause yields a quiet value.
            ("(cond (#f 1))", Prints("")),
        ]]);
    }

    #[test]
    fn pairs_and_lists() {
        run_groups(vec![vec![
            ("(cons 1 2)", Prints("(1 . 2)")),
            ("(list 1 2 3)", Prints("(1 2 3)")),
            ("(cons 1 (list 2 3))", Prints("(1 2 3)")),
            ("(list)", Prints("()")),
            ("(car (list 1 2 3))", Prints("1")),
            ("(cdr (list 1 2 3))", Prints("(2 3)")),
            ("(cdr (cons 1 2))", Prints("2")),
            ("(length (list 1 2 3))", Prints("3")),
            ("(length (list))", Prints("0")),
            ("(append (list 1 2) (list 3 4))", Prints("(1 2 3 4)")),
            ("(append (list) (list 1))", Prints("(1)")),
            ("(pair? (cons 1 2))", Prints("#t")),
            ("(pair? ())", Prints("#f")),
            ("(list? (list 1 2))", Prints("#t")),
            ("(list? (cons 1 2))", Prints("#f")),
            ("(null? (list))", Prints("#t")),
            ("(null? (list 1))", Prints("#f")),
            ("(boolean? #t)", Prints("#t")),
            ("(integer? 3)", Prints("#t")),
            ("(integer? #t)", Prints("#f")),
            ("(procedure? +)", Prints("#t")),
            ("(procedure? 1)", Prints("#f")),
        ]]);
    }

    #[test]
    fn defines_lambdas_and_recursion() {
        run_groups(vec![
            vec![
                // `define` echoes the bound name through its quiet value.
                ("(define x 10)", Prints("x")),
                ("x", Prints("10")),
                ("(+ x 8)", Prints("18")),
                ("(define x 100)", Prints("x")),
                ("x", Prints("100")),
            ],
            vec![
                ("(define (sq n) (* n n))", Prints("sq")),
                ("(sq 7)", Prints("49")),
                ("(procedure? sq)", Prints("#t")),
            ],
            vec![
                // Recursion through the self-name from define sugar.
                (
                    "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))",
                    Prints("fact"),
                ),
                ("(fact 5)", Prints("120")),
                ("(fact 6)", Prints("720")),
            ],
            vec![
                // Mutual recursion resolves through the shared top-level.
                (
                    "(define (even? n) (if (= n 0) #t (odd? (- n 1))))",
                    Prints("even?"),
                ),
                (
                    "(define (odd? n) (if (= n 0) #f (even? (- n 1))))",
                    Prints("odd?"),
                ),
                ("(even? 10)", Prints("#t")),
                ("(odd? 7)", Prints("#t")),
            ],
            vec![
                ("((lambda (a b) (cons a b)) 1 2)", Prints("(1 . 2)")),
                ("((lambda () 42))", Prints("42")),
                ("((lambda (x) (* x x)) 4)", Prints("16")),
            ],
            vec![
                // Builtins are shadowable by top-level defines.
                ("(define + -)", Prints("+")),
                ("(+ 10 4)", Prints("6")),
            ],
        ]);
    }

    #[test]
    fn lexical_capture() {
        run_groups(vec![
            vec![
                (
                    "(define (make-adder n) (lambda (x) (+ x n)))",
                    Prints("make-adder"),
                ),
                ("(define add5 (make-adder 5))", Prints("add5")),
                ("(add5 3)", Prints("8")),
                ("(add5 30)", Prints("35")),
                ("((make-adder 2) 7)", Prints("9")),
            ],
            vec![
                // Closures see the binding captured at evaluation time,
                // not at call time.
                ("(define y 100)", Prints("y")),
                ("(let ((y 1)) (define f (lambda () y)))", Prints("f")),
                ("(define y 200)", Prints("y")),
                ("(f)", Prints("1")),
            ],
            vec![
                // Parameter shadowing leaves the global untouched.
                ("(define x 1)", Prints("x")),
                ("(define (f x) (+ x 10))", Prints("f")),
                ("(f 5)", Prints("15")),
                ("x", Prints("1")),
                ("(f x)", Prints("11")),
            ],
        ]);
    }

    #[test]
    fn let_and_let_star_scoping() {
        run_groups(vec![
            vec![
                ("(let ((x 2) (y 3)) (+ x y))", Prints("5")),
                ("(let* ((x 2) (y (+ x 1))) y)", Prints("3")),
                // Parallel bindings cannot see each other.
                ("(let ((x 1) (y x)) y)", IsError("unbound variable: x")),
                ("(let* ((x 1) (y x)) y)", Prints("1")),
                // The body is a sequence; the last value wins.
                ("(let ((x 1)) (+ x 1) (+ x 2))", Prints("3")),
            ],
            vec![
                // Let bindings never leak into the top level.
                ("(let ((hidden 9)) hidden)", Prints("9")),
                ("hidden", IsError("unbound variable: hidden")),
            ],
            vec![
                // An outer binding shadows the builtin inside the scope.
                ("(define x 5)", Prints("x")),
                ("(let ((x 1)) x)", Prints("1")),
                ("x", Prints("5")),
            ],
        ]);
    }

    #[test]
    fn begin_sequences() {
        run_groups(vec![vec![
            ("(begin 1 2 3)", Prints("3")),
            ("(begin)", Prints("")),
            ("(begin (define a 4) (* a a))", Prints("16")),
        ]]);
    }

    #[test]
    fn error_reporting() {
        run_groups(vec![vec![
            ("nope", IsError("unbound variable: nope")),
            ("(nope)", IsError("unbound variable: nope")),
            ("(/ 1 0)", IsError("division by zero")),
            ("(modulo 1 0)", IsError("division by zero")),
            ("(car 3)", IsError("non-pair")),
            ("(cdr ())", IsError("non-pair")),
            ("(1 2)", IsError("non-callable type cannot be called")),
            ("(+ 1 #t)", IsError("procedure `+`: all arguments must be numeric")),
            ("(abs 1 2)", IsError("procedure `abs`: expected exactly 1 args, got 2")),
            ("(-)", IsError("procedure `-`: expected at least 1 args, got 0")),
            ("(length (cons 1 2))", IsError("must be of type list")),
            ("(append (list 1) 2)", IsError("must be of type list")),
            (
                "((lambda (x) x) 1 2)",
                IsError("lambda function requires 1 args; called with 2"),
            ),
            ("((lambda (x) x))", IsError("lambda function requires 1 args; called with 0")),
        ]]);
    }

    #[test]
    fn arithmetic_overflow_is_reported() {
        run_groups(vec![vec![
            ("(+ 9223372036854775807 1)", IsError("integer overflow")),
            ("(- -9223372036854775808 1)", IsError("integer overflow")),
            ("(* 4611686018427387904 2)", IsError("integer overflow")),
            ("(abs -9223372036854775808)", IsError("integer overflow")),
            ("(expt 2 200)", IsError("integer overflow")),
            ("(expt 2 -1)", IsError("procedure `expt`")),
        ]]);
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() {
        run_groups(vec![vec![
            ("(define (loop n) (loop (+ n 1)))", Prints("loop")),
            ("(loop 0)", IsError("evaluation depth limit exceeded")),
        ]]);
    }

    #[test]
    fn argument_evaluation_order_is_left_to_right() {
        // Each argument defines a marker; the later define overwrites the
        // earlier one, which is only observable if evaluation runs left to
        // right.
        let interpreter = Interpreter::new();
        run(
            &interpreter,
            "(list (begin (define order 1) 0) (begin (define order 2) 0))",
        )
        .unwrap();
        assert_eq!(run(&interpreter, "order").unwrap(), Value::Int(2));
    }

    #[test]
    fn eval_source_wraps_programs_in_begin() {
        let interpreter = Interpreter::new();
        let value = interpreter
            .eval_source("(define x 10)\n(define (sq n) (* n n))\n(sq x)")
            .unwrap();
        assert_eq!(value, Value::Int(100));

        // Unbalanced batch input is rejected up front.
        let err = interpreter.eval_source("(+ 1 2").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parser: input does not form a valid expression"
        );

        // Empty input evaluates to a quiet value.
        assert_eq!(
            interpreter.eval_source("").unwrap(),
            Value::Quiet(None)
        );
    }

    #[test]
    fn append_shares_the_tail_spine() {
        let interpreter = Interpreter::new();
        run(&interpreter, "(define tail (list 3 4))").unwrap();
        let appended = run(&interpreter, "(append (list 1 2) tail)").unwrap();
        let tail = run(&interpreter, "tail").unwrap();
        let Value::Pair(_, rest) = &appended else {
            panic!("expected a pair");
        };
        let Value::Pair(_, rest) = rest.as_ref() else {
            panic!("expected a pair");
        };
        let Value::Pair(shared_first, _) = rest.as_ref() else {
            panic!("expected a pair");
        };
        let Value::Pair(tail_first, _) = &tail else {
            panic!("expected a pair");
        };
        assert!(Rc::ptr_eq(shared_first, tail_first));
    }
}
