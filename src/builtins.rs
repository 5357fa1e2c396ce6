//! The built-in procedure table. Every built-in is a plain function over
//! the already-evaluated argument values; argument count and operand kinds
//! are checked before use, and violations name the offending procedure.
//! Arithmetic is overflow-checked. Lookups materialize a
//! [`Value::Builtin`] on demand, so the table itself stays immutable and
//! shared.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::LazyLock;

use crate::Error;
use crate::value::{BuiltinFn, Number, Value};

const TABLE: &[(&str, BuiltinFn)] = &[
    // Integers
    ("+", add),
    ("-", subtract),
    ("*", multiply),
    ("/", divide),
    ("abs", abs),
    ("expt", expt),
    ("modulo", modulo),
    ("max", max),
    ("min", min),
    ("=", num_eq),
    ("<", num_lt),
    (">", num_gt),
    ("<=", num_le),
    (">=", num_ge),
    ("zero?", zero_pred),
    // Pairs and lists
    ("car", car),
    ("cdr", cdr),
    ("length", length),
    ("append", append),
    // Other
    ("display", display),
    ("newline", newline),
    ("not", not),
    // Types
    ("boolean?", boolean_pred),
    ("integer?", integer_pred),
    ("pair?", pair_pred),
    ("list?", list_pred),
    ("procedure?", procedure_pred),
    ("null?", null_pred),
];

static INDEX: LazyLock<HashMap<&'static str, BuiltinFn>> =
    LazyLock::new(|| TABLE.iter().copied().collect());

/// Look a name up in the built-in table, materializing the callable value.
pub(crate) fn find(name: &str) -> Option<Value> {
    INDEX
        .get_key_value(name)
        .map(|(&name, &func)| Value::Builtin { name, func })
}

// Argument precondition helpers.

fn expect_exactly(name: &'static str, args: &[Value], count: usize) -> Result<(), Error> {
    if args.len() != count {
        return Err(Error::exact_arity(name, count, args.len()));
    }
    Ok(())
}

fn numeric_operands(name: &'static str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter()
        .map(|value| match value {
            Value::Int(n) => Ok(*n),
            _ => Err(Error::Builtin {
                name,
                message: "all arguments must be numeric".to_string(),
            }),
        })
        .collect()
}

fn proper_list_operands(name: &'static str, args: &[Value]) -> Result<(), Error> {
    if args.iter().all(Value::is_list) {
        Ok(())
    } else {
        Err(Error::Builtin {
            name,
            message: "argument(s) must be of type list".to_string(),
        })
    }
}

fn overflow(operation: &str) -> Error {
    Error::Runtime(format!("integer overflow in {operation}"))
}

// Arithmetic

fn add(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("+", args)?;
    let mut sum: Number = 0;
    for n in operands {
        sum = sum.checked_add(n).ok_or_else(|| overflow("addition"))?;
    }
    Ok(Value::Int(sum))
}

fn multiply(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("*", args)?;
    let mut product: Number = 1;
    for n in operands {
        product = n
            .checked_mul(product)
            .ok_or_else(|| overflow("multiplication"))?;
    }
    Ok(Value::Int(product))
}

fn subtract(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("-", args)?;
    // Left-fold from the first operand; a lone operand is returned as-is,
    // so `(- 5)` is 5, not -5.
    let Some((&first, rest)) = operands.split_first() else {
        return Err(Error::min_arity("-", 1, 0));
    };
    let mut result = first;
    for &n in rest {
        result = result.checked_sub(n).ok_or_else(|| overflow("subtraction"))?;
    }
    Ok(Value::Int(result))
}

fn divide(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("/", args)?;
    let Some((&first, rest)) = operands.split_first() else {
        return Err(Error::min_arity("/", 1, 0));
    };
    let mut result = first;
    for &n in rest {
        if n == 0 {
            return Err(Error::Runtime("division by zero".to_string()));
        }
        result = result.checked_div(n).ok_or_else(|| overflow("division"))?;
    }
    Ok(Value::Int(result))
}

fn abs(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("abs", args, 1)?;
    let operands = numeric_operands("abs", args)?;
    operands[0]
        .checked_abs()
        .map(Value::Int)
        .ok_or_else(|| overflow("absolute value"))
}

fn expt(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("expt", args, 2)?;
    let operands = numeric_operands("expt", args)?;
    let exponent = u32::try_from(operands[1]).map_err(|_| Error::Builtin {
        name: "expt",
        message: "exponent must be a non-negative integer".to_string(),
    })?;
    operands[0]
        .checked_pow(exponent)
        .map(Value::Int)
        .ok_or_else(|| overflow("exponentiation"))
}

fn modulo(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("modulo", args, 2)?;
    let operands = numeric_operands("modulo", args)?;
    if operands[1] == 0 {
        return Err(Error::Runtime("division by zero".to_string()));
    }
    operands[0]
        .checked_rem(operands[1])
        .map(Value::Int)
        .ok_or_else(|| overflow("modulo"))
}

fn max(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("max", args)?;
    let Some((&first, rest)) = operands.split_first() else {
        return Err(Error::min_arity("max", 1, 0));
    };
    Ok(Value::Int(rest.iter().fold(first, |a, &b| a.max(b))))
}

fn min(args: &[Value]) -> Result<Value, Error> {
    let operands = numeric_operands("min", args)?;
    let Some((&first, rest)) = operands.split_first() else {
        return Err(Error::min_arity("min", 1, 0));
    };
    Ok(Value::Int(rest.iter().fold(first, |a, &b| a.min(b))))
}

// Numeric comparisons: every adjacent pair must satisfy the relation, so
// vacuous and singleton applications hold.
macro_rules! numeric_comparison {
    ($fn_name:ident, $name:literal, $op:tt) => {
        fn $fn_name(args: &[Value]) -> Result<Value, Error> {
            let operands = numeric_operands($name, args)?;
            Ok(Value::Bool(
                operands.windows(2).all(|pair| pair[0] $op pair[1]),
            ))
        }
    };
}

numeric_comparison!(num_eq, "=", ==);
numeric_comparison!(num_lt, "<", <);
numeric_comparison!(num_gt, ">", >);
numeric_comparison!(num_le, "<=", <=);
numeric_comparison!(num_ge, ">=", >=);

fn zero_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("zero?", args, 1)?;
    let operands = numeric_operands("zero?", args)?;
    Ok(Value::Bool(operands[0] == 0))
}

// Pairs and lists

fn car(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("car", args, 1)?;
    match &args[0] {
        Value::Pair(first, _) => Ok(first.as_ref().clone()),
        _ => Err(Error::Builtin {
            name: "car",
            message: "cannot get element of non-pair type".to_string(),
        }),
    }
}

fn cdr(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("cdr", args, 1)?;
    match &args[0] {
        Value::Pair(_, second) => Ok(second.as_ref().clone()),
        _ => Err(Error::Builtin {
            name: "cdr",
            message: "cannot get element of non-pair type".to_string(),
        }),
    }
}

fn length(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("length", args, 1)?;
    proper_list_operands("length", args)?;
    let mut count: Number = 0;
    let mut node = &args[0];
    while let Value::Pair(_, rest) = node {
        count += 1;
        node = rest.as_ref();
    }
    Ok(Value::Int(count))
}

fn append(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("append", args, 2)?;
    proper_list_operands("append", args)?;
    Ok(concat(&args[0], &args[1]))
}

/// Rebuild the left spine freshly; the right list is shared as the tail.
fn concat(list: &Value, tail: &Value) -> Value {
    match list {
        Value::Pair(first, rest) => {
            Value::Pair(Rc::clone(first), Rc::new(concat(rest.as_ref(), tail)))
        }
        _ => tail.clone(),
    }
}

// Other

fn display(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("display", args, 1)?;
    print!("{}", args[0]);
    let _ = io::stdout().flush();
    Ok(Value::Quiet(None))
}

fn newline(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("newline", args, 0)?;
    println!();
    Ok(Value::Quiet(None))
}

fn not(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

// Type predicates

fn boolean_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("boolean?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

fn integer_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("integer?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Int(_))))
}

fn pair_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("pair?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Pair(..))))
}

fn list_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("list?", args, 1)?;
    Ok(Value::Bool(args[0].is_list()))
}

fn procedure_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("procedure?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Builtin { .. } | Value::Closure(_)
    )))
}

fn null_pred(args: &[Value]) -> Result<Value, Error> {
    expect_exactly("null?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Unit)))
}
