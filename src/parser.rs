//! Tokens to AST. A recursive-descent pass over the token slice, parsing
//! exactly one expression (REPL) or a whole sequence of top-level forms
//! (batch input, which gets an implicit `begin`). Special forms are
//! recognized syntactically by the head token of a parenthesized form;
//! keywords lose their meaning outside head position.

use std::num::IntErrorKind;
use std::rc::Rc;

use crate::ast::Expr;
use crate::lexer::Token;
use crate::{Error, MAX_PARSE_DEPTH};

/// Parse exactly one expression covering the whole token sequence.
pub fn parse_expression(tokens: &[Token]) -> Result<Expr, Error> {
    let (expr, next) = expression(tokens, 0, 0)?;
    if next != tokens.len() {
        return Err(Error::Parse("unexpected input after expression".to_string()));
    }
    Ok(expr)
}

/// Parse a file or stdin worth of top-level forms as one implicit `begin`.
pub fn parse_program(tokens: &[Token]) -> Result<Expr, Error> {
    let mut forms = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let (expr, next) = expression(tokens, pos, 0)?;
        forms.push(expr);
        pos = next;
    }
    Ok(Expr::Seq(forms))
}

fn expression(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(Error::Parse(format!(
            "expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"
        )));
    }
    match tokens.get(pos) {
        Some(Token::Open) => form(tokens, pos, depth),
        Some(Token::Atom(text)) => Ok((atom(text)?, pos + 1)),
        Some(Token::Close) => Err(Error::Parse("unexpected `)`".to_string())),
        None => Err(Error::Parse("nothing to parse".to_string())),
    }
}

/// Parse a parenthesized form starting at the `(` under `open`.
fn form(tokens: &[Token], open: usize, depth: usize) -> Result<(Expr, usize), Error> {
    let pos = open + 1;
    if let Some(Token::Atom(head)) = tokens.get(pos) {
        match head.as_str() {
            "cons" => return cons_form(tokens, pos + 1, depth),
            "list" => return list_form(tokens, pos + 1, depth),
            "if" => return if_form(tokens, pos + 1, depth),
            "cond" => return cond_form(tokens, pos + 1, depth),
            "define" => return define_form(tokens, pos + 1, depth),
            "let" => return let_form(tokens, pos + 1, depth, false),
            "let*" => return let_form(tokens, pos + 1, depth, true),
            "lambda" => return lambda_form(tokens, pos + 1, depth),
            "begin" => {
                let (exprs, next) = elements(tokens, pos + 1, depth)?;
                return Ok((Expr::Seq(exprs), next));
            }
            "and" => {
                let (exprs, next) = elements(tokens, pos + 1, depth)?;
                return Ok((Expr::And(exprs), next));
            }
            "or" => {
                let (exprs, next) = elements(tokens, pos + 1, depth)?;
                return Ok((Expr::Or(exprs), next));
            }
            _ => {}
        }
    }

    // `()` is a literal unit expression; anything else is a procedure call.
    let (mut exprs, next) = elements(tokens, pos, depth)?;
    if exprs.is_empty() {
        return Ok((Expr::Unit, next));
    }
    let head = exprs.remove(0);
    Ok((
        Expr::Call {
            head: Box::new(head),
            args: exprs,
        },
        next,
    ))
}

/// Parse expressions until the closing paren of the current form; the
/// returned position is one past it.
fn elements(tokens: &[Token], mut pos: usize, depth: usize) -> Result<(Vec<Expr>, usize), Error> {
    let mut exprs = Vec::new();
    loop {
        match tokens.get(pos) {
            Some(Token::Close) => return Ok((exprs, pos + 1)),
            Some(_) => {
                let (expr, next) = expression(tokens, pos, depth + 1)?;
                exprs.push(expr);
                pos = next;
            }
            None => return Err(Error::Parse("unterminated expression".to_string())),
        }
    }
}

fn cons_form(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    let (exprs, next) = elements(tokens, pos, depth)?;
    match <[Expr; 2]>::try_from(exprs) {
        Ok([first, second]) => Ok((Expr::Cons(Box::new(first), Box::new(second)), next)),
        Err(_) => Err(Error::Form {
            form: "cons",
            message: "illegal syntax",
        }),
    }
}

fn list_form(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    let (exprs, next) = elements(tokens, pos, depth)?;
    // Right-fold into a nested pair chain terminated by unit.
    let spine = exprs.into_iter().rev().fold(Expr::Unit, |tail, head| {
        Expr::Cons(Box::new(head), Box::new(tail))
    });
    Ok((spine, next))
}

fn if_form(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    let (exprs, next) = elements(tokens, pos, depth)?;
    match <[Expr; 3]>::try_from(exprs) {
        // `if` is a two-arm cond whose second predicate is literal true.
        Ok([predicate, consequent, alternative]) => Ok((
            Expr::Cond {
                predicates: vec![predicate, Expr::Bool(true)],
                branches: vec![consequent, alternative],
            },
            next,
        )),
        Err(_) => Err(Error::Form {
            form: "if",
            message: "illegal syntax",
        }),
    }
}

fn cond_form(tokens: &[Token], mut pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    let mut predicates = Vec::new();
    let mut branches = Vec::new();
    loop {
        match tokens.get(pos) {
            Some(Token::Close) => {
                pos += 1;
                break;
            }
            Some(Token::Open) => {
                let (clause, next) = elements(tokens, pos + 1, depth + 1)?;
                match <[Expr; 2]>::try_from(clause) {
                    Ok([predicate, branch]) => {
                        predicates.push(predicate);
                        branches.push(branch);
                    }
                    Err(_) => {
                        return Err(Error::Form {
                            form: "cond",
                            message: "illegal condition list",
                        });
                    }
                }
                pos = next;
            }
            _ => {
                return Err(Error::Form {
                    form: "cond",
                    message: "illegal condition list",
                });
            }
        }
    }
    if predicates.is_empty() {
        return Err(Error::Form {
            form: "cond",
            message: "illegal condition list",
        });
    }
    Ok((Expr::Cond { predicates, branches }, pos))
}

fn define_form(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    match tokens.get(pos) {
        // Function definition sugar: (define (name p1 ... pk) body).
        Some(Token::Open) => {
            let (names, after) = identifier_list(tokens, pos, "lambda", "illegal argument list")?;
            let Some((name, params)) = names.split_first() else {
                return Err(Error::Form {
                    form: "lambda",
                    message: "illegal argument list",
                });
            };
            let (body, next) = single_body(tokens, after, depth, "define")?;
            let lambda = Expr::Lambda {
                params: params.to_vec(),
                body: Rc::new(body),
                name: Some(name.clone()),
            };
            Ok((
                Expr::Bind {
                    name: name.clone(),
                    value: Box::new(lambda),
                },
                next,
            ))
        }
        Some(Token::Atom(text)) if is_identifier(text) => {
            let name = text.clone();
            let (body, next) = single_body(tokens, pos + 1, depth, "define")?;
            Ok((
                Expr::Bind {
                    name,
                    value: Box::new(body),
                },
                next,
            ))
        }
        _ => Err(Error::Form {
            form: "define",
            message: "illegal syntax",
        }),
    }
}

fn let_form(
    tokens: &[Token],
    pos: usize,
    depth: usize,
    sequential: bool,
) -> Result<(Expr, usize), Error> {
    let Some(Token::Open) = tokens.get(pos) else {
        return Err(Error::Form {
            form: "let",
            message: "illegal binding list",
        });
    };
    let mut cursor = pos + 1;
    let mut bindings = Vec::new();
    loop {
        match tokens.get(cursor) {
            Some(Token::Close) => {
                cursor += 1;
                break;
            }
            Some(Token::Open) => {
                let name = match tokens.get(cursor + 1) {
                    Some(Token::Atom(text)) if is_identifier(text) => text.clone(),
                    _ => {
                        return Err(Error::Form {
                            form: "let",
                            message: "illegal binding list",
                        });
                    }
                };
                if matches!(tokens.get(cursor + 2), Some(Token::Close) | None) {
                    return Err(Error::Form {
                        form: "let",
                        message: "illegal binding list",
                    });
                }
                let (value, next) = expression(tokens, cursor + 2, depth + 1)?;
                let Some(Token::Close) = tokens.get(next) else {
                    return Err(Error::Form {
                        form: "let",
                        message: "illegal binding list",
                    });
                };
                bindings.push((name, value));
                cursor = next + 1;
            }
            _ => {
                return Err(Error::Form {
                    form: "let",
                    message: "illegal binding list",
                });
            }
        }
    }
    let (body, next) = elements(tokens, cursor, depth)?;
    if body.is_empty() {
        return Err(Error::Form {
            form: "let",
            message: "illegal syntax",
        });
    }
    Ok((
        Expr::Let {
            bindings,
            body: Box::new(Expr::Seq(body)),
            sequential,
        },
        next,
    ))
}

fn lambda_form(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), Error> {
    match tokens.get(pos) {
        Some(Token::Open) => {
            let (params, after) = identifier_list(tokens, pos, "lambda", "illegal argument list")?;
            let (body, next) = single_body(tokens, after, depth, "lambda")?;
            Ok((
                Expr::Lambda {
                    params,
                    body: Rc::new(body),
                    name: None,
                },
                next,
            ))
        }
        _ => Err(Error::Form {
            form: "lambda",
            message: "illegal argument list",
        }),
    }
}

/// A flat parenthesized list of identifiers; nesting and non-identifiers
/// are rejected with the given form-specific message. `open` must index the
/// opening paren.
fn identifier_list(
    tokens: &[Token],
    open: usize,
    form: &'static str,
    message: &'static str,
) -> Result<(Vec<String>, usize), Error> {
    let mut pos = open + 1;
    let mut names = Vec::new();
    loop {
        match tokens.get(pos) {
            Some(Token::Close) => return Ok((names, pos + 1)),
            Some(Token::Atom(text)) if is_identifier(text) => {
                names.push(text.clone());
                pos += 1;
            }
            _ => return Err(Error::Form { form, message }),
        }
    }
}

/// Exactly one expression followed by the closing paren of the form.
fn single_body(
    tokens: &[Token],
    pos: usize,
    depth: usize,
    form: &'static str,
) -> Result<(Expr, usize), Error> {
    if matches!(tokens.get(pos), Some(Token::Close) | None) {
        return Err(Error::Form {
            form,
            message: "illegal syntax",
        });
    }
    let (body, next) = expression(tokens, pos, depth + 1)?;
    match tokens.get(next) {
        Some(Token::Close) => Ok((body, next + 1)),
        _ => Err(Error::Form {
            form,
            message: "illegal syntax",
        }),
    }
}

fn atom(text: &str) -> Result<Expr, Error> {
    match text {
        "#t" => Ok(Expr::Bool(true)),
        "#f" => Ok(Expr::Bool(false)),
        _ => match text.parse::<i64>() {
            Ok(value) => Ok(Expr::Int(value)),
            Err(err)
                if matches!(
                    err.kind(),
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                ) =>
            {
                Err(Error::Parse("integer too large".to_string()))
            }
            Err(_) => Ok(Expr::Var(text.to_string())),
        },
    }
}

/// Identifiers are atoms that are neither boolean literals nor (possibly
/// out-of-range) integer literals.
fn is_identifier(text: &str) -> bool {
    if text == "#t" || text == "#f" {
        return false;
    }
    match text.parse::<i64>() {
        Ok(_) => false,
        Err(err) => !matches!(
            err.kind(),
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
        ),
    }
}
