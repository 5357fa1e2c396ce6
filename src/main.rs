//! Command-line driver: batch evaluation of a file or piped stdin, or an
//! interactive REPL when stdin is a terminal. Recoverable interpreter
//! errors print to stdout with an `error:` prefix and never change the exit
//! code; only invocation problems exit nonzero.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use lilt::evaluator::Interpreter;
use lilt::lexer::{Progress, Tokenizer};
use lilt::parser;
use lilt::value::Value;

const PROMPT: &str = "lilt> ";
const CONTINUE_PROMPT: &str = "  ... ";

#[derive(Debug, Parser)]
#[command(
    name = "lilt",
    version,
    about = "A tree-walking interpreter for a small Scheme-like Lisp dialect."
)]
struct Args {
    /// Script file to evaluate; reads standard input when omitted.
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let interpreter = Interpreter::new();

    match args.file {
        Some(path) => match fs::read_to_string(&path) {
            Ok(source) => run_batch(&interpreter, &source),
            Err(_) => {
                println!("error: could not open file: {}", path.display());
                ExitCode::FAILURE
            }
        },
        None if io::stdin().is_terminal() => run_repl(&interpreter),
        None => {
            let mut source = String::new();
            if io::stdin().read_to_string(&mut source).is_err() {
                println!("error: failed to read from stdin");
                return ExitCode::FAILURE;
            }
            run_batch(&interpreter, &source)
        }
    }
}

/// Evaluate a whole program under the implicit `begin` and print the final
/// value unless it is quiet. Recoverable errors still exit zero.
fn run_batch(interpreter: &Interpreter, source: &str) -> ExitCode {
    match interpreter.eval_source(source) {
        Ok(value) => {
            if !matches!(value, Value::Quiet(_)) {
                println!("{value}");
            }
        }
        Err(err) => println!("error: {err}"),
    }
    ExitCode::SUCCESS
}

fn run_repl(interpreter: &Interpreter) -> ExitCode {
    println!("({} repl) v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let Ok(mut editor) = DefaultEditor::new() else {
        println!("error: could not initialize the line editor");
        return ExitCode::FAILURE;
    };

    let mut tokenizer = Tokenizer::new();
    'repl: loop {
        // Accumulate lines until the tokenizer reports a balanced
        // expression, then evaluate it.
        tokenizer.reset();
        let mut prompt = PROMPT;
        loop {
            match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    match tokenizer.feed(&line) {
                        Ok(Progress::Complete) => break,
                        Ok(Progress::Incomplete) => prompt = CONTINUE_PROMPT,
                        Err(err) => {
                            println!("error: {err}");
                            continue 'repl;
                        }
                    }
                }
                Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break 'repl,
                Err(err) => {
                    println!("error: {err}");
                    break 'repl;
                }
            }
        }

        if tokenizer.is_empty() {
            continue;
        }

        let result = parser::parse_expression(tokenizer.tokens())
            .and_then(|expr| interpreter.eval(&expr));
        match result {
            // Values that render to an empty string (quiet values with no
            // message) are suppressed; `define` echoes the bound name.
            Ok(value) => {
                let rendered = value.to_string();
                if !rendered.is_empty() {
                    println!("{rendered}");
                }
            }
            Err(err) => println!("error: {err}"),
        }
    }

    ExitCode::SUCCESS
}
