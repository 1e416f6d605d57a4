use log::info;

use crate::ast::Stmt;
use crate::error::Reporter;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// Outcome of running one unit of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// Scanning, parsing or resolution failed; nothing was executed.
    CompileError,
    /// At least one top-level statement aborted with a runtime error.
    RuntimeError,
}

/// Drives scan → parse → resolve → interpret over a persistent interpreter,
/// so globals defined by one call are visible to the next.
pub struct Runner {
    interpreter: Interpreter,
    repl: bool,
}

impl Runner {
    pub fn new(interpreter: Interpreter) -> Self {
        Runner {
            interpreter,
            repl: false,
        }
    }

    pub fn repl(mut self, repl: bool) -> Self {
        self.repl = repl;
        self.interpreter.set_repl(repl);
        self
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> RunStatus {
        let (tokens, lex_errors) = scan_tokens(source);
        let mut failed: bool = !lex_errors.is_empty();
        for error in lex_errors {
            reporter.report(error);
        }

        let statements: Vec<Stmt> = match Parser::new(tokens).repl(self.repl).parse() {
            Ok(statements) => statements,
            Err(errors) => {
                for error in errors {
                    reporter.report(error);
                }
                return RunStatus::CompileError;
            }
        };

        if failed {
            return RunStatus::CompileError;
        }

        if let Err(errors) = Resolver::new(&mut self.interpreter).resolve(&statements) {
            for error in errors {
                reporter.report(error);
            }
            failed = true;
        }

        if failed {
            info!("Compile errors found; skipping execution");
            return RunStatus::CompileError;
        }

        if self.interpreter.interpret(&statements, reporter) {
            RunStatus::Ok
        } else {
            RunStatus::RuntimeError
        }
    }
}
