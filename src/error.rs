//! Centralised error hierarchy for the **Dymond interpreter**.
//!
//! Every stage (scanner, parser, resolver, runtime, CLI) converts its failure
//! modes into one of the variants defined here. Compile-time variants
//! (`Lex`, `Parse`, `Resolve`) accumulate; a `Runtime` error aborts the
//! current top-level statement only.
//!
//! The module **does not** print diagnostics itself; it hands structured
//! [`Diagnostic`] records to a [`Reporter`].

use std::io;
use std::rc::Rc;

use log::info;
use thiserror::Error;

use crate::token::Token;

/// Location and text of a single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1‑based line where the error occurred.
    pub line: usize,

    /// 1‑based column of the offending lexeme.
    pub column: usize,

    /// Human‑readable description.
    pub message: String,

    /// Full text of the offending source line.
    pub source_line: Rc<str>,
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DymondError {
    /// Lexical (scanner) error.
    #[error("[line {}] Error: {}", .0.line, .0.message)]
    Lex(Diagnostic),

    /// Syntactic (parser) error.
    #[error("[line {}] Error: {}", .0.line, .0.message)]
    Parse(Diagnostic),

    /// Static‑analysis failure (illegal `this`/`super`/`return`, redeclaration…).
    #[error("[line {}] Error: {}", .0.line, .0.message)]
    Resolve(Diagnostic),

    /// Runtime evaluation error.
    #[error("[line {}] Runtime error: {}", .0.line, .0.message)]
    Runtime(Diagnostic),

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DymondError {
    /// Helper constructor for the **scanner**, which has no token yet.
    pub fn lex<S: Into<String>>(line: usize, column: usize, source_line: Rc<str>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        DymondError::Lex(Diagnostic {
            line,
            column,
            message,
            source_line,
        })
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        DymondError::Parse(Self::at(token, message))
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        DymondError::Resolve(Self::at(token, message))
    }

    /// Helper constructor for the **interpreter** and native functions.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        DymondError::Runtime(Self::at(token, message))
    }

    fn at(token: &Token, message: String) -> Diagnostic {
        Diagnostic {
            line: token.line,
            column: token.column,
            message,
            source_line: token.line_text.clone(),
        }
    }

    /// The structured record, if this error points into source text.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            DymondError::Lex(d)
            | DymondError::Parse(d)
            | DymondError::Resolve(d)
            | DymondError::Runtime(d) => Some(d),
            _ => None,
        }
    }

    /// Just the message text, without the line prefix.
    pub fn message(&self) -> String {
        match self.diagnostic() {
            Some(d) => d.message.clone(),
            None => self.to_string(),
        }
    }

    /// Scan, parse and resolve errors stop a program before it runs.
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            DymondError::Lex(_) | DymondError::Parse(_) | DymondError::Resolve(_)
        )
    }
}

/// Collaborator sink receiving every diagnostic the core produces.
pub trait Reporter {
    fn report(&mut self, error: DymondError);
}

impl Reporter for Vec<DymondError> {
    fn report(&mut self, error: DymondError) {
        self.push(error);
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, DymondError>;
