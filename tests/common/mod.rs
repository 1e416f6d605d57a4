#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use dymond::error::DymondError;
use dymond::interpreter::Interpreter;
use dymond::runner::{RunStatus, Runner};

/// In-memory sink that stays readable after being handed to the interpreter.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("interpreter wrote invalid UTF-8")
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Outcome {
    pub status: RunStatus,
    pub output: String,
    pub errors: Vec<String>,
}

pub fn runner_with_input(input: &'static str) -> (Runner, SharedBuffer) {
    let out = SharedBuffer::default();
    let interpreter = Interpreter::with_io(Box::new(out.clone()), Box::new(Cursor::new(input)));
    (Runner::new(interpreter), out)
}

pub fn run_with_input(source: &str, input: &'static str) -> Outcome {
    let (mut runner, out) = runner_with_input(input);
    let mut errors: Vec<DymondError> = Vec::new();

    let status = runner.run(source, &mut errors);

    Outcome {
        status,
        output: out.contents(),
        errors: errors.iter().map(DymondError::message).collect(),
    }
}

/// Run `source` in file mode with empty input.
pub fn run(source: &str) -> Outcome {
    run_with_input(source, "")
}

/// Run a program expected to succeed, returning its output.
pub fn output_of(source: &str) -> String {
    let outcome = run(source);
    assert_eq!(
        outcome.errors,
        Vec::<String>::new(),
        "unexpected diagnostics for:\n{}",
        source
    );
    assert_eq!(outcome.status, RunStatus::Ok);
    outcome.output
}
