//! Everything a call expression can invoke.
//!
//! User functions, bound methods, natives and classes share one dispatch
//! path: [`Callable::call`] checks the argument count against the callee's
//! `(min, max)` arity and only then hands the evaluated arguments over.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::Class;
use crate::environment::{EnvRef, Environment};
use crate::error::{DymondError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Function(function) => &function.declaration.name.lexeme,
            Callable::Class(class) => &class.name,
            Callable::Native(native) => native.name,
        }
    }

    pub fn min_arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.min_arity(),
            Callable::Class(class) => class.min_arity(),
            Callable::Native(native) => native.min_arity,
        }
    }

    pub fn max_arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.max_arity(),
            Callable::Class(class) => class.max_arity(),
            Callable::Native(native) => native.max_arity,
        }
    }

    /// Invoke with already evaluated arguments. `paren` is the call site,
    /// used to attribute any error.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        let (min, max) = (self.min_arity(), self.max_arity());
        let got: usize = arguments.len();

        if got < min || got > max {
            let message: String = if min == max {
                format!("Expected {} arguments but got {}.", min, got)
            } else {
                format!(
                    "Expected between {} and {} arguments but got {}.",
                    min, max, got
                )
            };
            return Err(DymondError::runtime(paren, message));
        }

        debug!("Calling '{}' with {} arguments", self.name(), got);

        match self {
            Callable::Function(function) => function.call(interpreter, arguments, paren),
            Callable::Class(class) => Class::instantiate(class, interpreter, arguments, paren),
            Callable::Native(native) => (native.func)(interpreter, paren, &arguments),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "<fn {}>", function.declaration.name.lexeme),
            Callable::Class(class) => write!(f, "{}", class.name),
            Callable::Native(_) => write!(f, "<native fn>"),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self)
    }
}

// ───── User functions ─────

/// A declaration paired with the environment it closed over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Parameters up to and including the last one without a default.
    pub fn min_arity(&self) -> usize {
        self.declaration
            .params
            .iter()
            .rposition(|param| param.default.is_none())
            .map_or(0, |index| index + 1)
    }

    pub fn max_arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Copy of this function whose closure has `this` bound to `receiver`.
    pub fn bind(&self, receiver: Value) -> Function {
        let env: EnvRef = Environment::child(&self.closure);
        env.borrow_mut().define("this", receiver);

        Function {
            declaration: self.declaration.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        let env: EnvRef = Rc::new(RefCell::new(Environment::with_enclosing(self.closure.clone())));
        let mut arguments = arguments.into_iter();

        // Defaults see the parameters bound before them.
        for param in &self.declaration.params {
            let value: Value = match (arguments.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => interpreter.evaluate_in(default, env.clone())?,
                (None, None) => {
                    return Err(DymondError::runtime(
                        paren,
                        format!("Missing argument for '{}'.", param.name.lexeme),
                    ))
                }
            };
            env.borrow_mut().define(&param.name.lexeme, value);
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, env)?;

        match flow {
            Flow::Break(keyword) => Err(DymondError::runtime(
                &keyword,
                "Cannot use 'break' outside of a loop.",
            )),
            Flow::Next(keyword) => Err(DymondError::runtime(
                &keyword,
                "Cannot use 'next' outside of a loop.",
            )),
            _ if self.is_initializer => Ok(self.this()),
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    fn this(&self) -> Value {
        Environment::get_at(&self.closure, 0, "this").unwrap_or(Value::Nil)
    }
}

// ───── Natives ─────

/// Host hook behind a built-in. Receives the interpreter (for its I/O), the
/// call-site token and the evaluated arguments.
pub type NativeFn = fn(&mut Interpreter, &Token, &[Value]) -> Result<Value>;

pub struct NativeFunction {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
    pub func: NativeFn,
}
