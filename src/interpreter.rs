//! Tree‑walking evaluator.
//!
//! Statements return a [`Flow`] describing how control leaves them, so
//! `return`, `break` and `next` travel up the Rust call stack as ordinary
//! values. Runtime errors travel as `Err(DymondError::Runtime)` and abort the
//! current top‑level statement only.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{Callable, Function, NativeFunction};
use crate::class::{Class, Receiver};
use crate::environment::{EnvRef, Environment};
use crate::error::{DymondError, Reporter, Result};
use crate::natives;
use crate::token::{Token, TokenType};
use crate::value::{format_number, Value};

/// How control left a statement.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Break(Token),
    Next(Token),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Resolution distances recorded by the resolver.
    locals: HashMap<ExprId, usize>,
    repl: bool,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter wired to the process' stdout and stdin, with the built-in
    /// library installed.
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdout()), Box::new(io::BufReader::new(io::stdin())))
    }

    /// Interpreter with caller supplied output sink and input source.
    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(std::cell::RefCell::new(Environment::new()));

        let mut interpreter = Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            repl: false,
            output,
            input,
        };

        natives::install(&mut interpreter);

        interpreter
    }

    /// In REPL mode bare expression statements echo their non-nil value.
    pub fn set_repl(&mut self, repl: bool) {
        self.repl = repl;
    }

    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        let name: &'static str = native.name;
        self.globals
            .borrow_mut()
            .define(name, Value::Callable(Callable::Native(Rc::new(native))));
    }

    pub fn global_names(&self) -> HashSet<String> {
        self.globals.borrow().names().map(str::to_string).collect()
    }

    /// Called by the resolver for every local reference.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// One line from the input source without its line break, or `None` at
    /// end of input.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let trimmed: usize = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Execute a program. Each top-level statement that fails is reported and
    /// skipped. Returns `true` when no runtime error occurred.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) -> bool {
        info!("Interpreting {} statement(s)", statements.len());

        let mut clean = true;

        for stmt in statements {
            if let Err(error) = self.execute_top_level(stmt) {
                self.environment = self.globals.clone();
                reporter.report(error);
                clean = false;
            }
        }

        if let Err(error) = self.output.flush() {
            reporter.report(error.into());
            clean = false;
        }

        info!("Interpretation finished (clean: {})", clean);
        clean
    }

    fn execute_top_level(&mut self, stmt: &Stmt) -> Result<()> {
        if self.repl {
            if let Stmt::Expression(expr) = stmt {
                let value: Value = self.evaluate(expr)?;
                if !matches!(value, Value::Nil) {
                    writeln!(self.output, "{}", value)?;
                }
                return Ok(());
            }
        }

        match self.execute(stmt)? {
            Flow::Break(keyword) => Err(DymondError::runtime(
                &keyword,
                "Cannot use 'break' outside of a loop.",
            )),
            Flow::Next(keyword) => Err(DymondError::runtime(
                &keyword,
                "Cannot use 'next' outside of a loop.",
            )),
            Flow::Normal | Flow::Return(_) => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: EnvRef = Environment::child(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => self.run_loop(condition, None, body),

            Stmt::For {
                condition,
                increment,
                body,
            } => self.run_loop(condition, increment.as_ref(), body),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = Function::new(decl.clone(), self.environment.clone(), false);
                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Break(keyword) => Ok(Flow::Break(keyword.clone())),

            Stmt::Next(keyword) => Ok(Flow::Next(keyword.clone())),

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                let superclass: Option<Rc<Class>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Callable(Callable::Class(class)) => Some(class),
                        _ => {
                            let token: &Token = match expr {
                                Expr::Variable { name, .. } => name,
                                _ => name,
                            };
                            return Err(DymondError::runtime(token, "Superclass must be a class."));
                        }
                    },
                    None => None,
                };

                self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

                let method_env: EnvRef = match &superclass {
                    Some(class) => {
                        let env: EnvRef = Environment::child(&self.environment);
                        env.borrow_mut()
                            .define("super", Value::Callable(Callable::Class(class.clone())));
                        env
                    }
                    None => self.environment.clone(),
                };

                let methods: HashMap<String, Rc<Function>> = methods
                    .iter()
                    .map(|decl| {
                        let is_init: bool = decl.name.lexeme == "init";
                        let function = Function::new(decl.clone(), method_env.clone(), is_init);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let static_methods: HashMap<String, Rc<Function>> = static_methods
                    .iter()
                    .map(|decl| {
                        let function = Function::new(decl.clone(), method_env.clone(), false);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(&name.lexeme, superclass, methods, static_methods);
                info!("Class '{}' defined", name.lexeme);

                self.environment.borrow_mut().define(
                    &name.lexeme,
                    Value::Callable(Callable::Class(Rc::new(class))),
                );
                Ok(Flow::Normal)
            }
        }
    }

    /// Shared loop driver for `while` and desugared `for`. `next` falls
    /// through to the increment like a normal iteration end.
    fn run_loop(&mut self, condition: &Expr, increment: Option<&Expr>, body: &Stmt) -> Result<Flow> {
        while self.evaluate(condition)?.is_truthy() {
            match self.execute(body)? {
                Flow::Break(_) => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Next(_) => {}
            }

            if let Some(increment) = increment {
                self.evaluate(increment)?;
            }
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` in `env`, putting the previous environment back
    /// however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);

        let mut outcome: Result<Flow> = Ok(Flow::Normal);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    outcome = other;
                    break;
                }
            }
        }

        self.environment = previous;
        outcome
    }

    /// Evaluate `expr` with `env` temporarily active. Used for default
    /// parameter values.
    pub fn evaluate_in(&mut self, expr: &Expr, env: EnvRef) -> Result<Value> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);
        let result: Result<Value> = self.evaluate(expr);
        self.environment = previous;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(-number_operand(operator, &right)?)),
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(&operator.token_type, operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let short_circuits: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            // Both branches run before the choice is made, else branch first
            // and the condition last.
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let else_value: Value = self.evaluate(else_branch)?;
                let then_value: Value = self.evaluate(then_branch)?;
                let condition: Value = self.evaluate(condition)?;
                Ok(if condition.is_truthy() { then_value } else { else_value })
            }

            Expr::Comma(exprs) => {
                let mut last: Value = Value::Nil;
                for e in exprs {
                    last = self.evaluate(e)?;
                }
                Ok(last)
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone(), true)?;
                Ok(value)
            }

            Expr::CompoundAssign {
                id,
                name,
                operator,
                value,
            } => {
                let current: Value = self.look_up_variable(*id, name)?;
                let rhs: Value = self.evaluate(value)?;
                let updated: Value = binary(&compound_base(operator), operator, current, rhs)?;
                self.assign_variable(*id, name, updated.clone(), false)?;
                Ok(updated)
            }

            Expr::Update {
                operator,
                target,
                prefix,
            } => self.evaluate_update(operator, target, *prefix),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                match callee {
                    Value::Callable(callable) => callable.call(self, values, paren),
                    _ => Err(DymondError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    )),
                }
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                get_property(&object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;
                let value: Value = self.evaluate(value)?;
                set_property(&object, name, value.clone())?;
                Ok(value)
            }

            Expr::CompoundSet {
                object,
                name,
                operator,
                value,
            } => {
                let object: Value = self.evaluate(object)?;
                let current: Value = get_property(&object, name)?;
                let rhs: Value = self.evaluate(value)?;
                let updated: Value = binary(&compound_base(operator), operator, current, rhs)?;
                set_property(&object, name, updated.clone())?;
                Ok(updated)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_update(&mut self, operator: &Token, target: &Expr, prefix: bool) -> Result<Value> {
        let delta: f64 = if operator.token_type == TokenType::PLUS_PLUS {
            1.0
        } else {
            -1.0
        };

        let (old, new) = match target {
            Expr::Variable { id, name } => {
                let old: f64 = number_operand(operator, &self.look_up_variable(*id, name)?)?;
                self.assign_variable(*id, name, Value::Number(old + delta), false)?;
                (old, old + delta)
            }
            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                let old: f64 = number_operand(operator, &get_property(&object, name)?)?;
                set_property(&object, name, Value::Number(old + delta))?;
                (old, old + delta)
            }
            _ => return Err(DymondError::runtime(operator, "Invalid increment target.")),
        };

        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = self.locals.get(&id).copied().ok_or_else(|| {
            DymondError::runtime(keyword, "Cannot use 'super' outside of a class.")
        })?;

        let superclass: Option<Value> = Environment::get_at(&self.environment, distance, "super");
        let receiver: Option<Value> = distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"));

        let (Some(Value::Callable(Callable::Class(superclass))), Some(receiver)) = (superclass, receiver)
        else {
            return Err(DymondError::runtime(keyword, "Cannot use 'super' outside of a class."));
        };

        // A static method's receiver is the class itself.
        let found: Option<Rc<Function>> = match receiver {
            Value::Instance(_) => superclass.find_method(&method.lexeme),
            _ => superclass.find_static_method(&method.lexeme),
        };

        match found {
            Some(function) => Ok(Value::Callable(Callable::Function(Rc::new(
                function.bind(receiver),
            )))),
            None => Err(DymondError::runtime(
                method,
                format!("Undefined method '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| {
                    DymondError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
                }),
            None => self.globals.borrow().get(name),
        }
    }

    /// Write through the recorded distance, or to the globals. With
    /// `define_missing`, an unknown global is created instead of reported.
    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value, define_missing: bool) -> Result<()> {
        if let Some(&distance) = self.locals.get(&id) {
            return Environment::assign_at(&self.environment, distance, name, value);
        }

        let mut globals = self.globals.borrow_mut();
        if define_missing && !globals.contains(&name.lexeme) {
            debug!("Defining global '{}' by assignment", name.lexeme);
            globals.define(&name.lexeme, value);
            Ok(())
        } else {
            globals.assign(name, value)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

/// Binary operator underlying a compound assignment token.
fn compound_base(operator: &Token) -> TokenType {
    match operator.token_type {
        TokenType::PLUS_EQUAL => TokenType::PLUS,
        TokenType::MINUS_EQUAL => TokenType::MINUS,
        TokenType::STAR_EQUAL => TokenType::STAR,
        TokenType::SLASH_EQUAL => TokenType::SLASH,
        _ => TokenType::PERCENT,
    }
}

fn number_operand(operator: &Token, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(DymondError::runtime(operator, "Operand must be a number.")),
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(DymondError::runtime(operator, "Operands must be numbers.")),
    }
}

/// Apply binary operator `kind`. `operator` is the source token errors are
/// attributed to; for compound assignment it differs from `kind`.
fn binary(kind: &TokenType, operator: &Token, left: Value, right: Value) -> Result<Value> {
    match kind {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::String(a), Value::Number(b)) => Ok(Value::String(a + &format_number(b))),
            (Value::Number(a), Value::String(b)) => Ok(Value::String(format_number(a) + &b)),
            _ => Err(DymondError::runtime(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a - b))
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a * b))
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            if b == 0.0 {
                return Err(DymondError::runtime(operator, "Division by zero error."));
            }
            Ok(Value::Number(a / b))
        }

        // Zero check first, then truncation toward zero.
        TokenType::SLASH_SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            if b == 0.0 {
                return Err(DymondError::runtime(operator, "Division by zero error."));
            }
            let divisor: i64 = b.trunc() as i64;
            if divisor == 0 {
                return Err(DymondError::runtime(operator, "Division by zero error."));
            }
            Ok(Value::Number((a.trunc() as i64).wrapping_div(divisor) as f64))
        }

        TokenType::PERCENT => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a % b))
        }

        TokenType::GREATER
        | TokenType::GREATER_EQUAL
        | TokenType::LESS
        | TokenType::LESS_EQUAL => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => {
                    Some(a.to_lowercase().cmp(&b.to_lowercase()))
                }
                _ => {
                    return Err(DymondError::runtime(
                        operator,
                        "Operands must be two numbers or two strings.",
                    ))
                }
            };

            // NaN compares false under every relation.
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };

            Ok(Value::Bool(match kind {
                TokenType::GREATER => ordering.is_gt(),
                TokenType::GREATER_EQUAL => ordering.is_ge(),
                TokenType::LESS => ordering.is_lt(),
                _ => ordering.is_le(),
            }))
        }

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(DymondError::runtime(
            operator,
            format!("Unknown operator '{}'.", operator.lexeme),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn get_property(object: &Value, name: &Token) -> Result<Value> {
    match object {
        Value::Instance(instance) => instance.get_property(name),
        Value::Callable(Callable::Class(class)) => class.get_property(name),
        _ => Err(DymondError::runtime(name, "Only instances have properties.")),
    }
}

fn set_property(object: &Value, name: &Token, value: Value) -> Result<()> {
    match object {
        Value::Instance(instance) => {
            instance.set_property(name, value);
            Ok(())
        }
        Value::Callable(Callable::Class(class)) => {
            class.set_property(name, value);
            Ok(())
        }
        _ => Err(DymondError::runtime(name, "Only instances have fields.")),
    }
}
