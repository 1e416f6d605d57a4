//! Built-in functions installed into every interpreter's global scope.

use chrono::Utc;
use log::debug;
use rand::Rng;

use crate::callable::{NativeFn, NativeFunction};
use crate::error::{DymondError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{format_number, Value};

/// Register the full built-in library.
pub fn install(interpreter: &mut Interpreter) {
    let natives: [NativeFunction; 10] = [
        native("clock", 0, 0, clock),
        native("print", 1, 2, print),
        native("toString", 1, 1, to_string),
        native("input", 0, 1, input),
        native("toNumber", 1, 1, to_number),
        native("isNumber", 1, 1, is_number),
        native("sqrt", 1, 1, sqrt),
        native("randomInt", 2, 2, random_int),
        native("typeof", 1, 1, type_of),
        native("len", 1, 1, len),
    ];

    for n in natives {
        interpreter.define_native(n);
    }
}

fn native(
    name: &'static str,
    min_arity: usize,
    max_arity: usize,
    func: NativeFn,
) -> NativeFunction {
    NativeFunction {
        name,
        min_arity,
        max_arity,
        func,
    }
}

fn clock(_: &mut Interpreter, _: &Token, _: &[Value]) -> Result<Value> {
    let now = Utc::now();
    let seconds: f64 = now.timestamp_millis() as f64 / 1000.0;
    debug!("clock() -> {}", seconds);
    Ok(Value::Number(seconds))
}

/// `print(value, [end])`; `end` replaces the trailing line break.
fn print(interpreter: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    let end: String = match args.get(1) {
        None => "\n".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(DymondError::runtime(
                token,
                "The line ending passed to print must be a string.",
            ))
        }
    };

    write!(interpreter.output(), "{}{}", args[0], end)?;
    Ok(Value::Nil)
}

fn to_string(_: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(n) => Ok(Value::String(format_number(*n))),
        _ => Err(DymondError::runtime(
            token,
            "The argument passed to toString must be a number.",
        )),
    }
}

/// `input([prompt])`; yields nil once the input source is exhausted.
fn input(interpreter: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    match args.first() {
        None => {}
        Some(Value::String(prompt)) => write!(interpreter.output(), "{}", prompt)?,
        Some(_) => {
            return Err(DymondError::runtime(
                token,
                "The prompt passed to input must be a string.",
            ))
        }
    }

    Ok(match interpreter.read_line()? {
        Some(line) => Value::String(line),
        None => Value::Nil,
    })
}

fn parse_numeral(text: &str) -> Option<f64> {
    let trimmed: &str = text.trim();
    let looks_numeric: bool = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));

    if looks_numeric {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

fn to_number(_: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    let Value::String(text) = &args[0] else {
        return Err(DymondError::runtime(
            token,
            "The argument passed to toNumber must be a string.",
        ));
    };

    parse_numeral(text).map(Value::Number).ok_or_else(|| {
        DymondError::runtime(token, format!("Cannot convert '{}' to a number.", text))
    })
}

fn is_number(_: &mut Interpreter, _: &Token, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(match &args[0] {
        Value::String(text) => parse_numeral(text).is_some(),
        _ => false,
    }))
}

fn sqrt(_: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Number(n) if *n >= 0.0 => Ok(Value::Number(n.sqrt())),
        Value::Number(_) => Err(DymondError::runtime(
            token,
            "Cannot take the square root of a negative number.",
        )),
        _ => Err(DymondError::runtime(
            token,
            "The argument passed to sqrt must be a number.",
        )),
    }
}

/// Inclusive on both ends.
fn random_int(_: &mut Interpreter, token: &Token, args: &[Value]) -> Result<Value> {
    let (Value::Number(low), Value::Number(high)) = (&args[0], &args[1]) else {
        return Err(DymondError::runtime(
            token,
            "The arguments passed to randomInt must be numbers.",
        ));
    };

    let (low, high) = (low.ceil(), high.floor());
    if !(low <= high) {
        return Err(DymondError::runtime(
            token,
            "The range passed to randomInt is empty.",
        ));
    }

    let value: i64 = rand::thread_rng().gen_range(low as i64..=high as i64);
    Ok(Value::Number(value as f64))
}

fn type_of(_: &mut Interpreter, _: &Token, args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].type_name()))
}

fn len(_: &mut Interpreter, _: &Token, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(match &args[0] {
        Value::String(s) => s.chars().count() as f64,
        _ => 0.0,
    }))
}
