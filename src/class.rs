use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, Function};
use crate::error::{DymondError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Anything `object.name` can be read from or written to.
///
/// Instances expose their fields and instance methods; a class exposes its
/// own fields and its static methods.
pub trait Receiver {
    fn get_property(self: &Rc<Self>, name: &Token) -> Result<Value>;

    fn set_property(&self, name: &Token, value: Value);
}

pub struct Class {
    pub name: String,
    superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
    static_methods: HashMap<String, Rc<Function>>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
        static_methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Class {
            name: name.to_string(),
            superclass,
            methods,
            static_methods,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Instance method lookup, walking the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// Static method lookup, walking the superclass chain.
    pub fn find_static_method(&self, name: &str) -> Option<Rc<Function>> {
        self.static_methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_static_method(name))
        })
    }

    pub fn min_arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.min_arity())
    }

    pub fn max_arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.max_arity())
    }

    /// Construct a fresh instance and run `init` on it, if there is one.
    pub fn instantiate(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance: Value = Value::Instance(Rc::new(Instance::new(class.clone())));

        if let Some(init) = class.find_method("init") {
            let bound: Rc<Function> = Rc::new(init.bind(instance.clone()));
            Callable::Function(bound).call(interpreter, arguments, paren)?;
        }

        Ok(instance)
    }
}

impl Receiver for Class {
    fn get_property(self: &Rc<Self>, name: &Token) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.find_static_method(&name.lexeme) {
            let receiver: Value = Value::Callable(Callable::Class(self.clone()));
            return Ok(Value::Callable(Callable::Function(Rc::new(method.bind(receiver)))));
        }

        if self.find_method(&name.lexeme).is_some() {
            return Err(DymondError::runtime(
                name,
                format!(
                    "Cannot call non-static method '{}' statically. You must create an instance and call it from the instance.",
                    name.lexeme
                ),
            ));
        }

        Err(DymondError::runtime(
            name,
            format!("Undefined static method '{}'.", name.lexeme),
        ))
    }

    fn set_property(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class").field("name", &self.name).finish()
    }
}

// ───── Instances ─────

pub struct Instance {
    class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }
}

impl Receiver for Instance {
    /// Fields shadow methods. Methods come back bound to this instance.
    fn get_property(self: &Rc<Self>, name: &Token) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            let receiver: Value = Value::Instance(self.clone());
            return Ok(Value::Callable(Callable::Function(Rc::new(method.bind(receiver)))));
        }

        if self.class.find_static_method(&name.lexeme).is_some() {
            return Err(DymondError::runtime(
                name,
                format!(
                    "Cannot call static method '{}' non-statically. You must call it from the class itself.",
                    name.lexeme
                ),
            ));
        }

        Err(DymondError::runtime(
            name,
            format!("Undefined method '{}'.", name.lexeme),
        ))
    }

    fn set_property(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class.name)
    }
}
