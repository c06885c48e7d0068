use crate::value::Value;
use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Environments are shared between the call frame that created them and every closure defined
/// inside, so they always live behind an `Rc<RefCell<_>>`.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    enclosing: Option<Env>,
    values: AHashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            enclosing: None,
            values: AHashMap::new(),
        }
    }

    /// A fresh top-level scope, ready to be handed to an evaluation.
    pub fn root() -> Env {
        Rc::new(RefCell::new(Environment::new()))
    }

    pub fn with(enclosing: Env) -> Self {
        Environment {
            enclosing: Some(enclosing),
            values: AHashMap::new(),
        }
    }

    /// Binds `key` in this scope, shadowing any binding of the same name further out.
    pub fn define(&mut self, key: &str, value: Value) {
        self.values.insert(String::from(key), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(val) = self.values.get(key) {
            Some(val.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.as_ref().borrow().get(key)
        } else {
            None
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
            || self
                .enclosing
                .as_ref()
                .map_or(false, |enclosing| enclosing.borrow().contains(key))
    }
}
