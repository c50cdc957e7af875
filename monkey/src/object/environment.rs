//! Environment for variable bindings

use super::Object;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to an environment
pub type EnvRef = Rc<RefCell<Environment>>;

/// Environment holding variable bindings
///
/// Environments only ever link outward in scope, so the reference-counted
/// chain cannot form a cycle.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: HashMap<String, Object>,
    outer: Option<EnvRef>,
}

impl Environment {
    /// Create a new outermost environment
    pub fn new() -> Self {
        Environment::default()
    }

    /// Create an environment enclosed by `outer`
    pub fn enclosed(outer: EnvRef) -> Self {
        Environment {
            bindings: HashMap::new(),
            outer: Some(outer),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind a name in this scope, shadowing any outer binding
    pub fn define(&mut self, name: String, value: Object) {
        self.bindings.insert(name, value);
    }

    /// Look a name up through the scope chain
    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(outer) = &self.outer {
            outer.borrow().get(name)
        } else {
            None
        }
    }
}

/// Create a child environment from a parent reference
pub fn child_env(outer: &EnvRef) -> EnvRef {
    Environment::enclosed(Rc::clone(outer)).into_ref()
}
