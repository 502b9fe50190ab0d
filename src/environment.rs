use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One scope frame.  Frames are shared (`Rc<RefCell<_>>`) because a closure
/// keeps its defining frame alive after the block or call that created it
/// has finished.
///
/// A binding holding `None` has been declared but never assigned.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Option<Value>>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Shorthand for a fresh shared child frame of `enclosing`.
    pub fn child_of(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    /// Insert or shadow `name` in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), Some(value));
    }

    /// Reserve `name` in this frame without giving it a value yet.
    pub fn define_unassigned(&mut self, name: &str) {
        self.values.insert(name.to_string(), None);
    }

    /// Whether `name` is bound in this frame (not its ancestors).
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Name‑based lookup through the whole chain.  Only used for references
    /// the resolver left unresolved, i.e. globals.
    pub fn get(&self, name: &Token) -> Result<Value> {
        match self.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(unassigned(name)),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    /// Name‑based assignment.  Never declares: the name must already exist
    /// somewhere in the chain.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = Some(value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Walk exactly `distance` parent links from `env`.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next: Option<Rc<RefCell<Environment>>> = current.borrow().enclosing.clone();
            current = next?;
        }

        Some(current)
    }

    /// Read `name` from the frame exactly `distance` hops up.  No searching:
    /// the resolver guarantees the binding lives there.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Result<Value> {
        let frame = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let found: Option<Option<Value>> = frame.borrow().values.get(&name.lexeme).cloned();

        match found {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(unassigned(name)),
            None => Err(undefined(name)),
        }
    }

    /// Overwrite `name` in the frame exactly `distance` hops up.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<()> {
        let frame = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        frame
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), Some(value));
        Ok(())
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn unassigned(name: &Token) -> LoxError {
    LoxError::runtime(
        name,
        format!("Variable '{}' has not been assigned a value.", name.lexeme),
    )
}
