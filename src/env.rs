use std::collections::HashMap;
use std::rc::Rc;

use crate::ty::Type;

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id {
    pub name: String,
    pub ty: Type,
    /// Byte offset of the variable's storage.
    pub offset: usize,
}

impl Id {
    pub fn new<N: Into<String>>(name: N, ty: Type, offset: usize) -> Self {
        Self { name: name.into(), ty, offset }
    }
}

#[derive(Debug, Default)]
struct Scope {
    table: HashMap<String, Rc<Id>>,
    /// Offset accumulator value when the scope was opened.
    base: usize,
}

/// A stack-based symbol table: one frame per open block.
///
/// Frames are pushed on block entry and popped on block exit, so no scope
/// outlives the block that opened it.
#[derive(Debug, Default)]
pub struct Env {
    scopes: Vec<Scope>,
}

impl Env {
    /// An environment with no open scope.
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push(&mut self, base: usize) {
        self.scopes.push(Scope { table: HashMap::new(), base });
    }

    /// Closes the innermost scope and returns the offset it was opened at.
    pub fn pop(&mut self) -> Option<usize> {
        self.scopes.pop().map(|s| s.base)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Inserts into the innermost scope only, replacing a same-named entry of
    /// that scope. Returns the replaced entry. Without an open scope a global one
    /// is opened first.
    pub fn put(&mut self, name: &str, id: Rc<Id>) -> Option<Rc<Id>> {
        if self.scopes.is_empty() {
            self.push(0);
        }
        self.scopes.last_mut().and_then(|scope| scope.table.insert(name.to_string(), id))
    }

    /// Searches from the innermost scope outward; the first match wins.
    pub fn get(&self, name: &str) -> Option<Rc<Id>> {
        self.scopes.iter().rev().find_map(|scope| scope.table.get(name).cloned())
    }
}
