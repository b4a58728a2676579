//! Function frames and module scopes.
//!
//! A scope owns the bindings declared in it; they are dropped with it.
//! Bindings in a function frame get consecutive frame offsets in
//! declaration order.

use crate::env::EnvRef;
use crate::id::{IdScope, Identifier};
use std::rc::Rc;
use tapscript_core::collections::OrderedMap;
use tapscript_core::names;

#[derive(Debug)]
pub struct Scope {
    module: String,
    kind: IdScope,
    ids: OrderedMap<String, Identifier>,
    next_offset: usize,
    env: EnvRef,
}

impl Scope {
    /// A function frame inside `module`.
    pub fn function(module: impl Into<String>, env: &EnvRef) -> Self {
        Self::new(module.into(), IdScope::Local, env)
    }

    /// The module-level scope of `module`.
    pub fn module(module: impl Into<String>, env: &EnvRef) -> Self {
        Self::new(module.into(), IdScope::Module, env)
    }

    fn new(module: String, kind: IdScope, env: &EnvRef) -> Self {
        Self {
            module,
            kind,
            ids: OrderedMap::new(),
            next_offset: 0,
            env: Rc::clone(env),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn kind(&self) -> IdScope {
        self.kind
    }

    /// Declare `name` in this scope, or return the existing binding.
    ///
    /// Module-level names are qualified with the module; locals are not.
    pub fn install(&mut self, name: &str, is_export: bool) -> &mut Identifier {
        let key = self.key(name);
        let kind = self.kind;
        let env = &self.env;
        let (id, created) = self
            .ids
            .get_or_insert_with(key.clone(), || Identifier::new(key, kind, is_export, env));
        if created && kind == IdScope::Local {
            id.set_offset(self.next_offset);
            self.next_offset += 1;
        }
        id
    }

    pub fn lookup(&self, name: &str) -> Option<&Identifier> {
        self.ids.get(&self.key(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Identifier> {
        let key = self.key(name);
        self.ids.get_mut(&key)
    }

    /// Number of slots a function frame needs.
    pub fn frame_size(&self) -> usize {
        self.next_offset
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.ids.values()
    }

    pub fn exported(&self) -> impl Iterator<Item = &Identifier> {
        self.iter().filter(|id| id.is_export())
    }

    fn key(&self, name: &str) -> String {
        match self.kind {
            IdScope::Local => name.to_string(),
            IdScope::Module | IdScope::Global => names::make_full_var_name(&self.module, name),
        }
    }
}
