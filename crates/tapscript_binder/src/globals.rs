//! The global symbol table.
//!
//! The table owns every module- and global-scope binding for the life of the
//! process. Names are interned; bindings live in an arena and are found by
//! index.
//!
//! Two lookup tiers are offered. `lookup_*` return a [`LookupError`] and are
//! for callers that handle user input. `find_*` are for names the bootstrap
//! sequence guarantees exist: a miss there means the process was set up
//! wrong, and it aborts.

use crate::env::EnvRef;
use crate::error::{BindError, LookupError};
use crate::id::{IdScope, Identifier};
use crate::well_known::{self, WellKnownTypes};
use log::{debug, error, info};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tapscript_core::intern::{InternedString, StringInterner};
use tapscript_core::names;
use tapscript_types::{FuncRef, TypeRef, ValueRef};

#[derive(Debug)]
pub struct GlobalTable {
    env: EnvRef,
    names: StringInterner,
    index: FxHashMap<InternedString, usize>,
    ids: Vec<Identifier>,
    well_known: Option<WellKnownTypes>,
    initialized: bool,
}

impl GlobalTable {
    pub fn new(env: &EnvRef) -> Self {
        Self {
            env: Rc::clone(env),
            names: StringInterner::new(),
            index: FxHashMap::default(),
            ids: Vec::new(),
            well_known: None,
            initialized: false,
        }
    }

    pub fn env(&self) -> &EnvRef {
        &self.env
    }

    /// Populate the well-known bindings. Calling it again does nothing.
    pub fn init(&mut self) -> Result<(), BindError> {
        if self.initialized {
            return Ok(());
        }
        if self.env.options().preload_well_known {
            self.well_known = Some(well_known::install(self)?);
        }
        self.initialized = true;
        info!("global symbol table initialized with {} bindings", self.ids.len());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The well-known types. Fatal before [`init`](Self::init) has run with
    /// preloading enabled.
    pub fn well_known(&self) -> &WellKnownTypes {
        match &self.well_known {
            Some(types) => types,
            None => fatal("well-known types requested before the symbol table was initialized"),
        }
    }

    /// Declare `name`, or return the existing binding. Names qualified with
    /// the global module are stored unqualified.
    pub fn install(&mut self, name: &str, is_export: bool) -> &mut Identifier {
        let name = names::make_full_var_name(names::GLOBAL_MODULE, name);
        let key = self.names.intern(&name);
        let idx = match self.index.get(&key).copied() {
            Some(idx) => idx,
            None => {
                let scope = if names::extract_module_name(&name) == names::GLOBAL_MODULE {
                    IdScope::Global
                } else {
                    IdScope::Module
                };
                debug!("installing global `{}`", name);
                let idx = self.ids.len();
                self.ids.push(Identifier::new(name, scope, is_export, &self.env));
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.ids[idx]
    }

    pub fn find(&self, name: &str) -> Option<&Identifier> {
        self.position(name).map(|idx| &self.ids[idx])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Identifier> {
        self.position(name).map(|idx| &mut self.ids[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Bindings in installation order.
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.ids.iter()
    }

    // ========================================================================
    // Recoverable lookups
    // ========================================================================

    pub fn lookup(&self, name: &str) -> Result<&Identifier, LookupError> {
        self.find(name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }

    pub fn lookup_type(&self, name: &str) -> Result<&TypeRef, LookupError> {
        self.lookup(name)?
            .ty()
            .ok_or_else(|| LookupError::NoType(name.to_string()))
    }

    pub fn lookup_val(&self, name: &str) -> Result<&ValueRef, LookupError> {
        self.lookup(name)?
            .val()
            .ok_or_else(|| LookupError::NoValue(name.to_string()))
    }

    pub fn lookup_const(&self, name: &str) -> Result<&ValueRef, LookupError> {
        let id = self.lookup(name)?;
        if !id.is_const() {
            return Err(LookupError::NotConst(name.to_string()));
        }
        id.val().ok_or_else(|| LookupError::NoValue(name.to_string()))
    }

    pub fn lookup_func(&self, name: &str) -> Result<&FuncRef, LookupError> {
        self.lookup_val(name)?
            .as_func()
            .ok_or_else(|| LookupError::NotFunc(name.to_string()))
    }

    // ========================================================================
    // Bootstrap lookups
    // ========================================================================

    pub fn find_type(&self, name: &str) -> &TypeRef {
        self.lookup_type(name).unwrap_or_else(|err| fatal(&err.to_string()))
    }

    pub fn find_val(&self, name: &str) -> &ValueRef {
        self.lookup_val(name).unwrap_or_else(|err| fatal(&err.to_string()))
    }

    pub fn find_const(&self, name: &str) -> &ValueRef {
        self.lookup_const(name).unwrap_or_else(|err| fatal(&err.to_string()))
    }

    pub fn find_func(&self, name: &str) -> &FuncRef {
        self.lookup_func(name).unwrap_or_else(|err| fatal(&err.to_string()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = self.names.get(names::make_full_var_name(names::GLOBAL_MODULE, name).as_str())?;
        self.index.get(&key).copied()
    }
}

#[cold]
fn fatal(message: &str) -> ! {
    error!("internal error: {}", message);
    panic!("internal error: {message}");
}
