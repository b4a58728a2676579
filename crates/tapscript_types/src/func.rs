//! Callable values.
//!
//! Functions are opaque to the binding layer: they are stored as values,
//! registered as option-change handlers, and invoked with a slice of
//! argument values.

use crate::ty::FuncFlavor;
use crate::val::ValueRef;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

pub type FuncRef = Rc<Func>;

type FuncBody = dyn Fn(&[ValueRef]) -> Result<Option<ValueRef>, FuncError>;

/// A failure signalled by a function body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FuncError(pub String);

pub struct Func {
    name: String,
    flavor: FuncFlavor,
    body: Box<FuncBody>,
}

impl Func {
    /// Wrap a native closure as a script-callable function.
    pub fn builtin<F>(name: impl Into<String>, body: F) -> FuncRef
    where
        F: Fn(&[ValueRef]) -> Result<Option<ValueRef>, FuncError> + 'static,
    {
        Self::with_flavor(name, FuncFlavor::Function, body)
    }

    pub fn with_flavor<F>(name: impl Into<String>, flavor: FuncFlavor, body: F) -> FuncRef
    where
        F: Fn(&[ValueRef]) -> Result<Option<ValueRef>, FuncError> + 'static,
    {
        Rc::new(Self {
            name: name.into(),
            flavor,
            body: Box::new(body),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavor(&self) -> FuncFlavor {
        self.flavor
    }

    pub fn call(&self, args: &[ValueRef]) -> Result<Option<ValueRef>, FuncError> {
        (self.body)(args)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("flavor", &self.flavor)
            .finish_non_exhaustive()
    }
}
