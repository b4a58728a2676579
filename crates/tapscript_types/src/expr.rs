//! Expressions as seen by the binding layer.
//!
//! The binder never inspects expressions itself: it stores them in
//! attributes and initializers and hands them to an
//! [`Evaluator`](crate::eval::Evaluator). Attribute equality compares
//! expressions by handle identity, never structurally.

use crate::val::{Value, ValueRef};
use std::rc::Rc;

pub type ExprRef = Rc<Expr>;

#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant value.
    Const(ValueRef),
    /// A reference to a named identifier.
    Name(String),
    /// A call of `callee` with `args`.
    Call { callee: ExprRef, args: Vec<ExprRef> },
}

impl Expr {
    pub fn constant(value: Value) -> ExprRef {
        Rc::new(Expr::Const(Rc::new(value)))
    }

    pub fn value(value: ValueRef) -> ExprRef {
        Rc::new(Expr::Const(value))
    }

    pub fn name(name: impl Into<String>) -> ExprRef {
        Rc::new(Expr::Name(name.into()))
    }

    pub fn call(callee: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expr::Call { callee, args })
    }

    /// The value of a constant expression.
    pub fn as_const(&self) -> Option<&ValueRef> {
        match self {
            Expr::Const(v) => Some(v),
            _ => None,
        }
    }
}
