//! Expression evaluation.
//!
//! The binder evaluates initializers, `&default`/`&priority` arguments, and
//! deprecation messages through an [`Evaluator`]. [`ConstEvaluator`] folds
//! constant expressions and calls of constant functions, which covers every
//! expression the binder builds on its own.

use crate::expr::Expr;
use crate::func::FuncError;
use crate::val::{Value, ValueRef};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("cannot resolve identifier `{0}` in a constant context")]
    Unresolved(String),
    #[error("value of kind {0} is not callable")]
    NotCallable(&'static str),
    #[error("function `{0}` returned no value")]
    NoValue(String),
    #[error("function `{name}` failed: {source}")]
    Call {
        name: String,
        #[source]
        source: FuncError,
    },
}

pub trait Evaluator {
    fn evaluate(&self, expr: &Expr) -> Result<ValueRef, EvalError>;
}

/// Evaluates constant expressions only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstEvaluator;

impl Evaluator for ConstEvaluator {
    fn evaluate(&self, expr: &Expr) -> Result<ValueRef, EvalError> {
        match expr {
            Expr::Const(v) => Ok(v.clone()),
            Expr::Name(name) => Err(EvalError::Unresolved(name.clone())),
            Expr::Call { callee, args } => {
                let callee = self.evaluate(callee)?;
                let Value::Func(func) = &*callee else {
                    return Err(EvalError::NotCallable(callee.kind_name()));
                };
                let args = args
                    .iter()
                    .map(|a| self.evaluate(a))
                    .collect::<Result<Vec<_>, _>>()?;
                func.call(&args)
                    .map_err(|source| EvalError::Call {
                        name: func.name().to_string(),
                        source,
                    })?
                    .ok_or_else(|| EvalError::NoValue(func.name().to_string()))
            }
        }
    }
}
