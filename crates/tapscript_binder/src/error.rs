//! Binding errors.

use tapscript_types::{AttrError, AttrKind, EvalError};
use thiserror::Error;

/// A recoverable failure of a binding operation, reported to the
/// declaration-processing front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("type clash for `{name}`: {reason}")]
    TypeConflict { name: String, reason: String },
    #[error("cannot redefine `{name}`: {reason}")]
    Redefinition { name: String, reason: String },
    #[error(transparent)]
    InvalidAttribute(#[from] AttrError),
    #[error("{kind} rejected on `{name}`: {reason}")]
    AttributeRejected {
        name: String,
        kind: AttrKind,
        reason: String,
    },
    #[error("change handler `{handler}` of option `{name}` failed: {reason}")]
    OptionHandler {
        name: String,
        handler: String,
        reason: String,
    },
    #[error("`{name}` has no type; a value cannot be bound to it")]
    Untyped { name: String },
    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

/// Why a global lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no identifier named `{0}`")]
    NotFound(String),
    #[error("identifier `{0}` has no type")]
    NoType(String),
    #[error("identifier `{0}` has no value")]
    NoValue(String),
    #[error("identifier `{0}` is not constant")]
    NotConst(String),
    #[error("identifier `{0}` is not a function")]
    NotFunc(String),
}
