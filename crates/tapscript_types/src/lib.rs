//! tapscript_types: The values, types, and attributes that bindings carry.
//!
//! The binding layer treats types, values, and expressions as opaque data
//! produced by other parts of the interpreter. This crate gives them a
//! concrete shape and defines the collaborator traits (evaluation, type
//! compatibility, attribute legality, aggregate merging) the binder calls
//! through, together with default implementations.

pub mod attr;
pub mod compat;
pub mod eval;
pub mod expr;
pub mod func;
pub mod merge;
pub mod ty;
pub mod validate;
pub mod val;

pub use attr::{Attr, AttrError, AttrKind, Attributes, AttributesRef, Payload};
pub use compat::{StructuralTypes, TypeOracle};
pub use eval::{ConstEvaluator, EvalError, Evaluator};
pub use expr::{Expr, ExprRef};
pub use func::{Func, FuncError, FuncRef};
pub use merge::{AggregateMerger, MergeError, Merger};
pub use ty::{FuncFlavor, RecordField, Type, TypeKind, TypeRef};
pub use validate::{AttrContext, AttrValidator, DefaultAttrValidator};
pub use val::{EnumVal, RecordVal, TableVal, TransportProto, Value, ValueRef};
