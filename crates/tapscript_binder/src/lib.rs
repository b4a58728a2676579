//! tapscript_binder: Identifier bindings and the global symbol table.
//!
//! Every named entity of a policy script (global and local variables, type
//! names, enum constants, functions, runtime options) is an [`Identifier`]
//! carrying its scope, type, current value, and attributes. This crate
//! implements:
//! - Redefinition rules (full replacement, `+=` / `-=` merging)
//! - Attribute attachment, merging, and value reconciliation
//! - Deprecation markers and warnings
//! - Option-change handlers dispatched by priority
//! - Change notification for external observers
//! - Function frames and module scopes
//! - The global symbol table and its well-known bootstrap entries

mod env;
mod error;
mod globals;
mod id;
mod notifier;
mod scope;
mod well_known;

pub use env::{BindingEnv, EnvRef};
pub use error::{BindError, LookupError};
pub use globals::GlobalTable;
pub use id::{IdFlags, IdScope, Identifier, InitClass};
pub use notifier::{NotifierRegistry, NotifyError, Receiver, SubscriptionId};
pub use scope::Scope;
pub use well_known::WellKnownTypes;
