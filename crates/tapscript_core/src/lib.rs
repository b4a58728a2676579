//! tapscript_core: Core utilities for the tapscript policy language.
//!
//! Provides name interning, module-qualified name handling, and the small
//! collections the binding layer is built on.

pub mod collections;
pub mod intern;
pub mod names;

// Re-export commonly used types
pub use collections::{OrderedMap, PriorityMap};
pub use intern::{InternedString, StringInterner};
pub use names::GLOBAL_MODULE;
