//! Type representation.
//!
//! Types are immutable once built and shared through [`TypeRef`] handles;
//! identifiers, attribute sets, and record fields all point at the same
//! type objects.

use crate::attr::AttributesRef;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

pub type TypeRef = Rc<Type>;

/// A type in the policy language.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    /// The name the type was declared under, if any.
    pub name: Option<String>,
    /// The specific kind of type.
    pub kind: TypeKind,
}

/// The specific data for each type kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Void,
    Bool,
    Int,
    Count,
    Double,
    Time,
    Interval,
    String,
    Pattern,
    Port,
    Addr,
    Subnet,
    File,
    /// Enumeration; names are listed in ordinal order.
    Enum {
        names: Vec<String>,
    },
    /// Record with named, ordered fields.
    Record {
        fields: IndexMap<String, RecordField>,
    },
    /// Table keyed by `index`. A table without a yield type is a set.
    Table {
        index: Vec<TypeRef>,
        yield_type: Option<TypeRef>,
    },
    Vector {
        elem: TypeRef,
    },
    Func {
        flavor: FuncFlavor,
        params: Vec<TypeRef>,
        yield_type: Option<TypeRef>,
    },
}

/// A record field: its type plus the attributes it was declared with.
///
/// Field attribute sets are shared with every record value built from the
/// record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub ty: TypeRef,
    pub attrs: Option<AttributesRef>,
}

impl RecordField {
    pub fn new(ty: TypeRef) -> Self {
        Self { ty, attrs: None }
    }

    pub fn with_attrs(ty: TypeRef, attrs: AttributesRef) -> Self {
        Self {
            ty,
            attrs: Some(attrs),
        }
    }
}

/// What kind of callable a function type describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncFlavor {
    Function,
    Event,
    Hook,
}

impl Type {
    pub fn new(kind: TypeKind) -> TypeRef {
        Rc::new(Self { name: None, kind })
    }

    pub fn named(name: impl Into<String>, kind: TypeKind) -> TypeRef {
        Rc::new(Self {
            name: Some(name.into()),
            kind,
        })
    }

    pub fn set_of(index: Vec<TypeRef>) -> TypeRef {
        Self::new(TypeKind::Table {
            index,
            yield_type: None,
        })
    }

    pub fn table_of(index: Vec<TypeRef>, yield_type: TypeRef) -> TypeRef {
        Self::new(TypeKind::Table {
            index,
            yield_type: Some(yield_type),
        })
    }

    pub fn vector_of(elem: TypeRef) -> TypeRef {
        Self::new(TypeKind::Vector { elem })
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The keyword the type is spelled with in scripts.
    pub fn tag_name(&self) -> &'static str {
        match &self.kind {
            TypeKind::Any => "any",
            TypeKind::Void => "void",
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::Count => "count",
            TypeKind::Double => "double",
            TypeKind::Time => "time",
            TypeKind::Interval => "interval",
            TypeKind::String => "string",
            TypeKind::Pattern => "pattern",
            TypeKind::Port => "port",
            TypeKind::Addr => "addr",
            TypeKind::Subnet => "subnet",
            TypeKind::File => "file",
            TypeKind::Enum { .. } => "enum",
            TypeKind::Record { .. } => "record",
            TypeKind::Table {
                yield_type: None, ..
            } => "set",
            TypeKind::Table { .. } => "table",
            TypeKind::Vector { .. } => "vector",
            TypeKind::Func { flavor, .. } => match flavor {
                FuncFlavor::Function => "function",
                FuncFlavor::Event => "event",
                FuncFlavor::Hook => "hook",
            },
        }
    }

    /// True for both tables and sets.
    pub fn is_table(&self) -> bool {
        matches!(self.kind, TypeKind::Table { .. })
    }

    pub fn is_set(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Table {
                yield_type: None,
                ..
            }
        )
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, TypeKind::Vector { .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func { .. })
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum { .. })
    }

    /// Look up a record field by name. `None` for non-record types.
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        match &self.kind {
            TypeKind::Record { fields } => fields.get(name),
            _ => None,
        }
    }

    /// Ordinal of an enum name. `None` for non-enum types.
    pub fn enum_ordinal(&self, name: &str) -> Option<u64> {
        match &self.kind {
            TypeKind::Enum { names } => names.iter().position(|n| n == name).map(|p| p as u64),
            _ => None,
        }
    }
}

macro_rules! basic_types {
    ($($ctor:ident => $kind:ident),* $(,)?) => {
        impl Type {
            $(
                pub fn $ctor() -> TypeRef {
                    Self::new(TypeKind::$kind)
                }
            )*
        }
    };
}

basic_types! {
    any => Any,
    void => Void,
    bool => Bool,
    int => Int,
    count => Count,
    double => Double,
    time => Time,
    interval => Interval,
    string => String,
    pattern => Pattern,
    port => Port,
    addr => Addr,
    subnet => Subnet,
    file => File,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.tag_name()),
        }
    }
}
