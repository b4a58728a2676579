//! Attributes and attribute sets.
//!
//! There are two kinds of annotations on declarations: the ones here, which
//! modify how an identifier, a table, or a record field is checked,
//! initialized, logged, or expired, and per-instance metadata that the
//! interpreter keeps elsewhere.

use crate::expr::ExprRef;
use crate::ty::TypeRef;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// The tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKind {
    Optional,
    HasDefault,
    Redefinable,
    AddFunc,
    DelFunc,
    ExpireFunc,
    ExpireRead,
    ExpireWrite,
    ExpireCreate,
    RawOutput,
    Priority,
    Group,
    Logged,
    ErrorHandler,
    /// Used by the input framework.
    TypeColumn,
    /// Hidden; set on bindings watched through the notifier.
    Tracked,
    /// Table change tracking, or an option's change handler.
    OnChange,
    Deprecated,
}

/// Whether an attribute kind carries an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Forbidden,
    Required,
    Allowed,
}

impl AttrKind {
    pub const ALL: [AttrKind; 18] = [
        AttrKind::Optional,
        AttrKind::HasDefault,
        AttrKind::Redefinable,
        AttrKind::AddFunc,
        AttrKind::DelFunc,
        AttrKind::ExpireFunc,
        AttrKind::ExpireRead,
        AttrKind::ExpireWrite,
        AttrKind::ExpireCreate,
        AttrKind::RawOutput,
        AttrKind::Priority,
        AttrKind::Group,
        AttrKind::Logged,
        AttrKind::ErrorHandler,
        AttrKind::TypeColumn,
        AttrKind::Tracked,
        AttrKind::OnChange,
        AttrKind::Deprecated,
    ];

    pub fn payload(self) -> Payload {
        match self {
            AttrKind::Optional
            | AttrKind::Redefinable
            | AttrKind::RawOutput
            | AttrKind::Logged
            | AttrKind::ErrorHandler
            | AttrKind::Tracked => Payload::Forbidden,
            AttrKind::Deprecated => Payload::Allowed,
            AttrKind::HasDefault
            | AttrKind::AddFunc
            | AttrKind::DelFunc
            | AttrKind::ExpireFunc
            | AttrKind::ExpireRead
            | AttrKind::ExpireWrite
            | AttrKind::ExpireCreate
            | AttrKind::Priority
            | AttrKind::Group
            | AttrKind::TypeColumn
            | AttrKind::OnChange => Payload::Required,
        }
    }

    /// The attribute as it is spelled in scripts.
    pub fn as_str(self) -> &'static str {
        match self {
            AttrKind::Optional => "&optional",
            AttrKind::HasDefault => "&default",
            AttrKind::Redefinable => "&redef",
            AttrKind::AddFunc => "&add_func",
            AttrKind::DelFunc => "&delete_func",
            AttrKind::ExpireFunc => "&expire_func",
            AttrKind::ExpireRead => "&read_expire",
            AttrKind::ExpireWrite => "&write_expire",
            AttrKind::ExpireCreate => "&create_expire",
            AttrKind::RawOutput => "&raw_output",
            AttrKind::Priority => "&priority",
            AttrKind::Group => "&group",
            AttrKind::Logged => "&log",
            AttrKind::ErrorHandler => "&error_handler",
            AttrKind::TypeColumn => "&type_column",
            AttrKind::Tracked => "&tracked",
            AttrKind::OnChange => "&on_change",
            AttrKind::Deprecated => "&deprecated",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    #[error("{kind} does not take an argument")]
    InvalidArgument { kind: AttrKind },
}

/// A single attribute: a tag plus an optional expression.
#[derive(Debug, Clone)]
pub struct Attr {
    kind: AttrKind,
    expr: Option<ExprRef>,
}

impl Attr {
    pub fn new(kind: AttrKind) -> Self {
        Self { kind, expr: None }
    }

    /// Build an attribute carrying `expr`. Fails for kinds that never take
    /// an argument.
    pub fn with_expr(kind: AttrKind, expr: ExprRef) -> Result<Self, AttrError> {
        if kind.payload() == Payload::Forbidden {
            return Err(AttrError::InvalidArgument { kind });
        }
        Ok(Self {
            kind,
            expr: Some(expr),
        })
    }

    pub fn kind(&self) -> AttrKind {
        self.kind
    }

    pub fn expr(&self) -> Option<&ExprRef> {
        self.expr.as_ref()
    }

    /// Replace the expression, as a redefinition does when it supplies a new
    /// default or priority for an existing attribute.
    pub fn set_expr(&mut self, expr: ExprRef) -> Result<(), AttrError> {
        if self.kind.payload() == Payload::Forbidden {
            return Err(AttrError::InvalidArgument { kind: self.kind });
        }
        self.expr = Some(expr);
        Ok(())
    }
}

impl PartialEq for Attr {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        // Expressions can't be compared for equivalence, so two attributes
        // with expressions are only equal if they share the same one.
        match (&self.expr, &other.expr) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.expr.is_some() {
            write!(f, "=<expr>")?;
        }
        Ok(())
    }
}

pub type AttributesRef = Rc<Attributes>;

/// The attributes of one declaration. At most one attribute per kind.
#[derive(Debug, Clone)]
pub struct Attributes {
    ty: Option<TypeRef>,
    attrs: Vec<Attr>,
    in_record: bool,
    global: bool,
}

impl Attributes {
    pub fn new(ty: Option<TypeRef>, in_record: bool, global: bool) -> Self {
        Self {
            ty,
            attrs: Vec::new(),
            in_record,
            global,
        }
    }

    pub fn from_attrs(
        attrs: impl IntoIterator<Item = Attr>,
        ty: Option<TypeRef>,
        in_record: bool,
        global: bool,
    ) -> Self {
        let mut set = Self::new(ty, in_record, global);
        for attr in attrs {
            set.add(attr);
        }
        set
    }

    /// Add `attr`, replacing any attribute of the same kind.
    ///
    /// `&add_func` and `&delete_func` only mean something on a redefinable
    /// value and imply `&redef`; `&default` outside a global implies
    /// `&optional`.
    pub fn add(&mut self, attr: Attr) {
        let kind = attr.kind();
        self.remove(kind);
        self.attrs.push(attr);

        if matches!(kind, AttrKind::AddFunc | AttrKind::DelFunc) && !self.contains(AttrKind::Redefinable) {
            self.attrs.push(Attr::new(AttrKind::Redefinable));
        }
        if kind == AttrKind::HasDefault && !self.global && !self.contains(AttrKind::Optional) {
            self.attrs.push(Attr::new(AttrKind::Optional));
        }
    }

    /// Add every attribute of `other`, in `other`'s order.
    pub fn merge(&mut self, other: &Attributes) {
        for attr in &other.attrs {
            self.add(attr.clone());
        }
    }

    pub fn find(&self, kind: AttrKind) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.kind() == kind)
    }

    pub fn contains(&self, kind: AttrKind) -> bool {
        self.find(kind).is_some()
    }

    pub fn remove(&mut self, kind: AttrKind) {
        self.attrs.retain(|a| a.kind() != kind);
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn owner_type(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    pub fn in_record(&self) -> bool {
        self.in_record
    }

    pub fn is_global(&self) -> bool {
        self.global
    }
}

/// Set equality: same size, and every attribute has an equal counterpart.
impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.attrs.len() == other.attrs.len()
            && self.attrs.iter().all(|a| other.attrs.iter().any(|b| a == b))
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{attr}")?;
        }
        Ok(())
    }
}
