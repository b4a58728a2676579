//! Runtime values.
//!
//! Values are shared through [`ValueRef`] handles. A binding that changes
//! value swaps in a new handle; values themselves are never mutated while
//! shared.

use crate::attr::AttributesRef;
use crate::func::FuncRef;
use indexmap::IndexMap;
use std::fmt;
use std::net::IpAddr;
use std::rc::Rc;

pub type ValueRef = Rc<Value>;

/// Transport protocol of a port value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProto {
    Unknown,
    Tcp,
    Udp,
    Icmp,
}

impl TransportProto {
    /// Enum constant names, in ordinal order.
    pub const NAMES: [&'static str; 4] = ["unknown_transport", "tcp", "udp", "icmp"];

    pub fn as_str(self) -> &'static str {
        Self::NAMES[self as usize]
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Count(u64),
    Double(f64),
    String(String),
    Time(f64),
    Interval(f64),
    Addr(IpAddr),
    Port(u16, TransportProto),
    Enum(EnumVal),
    Vector(Vec<ValueRef>),
    Table(TableVal),
    Record(RecordVal),
    Func(FuncRef),
}

/// An enum constant: its name and ordinal within the enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumVal {
    pub name: String,
    pub ordinal: u64,
}

/// A table or set value.
///
/// Sets store `None` yields. The attribute set of the binding that holds
/// the table travels with it, so `&default`, `&on_change`, and expiration
/// settings are visible to whoever reads the table.
#[derive(Debug, Clone, Default)]
pub struct TableVal {
    entries: Vec<(ValueRef, Option<ValueRef>)>,
    attrs: Option<AttributesRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordVal {
    pub fields: IndexMap<String, ValueRef>,
}

impl Value {
    pub fn string(s: impl Into<String>) -> ValueRef {
        Rc::new(Value::String(s.into()))
    }

    pub fn count(n: u64) -> ValueRef {
        Rc::new(Value::Count(n))
    }

    pub fn int(n: i64) -> ValueRef {
        Rc::new(Value::Int(n))
    }

    pub fn set_of(members: impl IntoIterator<Item = ValueRef>) -> ValueRef {
        let mut table = TableVal::new();
        for m in members {
            table.insert(m, None);
        }
        Rc::new(Value::Table(table))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of `Int` and `Count` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Count(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncRef> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableVal> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Short name of the value's runtime kind, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Count(_) => "count",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Time(_) => "time",
            Value::Interval(_) => "interval",
            Value::Addr(_) => "addr",
            Value::Port(..) => "port",
            Value::Enum(_) => "enum",
            Value::Vector(_) => "vector",
            Value::Table(_) => "table",
            Value::Record(_) => "record",
            Value::Func(_) => "func",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Count(a), Value::Count(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Interval(a), Value::Interval(b)) => a == b,
            (Value::Addr(a), Value::Addr(b)) => a == b,
            (Value::Port(a, pa), Value::Port(b, pb)) => a == b && pa == pb,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            // Functions compare by identity.
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Count(n) => write!(f, "{n}"),
            Value::Double(d) | Value::Time(d) | Value::Interval(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Addr(a) => write!(f, "{a}"),
            Value::Port(n, proto) => write!(f, "{n}/{}", proto.as_str()),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Table(t) => {
                write!(f, "{{")?;
                for (i, (k, v)) in t.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Some(v) => write!(f, "[{k}] = {v}")?,
                        None => write!(f, "{k}")?,
                    }
                }
                write!(f, "}}")
            }
            Value::Record(r) => {
                write!(f, "[")?;
                for (i, (name, v)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={v}")?;
                }
                write!(f, "]")
            }
            Value::Func(func) => write!(f, "{}", func.name()),
        }
    }
}

impl TableVal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `key`.
    pub fn insert(&mut self, key: ValueRef, yield_val: Option<ValueRef>) {
        match self.entries.iter_mut().find(|(k, _)| **k == *key) {
            Some(entry) => entry.1 = yield_val,
            None => self.entries.push((key, yield_val)),
        }
    }

    /// Remove `key`; returns whether it was present.
    pub fn remove(&mut self, key: &Value) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| **k != *key);
        self.entries.len() != before
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.entries.iter().any(|(k, _)| **k == *key)
    }

    pub fn get(&self, key: &Value) -> Option<&ValueRef> {
        self.entries
            .iter()
            .find(|(k, _)| **k == *key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValueRef, Option<&ValueRef>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attrs(&self) -> Option<&AttributesRef> {
        self.attrs.as_ref()
    }

    pub fn set_attrs(&mut self, attrs: Option<AttributesRef>) {
        self.attrs = attrs;
    }
}

/// Tables compare by content; entry order and attributes are ignored.
impl PartialEq for TableVal {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(k, v)| {
                other
                    .entries
                    .iter()
                    .any(|(ok, ov)| **ok == **k && ov == v)
            })
    }
}
