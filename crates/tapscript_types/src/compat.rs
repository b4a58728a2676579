//! Type compatibility and default values.

use crate::ty::{Type, TypeKind};
use crate::val::{EnumVal, RecordVal, TableVal, Value, ValueRef};
use std::mem::discriminant;
use std::rc::Rc;

/// Answers the type questions the binder has: whether a redeclaration may
/// replace one type with another, and what value a type starts out with.
pub trait TypeOracle {
    fn is_compatible(&self, old: &Type, new: &Type) -> bool;
    fn default_value(&self, ty: &Type) -> Option<ValueRef>;
}

/// Structural compatibility.
///
/// `any` is compatible with everything. Records may gain fields and enums
/// may gain names, but nothing may be dropped; tables, vectors, and
/// functions must agree component-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralTypes;

impl TypeOracle for StructuralTypes {
    fn is_compatible(&self, old: &Type, new: &Type) -> bool {
        match (&old.kind, &new.kind) {
            (TypeKind::Any, _) | (_, TypeKind::Any) => true,
            (TypeKind::Record { fields: old_fields }, TypeKind::Record { fields: new_fields }) => {
                old_fields.iter().all(|(name, field)| {
                    new_fields
                        .get(name)
                        .is_some_and(|f| self.is_compatible(&field.ty, &f.ty))
                })
            }
            (TypeKind::Enum { names: old_names }, TypeKind::Enum { names: new_names }) => {
                old_names.iter().all(|n| new_names.contains(n))
            }
            (
                TypeKind::Table {
                    index: old_index,
                    yield_type: old_yield,
                },
                TypeKind::Table {
                    index: new_index,
                    yield_type: new_yield,
                },
            ) => {
                old_index.len() == new_index.len()
                    && old_index
                        .iter()
                        .zip(new_index)
                        .all(|(a, b)| self.is_compatible(a, b))
                    && self.optional_compatible(old_yield.as_deref(), new_yield.as_deref())
            }
            (TypeKind::Vector { elem: a }, TypeKind::Vector { elem: b }) => self.is_compatible(a, b),
            (
                TypeKind::Func {
                    flavor: old_flavor,
                    params: old_params,
                    yield_type: old_yield,
                },
                TypeKind::Func {
                    flavor: new_flavor,
                    params: new_params,
                    yield_type: new_yield,
                },
            ) => {
                old_flavor == new_flavor
                    && old_params.len() == new_params.len()
                    && old_params
                        .iter()
                        .zip(new_params)
                        .all(|(a, b)| self.is_compatible(a, b))
                    && self.optional_compatible(old_yield.as_deref(), new_yield.as_deref())
            }
            (a, b) => discriminant(a) == discriminant(b),
        }
    }

    fn default_value(&self, ty: &Type) -> Option<ValueRef> {
        let value = match &ty.kind {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Int => Value::Int(0),
            TypeKind::Count => Value::Count(0),
            TypeKind::Double => Value::Double(0.0),
            TypeKind::Time => Value::Time(0.0),
            TypeKind::Interval => Value::Interval(0.0),
            TypeKind::String => Value::String(String::new()),
            TypeKind::Enum { names } => Value::Enum(EnumVal {
                name: names.first()?.clone(),
                ordinal: 0,
            }),
            TypeKind::Table { .. } => Value::Table(TableVal::new()),
            TypeKind::Vector { .. } => Value::Vector(Vec::new()),
            TypeKind::Record { fields } => {
                // Only records whose fields can all be defaulted get a value.
                let mut rec = RecordVal::default();
                for (name, field) in fields {
                    let optional = field
                        .attrs
                        .as_ref()
                        .is_some_and(|a| a.contains(crate::attr::AttrKind::Optional));
                    if optional {
                        continue;
                    }
                    rec.fields.insert(name.clone(), self.default_value(&field.ty)?);
                }
                Value::Record(rec)
            }
            _ => return None,
        };
        Some(Rc::new(value))
    }
}

impl StructuralTypes {
    fn optional_compatible(&self, old: Option<&Type>, new: Option<&Type>) -> bool {
        match (old, new) {
            (None, None) => true,
            (Some(a), Some(b)) => self.is_compatible(a, b),
            _ => false,
        }
    }
}
