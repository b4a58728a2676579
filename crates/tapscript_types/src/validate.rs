//! Attribute legality.
//!
//! Which attribute may appear where is a type-checking concern. The binder
//! asks an [`AttrValidator`] before accepting attributes and reports a
//! rejection to its caller.

use crate::attr::{Attr, AttrKind, Payload};
use crate::ty::TypeRef;

/// Where an attribute is being attached.
#[derive(Debug, Clone, Copy)]
pub struct AttrContext<'a> {
    pub owner_type: Option<&'a TypeRef>,
    pub in_record: bool,
    pub global: bool,
    pub is_option: bool,
}

pub trait AttrValidator {
    fn validate(&self, attr: &Attr, ctx: &AttrContext<'_>) -> Result<(), String>;
}

/// The standard placement rules.
///
/// Type-based rules are skipped while the owner has no type yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAttrValidator;

impl AttrValidator for DefaultAttrValidator {
    fn validate(&self, attr: &Attr, ctx: &AttrContext<'_>) -> Result<(), String> {
        let kind = attr.kind();
        if kind.payload() == Payload::Required && attr.expr().is_none() {
            return Err(format!("{kind} requires an argument"));
        }

        let ty = ctx.owner_type;
        let is_table = ty.map_or(true, |t| t.is_table());
        match kind {
            AttrKind::Optional | AttrKind::TypeColumn if !ctx.in_record => {
                Err(format!("{kind} is only applicable to record fields"))
            }
            AttrKind::HasDefault if !ctx.in_record && !ctx.global => {
                Err(format!("{kind} is only applicable to record fields and globals"))
            }
            AttrKind::Redefinable if !ctx.global => {
                Err(format!("{kind} is only applicable to global identifiers"))
            }
            AttrKind::AddFunc | AttrKind::DelFunc
                if !(is_table || ty.is_some_and(|t| t.is_vector())) =>
            {
                Err(format!("{kind} is only applicable to tables, sets, and vectors"))
            }
            AttrKind::ExpireFunc
            | AttrKind::ExpireRead
            | AttrKind::ExpireWrite
            | AttrKind::ExpireCreate
                if !is_table =>
            {
                Err(format!("{kind} is only applicable to tables and sets"))
            }
            AttrKind::OnChange if !is_table && !ctx.is_option => {
                Err(format!("{kind} is only applicable to tables, sets, and options"))
            }
            AttrKind::Logged if !ctx.in_record && !ty.map_or(true, |t| t.is_record()) => {
                Err(format!("{kind} is only applicable to record fields and record types"))
            }
            AttrKind::ErrorHandler if !ty.map_or(true, |t| t.is_func()) => {
                Err(format!("{kind} is only applicable to events"))
            }
            _ => Ok(()),
        }
    }
}
