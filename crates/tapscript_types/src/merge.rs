//! Aggregate merging for incremental redefinition.
//!
//! `redef x += {...}` and `redef x -= {...}` extend or shrink an aggregate
//! value. Only tables, sets, and vectors can be combined this way.

use crate::val::{Value, ValueRef};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("{0} values cannot be extended or reduced")]
    NotAggregate(&'static str),
    #[error("cannot combine a {new} value with a {existing} value")]
    Mismatch {
        existing: &'static str,
        new: &'static str,
    },
}

pub trait Merger {
    fn merge_add(&self, existing: &Value, new: &Value) -> Result<ValueRef, MergeError>;
    fn merge_remove(&self, existing: &Value, to_remove: &Value) -> Result<ValueRef, MergeError>;
}

/// Union/difference for tables and sets, append/filter for vectors.
///
/// The result keeps the existing value's attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateMerger;

impl Merger for AggregateMerger {
    fn merge_add(&self, existing: &Value, new: &Value) -> Result<ValueRef, MergeError> {
        match (existing, new) {
            (Value::Table(old), Value::Table(add)) => {
                let mut merged = old.clone();
                for (k, v) in add.iter() {
                    merged.insert(k.clone(), v.cloned());
                }
                Ok(Rc::new(Value::Table(merged)))
            }
            (Value::Vector(old), Value::Vector(add)) => {
                let mut merged = old.clone();
                merged.extend(add.iter().cloned());
                Ok(Rc::new(Value::Vector(merged)))
            }
            _ => Err(mismatch(existing, new)),
        }
    }

    fn merge_remove(&self, existing: &Value, to_remove: &Value) -> Result<ValueRef, MergeError> {
        match (existing, to_remove) {
            (Value::Table(old), Value::Table(remove)) => {
                let mut reduced = old.clone();
                for (k, _) in remove.iter() {
                    reduced.remove(k);
                }
                Ok(Rc::new(Value::Table(reduced)))
            }
            (Value::Vector(old), Value::Vector(remove)) => {
                let reduced = old
                    .iter()
                    .filter(|v| !remove.contains(*v))
                    .cloned()
                    .collect();
                Ok(Rc::new(Value::Vector(reduced)))
            }
            _ => Err(mismatch(existing, to_remove)),
        }
    }
}

fn mismatch(existing: &Value, new: &Value) -> MergeError {
    match existing {
        Value::Table(_) | Value::Vector(_) => MergeError::Mismatch {
            existing: existing.kind_name(),
            new: new.kind_name(),
        },
        _ => MergeError::NotAggregate(existing.kind_name()),
    }
}
