//! Attribute datatype registry.
//!
//! The registry caches which datatypes have been stored under each attribute
//! path. It mirrors the `attribute_datatypes` table and is used to coerce text
//! operands of loose searches into numbers or dates when an attribute has only
//! ever held one of those.

use std::collections::{BTreeSet, HashMap};

use crate::document::codec::{parse_date, parse_number, Datatype};
use crate::types::Value;

/// In-memory cache of attribute datatypes.
#[derive(Debug, Default, Clone)]
pub struct DatatypeRegistry {
    by_attribute: HashMap<String, BTreeSet<Datatype>>,
}

impl DatatypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `attribute` holds a value of `datatype`.
    ///
    /// Returns true if the pair was not known before.
    pub fn register(&mut self, attribute: impl Into<String>, datatype: Datatype) -> bool {
        self.by_attribute
            .entry(attribute.into())
            .or_default()
            .insert(datatype)
    }

    /// Returns every datatype observed for `attribute`.
    pub fn datatypes(&self, attribute: &str) -> Option<&BTreeSet<Datatype>> {
        self.by_attribute.get(attribute)
    }

    /// Returns the datatype if `attribute` has only ever held one.
    pub fn sole_datatype(&self, attribute: &str) -> Option<Datatype> {
        let datatypes = self.by_attribute.get(attribute)?;
        if datatypes.len() == 1 {
            datatypes.iter().next().copied()
        } else {
            None
        }
    }

    /// Coerces a text operand to the attribute's only datatype when it
    /// parses as that type. Other operands are returned unchanged.
    pub fn coerce(&self, attribute: &str, operand: &Value) -> Value {
        let Value::Text(text) = operand else {
            return operand.clone();
        };
        match self.sole_datatype(attribute) {
            Some(Datatype::Number) => parse_number(text)
                .map(Value::Number)
                .unwrap_or_else(|| operand.clone()),
            Some(Datatype::Date) => parse_date(text)
                .map(Value::Date)
                .unwrap_or_else(|| operand.clone()),
            _ => operand.clone(),
        }
    }

    /// Number of registered attributes.
    pub fn len(&self) -> usize {
        self.by_attribute.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_attribute.is_empty()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.by_attribute.clear();
    }
}
