//! Primitive argument bag

use super::block::{Field, Mutation, VARIABLE_FIELD};
use super::values::Value;
use indexmap::IndexMap;

/// Arguments handed to a primitive: field values, evaluated inputs, and
/// the block's structural metadata under its own typed slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
    mutation: Option<Mutation>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the bag from a block's fields. A variable reference field
    /// contributes the referenced variable's id, not its literal.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a String, &'a Field)>) -> Self {
        let mut args = Self::new();
        for (name, field) in fields {
            let value = if name == VARIABLE_FIELD {
                match &field.id {
                    Some(id) => Value::String(id.clone()),
                    None => field.value.clone(),
                }
            } else {
                field.value.clone()
            };
            args.values.insert(name.clone(), value);
        }
        args
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of `insert`, handy when calling primitives directly
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Numeric view of an argument; missing arguments read as 0
    pub fn number(&self, name: &str) -> f64 {
        self.values.get(name).map_or(0.0, Value::to_number)
    }

    /// Text view of an argument; missing arguments read as ""
    pub fn string(&self, name: &str) -> String {
        self.values
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn set_mutation(&mut self, mutation: Mutation) {
        self.mutation = Some(mutation);
    }

    pub fn mutation(&self) -> Option<&Mutation> {
        self.mutation.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
