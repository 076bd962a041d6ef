//! Resolver bindings: how a field's value is read out of an instance.
//!
//! A binding is built once per emitted field and never changes. It handles
//! two instance shapes, in order:
//!
//! 1. a record of the declaring message: read the field directly
//! 2. a oneof wrapper whose payload is a record of the declaring message:
//!    unwrap, then read as in (1)
//!
//! Which wrappers count for (2) is decided at compile time and stored in an
//! [`AccessorTable`]; nothing is inspected by name at query time beyond a
//! table lookup.

use std::collections::BTreeSet;
use std::sync::Arc;

use protogql_types::{Instance, Record, Value, VariantKey};

use crate::error::ResolveError;

/// The oneof arms whose payload type is a given message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessorTable {
    keys: BTreeSet<VariantKey>,
}

impl AccessorTable {
    pub fn new(keys: impl IntoIterator<Item = VariantKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, key: VariantKey) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: &VariantKey) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FieldBinding {
    /// Fully-qualified declaring message.
    message: String,
    field: String,
    /// Shared by every binding of the same declaring message.
    accessors: Arc<AccessorTable>,
}

impl FieldBinding {
    pub fn new(message: impl Into<String>, field: impl Into<String>, accessors: Arc<AccessorTable>) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
            accessors,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn accessors(&self) -> &AccessorTable {
        &self.accessors
    }

    /// Read the field from `instance`.
    ///
    /// `Ok(None)` is a legitimate null: the field, or the wrapper's payload,
    /// is absent. `Err(FieldNotResolved)` means the instance is neither shape
    /// this binding was built for.
    pub fn resolve<'v>(&self, instance: Instance<'v>) -> Result<Option<&'v Value>, ResolveError> {
        match instance {
            Instance::Record(record) if record.message == self.message => Ok(self.read(record)),
            Instance::Variant(variant) => {
                let key = VariantKey::new(variant.owner.as_str(), variant.member.as_str());
                if !self.accessors.contains(&key) {
                    return Err(self.not_resolved(instance));
                }
                match variant.payload() {
                    Some(payload) if payload.message == self.message => Ok(self.read(payload)),
                    // wrapper drifted from its declared payload type
                    Some(_) => Err(self.not_resolved(instance)),
                    None => Ok(None),
                }
            }
            Instance::Record(_) => Err(self.not_resolved(instance)),
        }
    }

    fn read<'v>(&self, record: &'v Record) -> Option<&'v Value> {
        record.get(&self.field)
    }

    fn not_resolved(&self, instance: Instance<'_>) -> ResolveError {
        tracing::debug!(
            descriptor = %self.message,
            field = %self.field,
            instance = %instance.describe(),
            "binding does not match instance shape"
        );
        ResolveError::FieldNotResolved {
            object: self.message.clone(),
            field: self.field.clone(),
            instance: instance.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protogql_types::Variant;

    fn dessert() -> Record {
        Record::new("menu.Dessert")
            .with("name", "coolwhip")
            .with("sweetness", 9)
    }

    fn binding(field: &str) -> FieldBinding {
        let table = AccessorTable::new([VariantKey::new("menu.LineItem", "dessert")]);
        FieldBinding::new("menu.Dessert", field, Arc::new(table))
    }

    #[test]
    fn reads_declaring_record_directly() {
        let rec = dessert();
        let got = binding("name").resolve(Instance::Record(&rec)).unwrap();
        assert_eq!(got.and_then(Value::as_str), Some("coolwhip"));
    }

    #[test]
    fn absent_field_is_null_found() {
        let rec = Record::new("menu.Dessert").with("topping", Value::Null);
        assert_eq!(binding("topping").resolve(Instance::Record(&rec)), Ok(None));
        assert_eq!(binding("garnish").resolve(Instance::Record(&rec)), Ok(None));
    }

    #[test]
    fn unwraps_registered_wrapper() {
        let wrapper = Variant::new("menu.LineItem", "dessert", dessert());
        let got = binding("sweetness").resolve(Instance::Variant(&wrapper)).unwrap();
        assert_eq!(got, Some(&Value::Int(9)));
    }

    #[test]
    fn empty_wrapper_is_null_found() {
        let wrapper = Variant::empty("menu.LineItem", "dessert");
        assert_eq!(binding("name").resolve(Instance::Variant(&wrapper)), Ok(None));
    }

    #[test]
    fn foreign_shapes_are_not_resolved() {
        let lunch = Record::new("menu.Lunch").with("name", "sandwich");
        let err = binding("name").resolve(Instance::Record(&lunch)).unwrap_err();
        assert!(matches!(err, ResolveError::FieldNotResolved { ref field, .. } if field == "name"));

        let other = Variant::new("menu.LineItem", "lunch", lunch.clone());
        assert!(binding("name").resolve(Instance::Variant(&other)).is_err());

        let drifted = Variant::new("menu.LineItem", "dessert", lunch);
        assert!(binding("name").resolve(Instance::Variant(&drifted)).is_err());
    }
}
