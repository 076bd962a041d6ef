//! Union type-switch: which member object a polymorphic value is.

use std::collections::BTreeMap;

use protogql_types::{Instance, Value, VariantKey};

use crate::error::CompileError;
use crate::naming::union_name;
use crate::oneof::OneofGroup;
use crate::output::UnionType;
use crate::resolve::TypeResolver;

/// Dispatch table for one oneof group.
///
/// Wrappers dispatch by their `(owner, member)` identity. A bare payload
/// record is also accepted and dispatches by its message name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionDispatch {
    by_variant: BTreeMap<VariantKey, String>,
    by_payload: BTreeMap<String, String>,
}

impl UnionDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate the wrapper `key`, carrying a `payload_message` record, with
    /// the member object `object`.
    pub fn insert(&mut self, key: VariantKey, payload_message: impl Into<String>, object: impl Into<String>) {
        let object = object.into();
        self.by_payload
            .entry(payload_message.into())
            .or_insert_with(|| object.clone());
        self.by_variant.insert(key, object);
    }

    pub fn variants(&self) -> impl Iterator<Item = (&VariantKey, &str)> {
        self.by_variant.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_variant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_variant.is_empty()
    }

    /// Object name for `instance`, or `None` when it matches no member.
    pub fn resolve_instance(&self, instance: Instance<'_>) -> Option<&str> {
        let hit = match instance {
            Instance::Variant(v) => self
                .by_variant
                .get(&VariantKey::new(v.owner.as_str(), v.member.as_str())),
            Instance::Record(r) => self.by_payload.get(&r.message),
        };
        if hit.is_none() {
            tracing::debug!(instance = %instance.describe(), "unknown union variant");
        }
        hit.map(String::as_str)
    }

    pub fn resolve_type(&self, value: &Value) -> Option<&str> {
        Instance::from_value(value).and_then(|i| self.resolve_instance(i))
    }
}

/// Build the union type for one oneof group. Its name is `union_prefix`
/// followed by the group name.
///
/// Members resolve to objects in declaration order; two members carrying the
/// same payload type share one member object but keep separate dispatch
/// entries.
pub fn build_union(
    resolver: &TypeResolver<'_>,
    union_prefix: &str,
    group: &OneofGroup<'_>,
) -> Result<UnionType, Vec<CompileError>> {
    let owner = group.owner.full_name();
    let mut dispatch = UnionDispatch::new();
    let mut members: Vec<String> = Vec::new();
    let mut errors = Vec::new();

    for field in &group.members {
        let resolved = match resolver.resolve_message_ref(group.owner, field) {
            Ok(resolved) => resolved,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        let Some(object) = resolved.object() else {
            errors.push(CompileError::InvalidOneofMember {
                message: owner.clone(),
                group: group.name.to_string(),
                field: field.name.clone(),
                reason: format!(
                    "`{}` maps to scalar `{}`, union members must be objects",
                    resolved.message(),
                    resolved.type_name()
                ),
            });
            continue;
        };
        dispatch.insert(
            VariantKey::new(owner.as_str(), field.name.as_str()),
            resolved.message(),
            object,
        );
        if !members.iter().any(|m| m == object) {
            members.push(object.to_string());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(UnionType {
        name: union_name(union_prefix, group.name),
        description: group.description.map(str::to_string),
        owner,
        group: group.name.to_string(),
        members,
        dispatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use protogql_types::{Record, Variant};

    fn dish() -> UnionDispatch {
        let mut d = UnionDispatch::new();
        d.insert(VariantKey::new("menu.LineItem", "lunch"), "menu.Lunch", "Lunch");
        d.insert(VariantKey::new("menu.LineItem", "dessert"), "menu.Dessert", "Dessert");
        d
    }

    #[test]
    fn wrappers_dispatch_by_identity() {
        let d = dish();
        let v: Value = Variant::new("menu.LineItem", "dessert", Record::new("menu.Dessert")).into();
        assert_eq!(d.resolve_type(&v), Some("Dessert"));
        let empty: Value = Variant::empty("menu.LineItem", "lunch").into();
        assert_eq!(d.resolve_type(&empty), Some("Lunch"));
    }

    #[test]
    fn bare_payloads_dispatch_by_message() {
        let d = dish();
        let v: Value = Record::new("menu.Lunch").into();
        assert_eq!(d.resolve_type(&v), Some("Lunch"));
    }

    #[test]
    fn unknown_variants_yield_none() {
        let d = dish();
        let drifted: Value = Variant::empty("menu.LineItem", "drink").into();
        assert_eq!(d.resolve_type(&drifted), None);
        assert_eq!(d.resolve_type(&Value::Int(3)), None);
        assert_eq!(d.resolve_type(&Record::new("menu.Drink").into()), None);
    }
}
