//! Object schema builder.
//!
//! One object per message: plain fields first, in declaration order, then
//! one union-typed field per oneof group, in group order. A group's member
//! fields never appear on the object individually.

use std::sync::Arc;

use crate::binding::{AccessorTable, FieldBinding};
use crate::descriptor::MessageDescriptor;
use crate::error::CompileError;
use crate::oneof::OneofGroup;
use crate::output::{ObjectField, ObjectType, TypeRef, UnionType};
use crate::resolve::TypeResolver;
use crate::union::build_union;

/// An object plus the unions its oneof groups produced.
#[derive(Debug, Clone)]
pub struct BuiltObject {
    pub object: ObjectType,
    pub unions: Vec<UnionType>,
}

/// Build the object for `message`. `names` is the object name plus the
/// prefix its unions are named with.
pub fn build_object(
    resolver: &TypeResolver<'_>,
    message: &MessageDescriptor,
    (object_name, union_prefix): (&str, &str),
    groups: &[OneofGroup<'_>],
    accessors: Arc<AccessorTable>,
) -> Result<BuiltObject, Vec<CompileError>> {
    let full_name = message.full_name();
    let mut fields = Vec::with_capacity(message.fields.len());
    let mut unions = Vec::with_capacity(groups.len());
    let mut errors = Vec::new();

    for field in message.fields.iter().filter(|f| f.oneof_index.is_none()) {
        match resolver.resolve_field_type(message, field) {
            Ok(ty) => fields.push(ObjectField {
                name: field.name.clone(),
                description: field.description.clone(),
                ty,
                binding: FieldBinding::new(full_name.as_str(), field.name.as_str(), accessors.clone()),
            }),
            Err(err) => errors.push(err),
        }
    }

    for group in groups {
        match build_union(resolver, union_prefix, group) {
            Ok(union) => {
                fields.push(ObjectField {
                    name: group.name.to_string(),
                    description: group.description.map(str::to_string),
                    ty: TypeRef::named(union.name.as_str()),
                    binding: FieldBinding::new(full_name.as_str(), group.name, accessors.clone()),
                });
                unions.push(union);
            }
            Err(errs) => errors.extend(errs),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(BuiltObject {
        object: ObjectType {
            name: object_name.to_string(),
            description: message.description.clone(),
            message: full_name,
            fields,
        },
        unions,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::descriptor::{DescriptorSet, FieldDescriptor, FieldKind, ModuleDescriptor, OneofDecl};
    use crate::oneof::collect_groups;
    use crate::options::CompileOptions;

    fn menu() -> DescriptorSet {
        DescriptorSet::new(vec![ModuleDescriptor::new("menu")
            .message(
                MessageDescriptor::new("menu", &["Lunch"])
                    .field(FieldDescriptor::scalar("name", FieldKind::String))
                    .field(FieldDescriptor::scalar("description", FieldKind::Bytes)),
            )
            .message(
                MessageDescriptor::new("menu", &["Dessert"])
                    .field(FieldDescriptor::scalar("name", FieldKind::String))
                    .field(FieldDescriptor::scalar("sweetness", FieldKind::Int32)),
            )
            .message(
                MessageDescriptor::new("menu", &["LineItem"])
                    .describe("one line of an order")
                    .oneof(OneofDecl::new("dish"))
                    .field(FieldDescriptor::message("lunch", ".menu.Lunch").in_oneof(0))
                    .field(FieldDescriptor::message("dessert", ".menu.Dessert").in_oneof(0))
                    .field(FieldDescriptor::scalar("price_cents", FieldKind::Int32).required())
                    .field(FieldDescriptor::scalar("status", FieldKind::Enum)),
            )])
    }

    fn declared() -> BTreeMap<String, String> {
        [("menu.Lunch", "Lunch"), ("menu.Dessert", "Dessert"), ("menu.LineItem", "LineItem")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn plain_fields_then_one_union_field_per_group() {
        let set = menu();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);

        let mut line_item = set.lookup("menu.LineItem").unwrap().clone();
        line_item.fields.retain(|f| f.name != "status");
        let groups = collect_groups(&line_item).unwrap();
        let built = build_object(&resolver, &line_item, ("LineItem", "LineItem"), &groups, Arc::default()).unwrap();

        let names: Vec<_> = built.object.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["price_cents", "dish"]);
        assert_eq!(built.object.field("price_cents").unwrap().ty.to_string(), "Int!");
        assert_eq!(built.object.field("dish").unwrap().ty.to_string(), "LineItemDish");
        assert_eq!(built.object.description.as_deref(), Some("one line of an order"));

        assert_eq!(built.unions.len(), 1);
        assert_eq!(built.unions[0].members, vec!["Lunch", "Dessert"]);
    }

    #[test]
    fn every_field_error_is_reported() {
        let set = menu();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);

        let mut line_item = set.lookup("menu.LineItem").unwrap().clone();
        line_item
            .fields
            .push(FieldDescriptor::scalar("legacy", FieldKind::Group));
        let groups = collect_groups(&line_item).unwrap();
        let errors = build_object(&resolver, &line_item, ("LineItem", "LineItem"), &groups, Arc::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, CompileError::UnsupportedKind { .. })));
    }
}
