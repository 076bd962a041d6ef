//! The published schema: an immutable, name-indexed set of output types.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use protogql_types::{Instance, IntRange, Registries, Scalar, SerializeContext, Value};
use serde_json::Value as Json;

use crate::bitflags::FlagLayout;
use crate::error::ResolveError;
use crate::output::{ObjectField, ObjectType, OutputType, TypeRef, UnionType};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Object(usize),
    Union(usize),
}

/// Compiled output types, shared read-only by query engines.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    objects: Vec<ObjectType>,
    unions: Vec<UnionType>,
    index: HashMap<String, Slot>,
    by_message: HashMap<String, usize>,
    flag_layouts: BTreeMap<String, FlagLayout>,
    int_range: IntRange,
}

impl Schema {
    pub(crate) fn new(
        objects: Vec<ObjectType>,
        unions: Vec<UnionType>,
        flag_layouts: BTreeMap<String, FlagLayout>,
        int_range: IntRange,
    ) -> Self {
        let mut index = HashMap::with_capacity(objects.len() + unions.len());
        let mut by_message = HashMap::with_capacity(objects.len());
        for (i, object) in objects.iter().enumerate() {
            index.insert(object.name.clone(), Slot::Object(i));
            by_message.insert(object.message.clone(), i);
        }
        for (i, union) in unions.iter().enumerate() {
            index.insert(union.name.clone(), Slot::Union(i));
        }
        Self {
            objects,
            unions,
            index,
            by_message,
            flag_layouts,
            int_range,
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn get_object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.index.get(name)? {
            Slot::Object(i) => self.objects.get(*i),
            Slot::Union(_) => None,
        }
    }

    pub fn get_union_type(&self, name: &str) -> Option<&UnionType> {
        match self.index.get(name)? {
            Slot::Union(i) => self.unions.get(*i),
            Slot::Object(_) => None,
        }
    }

    /// Any published type by name, scalars included.
    pub fn get_type(&self, name: &str) -> Option<OutputType<'_>> {
        match self.index.get(name) {
            Some(Slot::Object(i)) => self.objects.get(*i).map(OutputType::Object),
            Some(Slot::Union(i)) => self.unions.get(*i).map(OutputType::Union),
            None => Scalar::from_name(name).map(OutputType::Scalar),
        }
    }

    /// Object compiled from the fully-qualified message `message`.
    pub fn object_for_message(&self, message: &str) -> Option<&ObjectType> {
        let cleaned = message.trim_start_matches('.');
        self.by_message.get(cleaned).and_then(|i| self.objects.get(*i))
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectType> {
        self.objects.iter()
    }

    pub fn unions(&self) -> impl Iterator<Item = &UnionType> {
        self.unions.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.unions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.unions.is_empty()
    }

    pub fn flag_layout(&self, message: &str) -> Option<&FlagLayout> {
        self.flag_layouts.get(message.trim_start_matches('.'))
    }

    pub fn int_range(&self) -> IntRange {
        self.int_range
    }

    /// Non-builtin scalars referenced by any field.
    pub fn custom_scalars(&self) -> BTreeSet<Scalar> {
        self.objects
            .iter()
            .flat_map(|o| o.fields.iter())
            .filter_map(|f| Scalar::from_name(f.ty.named_type()))
            .filter(|s| !s.is_builtin())
            .collect()
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn field(&self, object: &str, field: &str) -> Result<(&ObjectType, &ObjectField), ResolveError> {
        let obj = self
            .get_object_type(object)
            .ok_or_else(|| ResolveError::UnknownType(object.to_string()))?;
        let f = obj.field(field).ok_or_else(|| ResolveError::UnknownField {
            object: object.to_string(),
            field: field.to_string(),
        })?;
        Ok((obj, f))
    }

    pub fn resolve_field<'v>(
        &self,
        object: &str,
        field: &str,
        instance: Instance<'v>,
    ) -> Result<Option<&'v Value>, ResolveError> {
        let (obj, f) = self.field(object, field)?;
        f.resolve(instance).map_err(|err| match err {
            ResolveError::FieldNotResolved { field, instance, .. } => ResolveError::FieldNotResolved {
                object: obj.name.clone(),
                field,
                instance,
            },
            other => other,
        })
    }

    /// Member object `value` belongs to.
    pub fn resolve_union(&self, union: &str, value: &Value) -> Result<&ObjectType, ResolveError> {
        let u = self
            .get_union_type(union)
            .ok_or_else(|| ResolveError::UnknownType(union.to_string()))?;
        u.resolve_type(value)
            .and_then(|name| self.get_object_type(name))
            .ok_or_else(|| ResolveError::UnknownUnionVariant {
                union: union.to_string(),
                value: Instance::from_value(value)
                    .map(|i| i.describe())
                    .unwrap_or_else(|| value.kind().to_string()),
            })
    }

    pub fn serialize_context<'r>(&self, registries: &'r Registries) -> SerializeContext<'r> {
        SerializeContext::new(registries).with_int_range(self.int_range)
    }

    pub fn serialize_scalar(&self, scalar: Scalar, value: &Value, registries: &Registries) -> Json {
        scalar.serialize(value, &self.serialize_context(registries))
    }

    /// Resolve every field of `object` on `instance`, recursing through
    /// object and union fields, and serialize the leaves.
    pub fn resolve_all(
        &self,
        object: &str,
        instance: Instance<'_>,
        registries: &Registries,
    ) -> Result<Json, ResolveError> {
        let obj = self
            .get_object_type(object)
            .ok_or_else(|| ResolveError::UnknownType(object.to_string()))?;
        self.materialize(obj, instance, &self.serialize_context(registries))
    }

    fn materialize(
        &self,
        object: &ObjectType,
        instance: Instance<'_>,
        ctx: &SerializeContext<'_>,
    ) -> Result<Json, ResolveError> {
        let mut out = serde_json::Map::with_capacity(object.fields.len());
        for field in &object.fields {
            let json = match self.resolve_field(&object.name, &field.name, instance)? {
                Some(value) => self.materialize_value(object, field, &field.ty, value, ctx)?,
                None => Json::Null,
            };
            out.insert(field.name.clone(), json);
        }
        Ok(Json::Object(out))
    }

    fn materialize_value(
        &self,
        object: &ObjectType,
        field: &ObjectField,
        ty: &TypeRef,
        value: &Value,
        ctx: &SerializeContext<'_>,
    ) -> Result<Json, ResolveError> {
        if value.is_null() {
            return Ok(Json::Null);
        }
        match ty {
            TypeRef::NonNull(inner) => self.materialize_value(object, field, inner, value, ctx),
            TypeRef::List(inner) => match value {
                Value::List(items) => items
                    .iter()
                    .map(|item| self.materialize_value(object, field, inner, item, ctx))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Json::Array),
                _ => Ok(Json::Null),
            },
            TypeRef::Named(name) => {
                if let Some(scalar) = Scalar::from_name(name) {
                    return Ok(scalar.serialize(value, ctx));
                }
                let target = match self.index.get(name.as_str()) {
                    Some(Slot::Union(_)) => self.resolve_union(name, value)?,
                    Some(Slot::Object(i)) => self
                        .objects
                        .get(*i)
                        .ok_or_else(|| ResolveError::UnknownType(name.clone()))?,
                    None => return Err(ResolveError::UnknownType(name.clone())),
                };
                let instance = Instance::from_value(value).ok_or_else(|| ResolveError::NotAnInstance {
                    object: object.name.clone(),
                    field: field.name.clone(),
                    found: value.kind(),
                })?;
                self.materialize(target, instance, ctx)
            }
        }
    }

    // ------------------------------------------------------------------
    // SDL
    // ------------------------------------------------------------------

    /// GraphQL SDL rendering of every published type.
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        for scalar in self.custom_scalars() {
            let _ = writeln!(out, "scalar {scalar}");
        }
        for object in &self.objects {
            if !out.is_empty() {
                out.push('\n');
            }
            write_description(&mut out, "", object.description.as_deref());
            let _ = writeln!(out, "type {} {{", object.name);
            for field in &object.fields {
                write_description(&mut out, "  ", field.description.as_deref());
                let _ = writeln!(out, "  {}: {}", field.name, field.ty);
            }
            out.push_str("}\n");
        }
        for union in &self.unions {
            out.push('\n');
            write_description(&mut out, "", union.description.as_deref());
            let _ = writeln!(out, "union {} = {}", union.name, union.members.join(" | "));
        }
        out
    }
}

fn write_description(out: &mut String, indent: &str, description: Option<&str>) {
    let Some(text) = description.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let escaped = text.replace("\"\"\"", "\\\"\"\"");
    if escaped.contains('\n') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in escaped.lines() {
            let _ = writeln!(out, "{indent}{line}");
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        let _ = writeln!(out, "{indent}\"\"\"{escaped}\"\"\"");
    }
}
