//! Type name resolver.
//!
//! Local references (same module as the declaring message) resolve to the
//! declared object of the referenced message. Foreign references resolve, in
//! order, through the per-message overrides, the well-known simple-name table
//! and finally the opaque `ByteString` fallback.

use std::collections::BTreeMap;

use protogql_types::Scalar;

use crate::descriptor::{DescriptorSet, FieldDescriptor, FieldKind, MessageDescriptor};
use crate::error::CompileError;
use crate::options::{CompileOptions, ForeignOverride};
use crate::output::TypeRef;
use crate::scalar::{apply_modifiers, map_scalar};

/// Where a message reference landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    /// An object declared for a message of the same module.
    Local { object: String, message: String },
    /// An object compiled from an inlined foreign message.
    ForeignObject { object: String, message: String },
    /// A foreign message mapped onto a scalar.
    ForeignScalar { scalar: Scalar, message: String },
}

impl ResolvedRef {
    pub fn type_name(&self) -> &str {
        match self {
            ResolvedRef::Local { object, .. } | ResolvedRef::ForeignObject { object, .. } => object,
            ResolvedRef::ForeignScalar { scalar, .. } => scalar.name(),
        }
    }

    /// Fully-qualified referenced message.
    pub fn message(&self) -> &str {
        match self {
            ResolvedRef::Local { message, .. }
            | ResolvedRef::ForeignObject { message, .. }
            | ResolvedRef::ForeignScalar { message, .. } => message,
        }
    }

    pub fn object(&self) -> Option<&str> {
        match self {
            ResolvedRef::Local { object, .. } | ResolvedRef::ForeignObject { object, .. } => Some(object),
            ResolvedRef::ForeignScalar { .. } => None,
        }
    }
}

pub struct TypeResolver<'a> {
    set: &'a DescriptorSet,
    options: &'a CompileOptions,
    /// Fully-qualified message -> declared object name.
    declared: &'a BTreeMap<String, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(
        set: &'a DescriptorSet,
        options: &'a CompileOptions,
        declared: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            set,
            options,
            declared,
        }
    }

    /// Full output type of `field`, modifiers included.
    pub fn resolve_field_type(
        &self,
        declaring: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<TypeRef, CompileError> {
        let base = match field.kind {
            FieldKind::Message => self.resolve_message_ref(declaring, field)?.type_name().to_string(),
            kind => map_scalar(kind)
                .map_err(|unsupported| CompileError::UnsupportedKind {
                    message: declaring.full_name(),
                    field: field.name.clone(),
                    kind: unsupported.0,
                })?
                .name()
                .to_string(),
        };
        Ok(apply_modifiers(TypeRef::Named(base), field.repeated, field.required))
    }

    /// Resolve the message referenced by a `Message`-kind field.
    pub fn resolve_message_ref(
        &self,
        declaring: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<ResolvedRef, CompileError> {
        let type_name = field
            .type_name
            .as_deref()
            .filter(|t| !t.trim_start_matches('.').is_empty())
            .ok_or_else(|| CompileError::MissingTypeReference {
                message: declaring.full_name(),
                field: field.name.clone(),
            })?;
        let target = self
            .set
            .lookup(type_name)
            .ok_or_else(|| CompileError::UnresolvedTypeReference {
                message: declaring.full_name(),
                field: field.name.clone(),
                type_name: type_name.to_string(),
            })?;
        let target_name = target.full_name();

        let excluded = || CompileError::ExcludedTypeReference {
            message: declaring.full_name(),
            field: field.name.clone(),
            type_name: target_name.clone(),
        };

        if target.module == declaring.module {
            let object = self.declared.get(&target_name).ok_or_else(excluded)?;
            return Ok(ResolvedRef::Local {
                object: object.clone(),
                message: target_name.clone(),
            });
        }

        match self.options.overrides.get(&target_name) {
            Some(ForeignOverride::Scalar(scalar)) => Ok(ResolvedRef::ForeignScalar {
                scalar: *scalar,
                message: target_name.clone(),
            }),
            Some(ForeignOverride::Inline) => {
                let object = self.declared.get(&target_name).ok_or_else(excluded)?;
                Ok(ResolvedRef::ForeignObject {
                    object: object.clone(),
                    message: target_name.clone(),
                })
            }
            None => {
                let scalar = match self.options.well_known.get(target.simple_name()) {
                    Some(scalar) => *scalar,
                    None => {
                        tracing::debug!(
                            descriptor = %declaring.full_name(),
                            field = %field.name,
                            foreign = %target_name,
                            "foreign reference falls back to ByteString"
                        );
                        Scalar::ByteString
                    }
                };
                Ok(ResolvedRef::ForeignScalar {
                    scalar,
                    message: target_name.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleDescriptor;

    fn set() -> DescriptorSet {
        DescriptorSet::new(vec![
            ModuleDescriptor::new("m1").message(
                MessageDescriptor::new("m1", &["Order"])
                    .field(FieldDescriptor::message("total", ".m2.Money"))
                    .field(FieldDescriptor::message("placed_at", ".google.protobuf.Timestamp"))
                    .field(FieldDescriptor::message("lines", ".m1.Line").repeated())
                    .field(FieldDescriptor::message("ghost", ".m1.Ghost"))
                    .field(FieldDescriptor::scalar("status", FieldKind::Enum)),
            )
            .message(
                MessageDescriptor::new("m1", &["Line"])
                    .field(FieldDescriptor::scalar("sku", FieldKind::String)),
            ),
            ModuleDescriptor::new("m2").message(
                MessageDescriptor::new("m2", &["Money"])
                    .field(FieldDescriptor::scalar("cents", FieldKind::Int64)),
            ),
            ModuleDescriptor::new("google.protobuf").message(
                MessageDescriptor::new("google.protobuf", &["Timestamp"])
                    .field(FieldDescriptor::scalar("seconds", FieldKind::Int64)),
            ),
        ])
    }

    fn declared() -> BTreeMap<String, String> {
        [("m1.Order", "Order"), ("m1.Line", "Line")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn field<'a>(set: &'a DescriptorSet, name: &str) -> (&'a MessageDescriptor, &'a FieldDescriptor) {
        let order = set.lookup("m1.Order").unwrap();
        (order, order.fields.iter().find(|f| f.name == name).unwrap())
    }

    #[test]
    fn foreign_reference_falls_back_to_byte_string() {
        let set = set();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);
        let (order, total) = field(&set, "total");

        let resolved = resolver.resolve_message_ref(order, total).unwrap();
        assert_eq!(
            resolved,
            ResolvedRef::ForeignScalar {
                scalar: Scalar::ByteString,
                message: "m2.Money".to_string()
            }
        );
        assert_eq!(resolver.resolve_field_type(order, total).unwrap().to_string(), "ByteString");
    }

    #[test]
    fn well_known_foreign_types_map_to_scalars() {
        let set = set();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);
        let (order, placed_at) = field(&set, "placed_at");
        assert_eq!(resolver.resolve_field_type(order, placed_at).unwrap().to_string(), "Timestamp");
    }

    #[test]
    fn overrides_win_over_fallback() {
        let set = set();
        let declared = declared();
        let pinned = CompileOptions::default().with_override("m2.Money", ForeignOverride::Scalar(Scalar::String));
        let resolver = TypeResolver::new(&set, &pinned, &declared);
        let (order, total) = field(&set, "total");
        assert_eq!(resolver.resolve_field_type(order, total).unwrap().to_string(), "String");

        let mut inlined_names = declared.clone();
        inlined_names.insert("m2.Money".to_string(), "M2_Money".to_string());
        let inline = CompileOptions::default().with_override("m2.Money", ForeignOverride::Inline);
        let resolver = TypeResolver::new(&set, &inline, &inlined_names);
        assert_eq!(
            resolver.resolve_message_ref(order, total).unwrap().object(),
            Some("M2_Money")
        );
    }

    #[test]
    fn local_references_use_declared_names() {
        let set = set();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);
        let (order, lines) = field(&set, "lines");
        assert_eq!(resolver.resolve_field_type(order, lines).unwrap().to_string(), "[Line]");
    }

    #[test]
    fn reference_errors() {
        let set = set();
        let options = CompileOptions::default();
        let declared = declared();
        let resolver = TypeResolver::new(&set, &options, &declared);

        let (order, ghost) = field(&set, "ghost");
        assert!(matches!(
            resolver.resolve_field_type(order, ghost),
            Err(CompileError::UnresolvedTypeReference { .. })
        ));

        let (order, status) = field(&set, "status");
        assert!(matches!(
            resolver.resolve_field_type(order, status),
            Err(CompileError::UnsupportedKind { kind: FieldKind::Enum, .. })
        ));

        let untyped = FieldDescriptor::scalar("blob", FieldKind::Message);
        assert!(matches!(
            resolver.resolve_field_type(order, &untyped),
            Err(CompileError::MissingTypeReference { .. })
        ));
    }
}
