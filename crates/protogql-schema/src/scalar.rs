//! Scalar type mapper.
//!
//! All integer widths collapse onto the one `Int` output type. How wide
//! values serialize is a runtime concern (see [`protogql_types::IntRange`]).

use protogql_types::Scalar;

use crate::descriptor::FieldKind;
use crate::output::TypeRef;

/// A kind the mapper has no scalar for. Enumerations and groups are
/// unsupported outright; message references belong to the type resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedKind(pub FieldKind);

pub fn map_scalar(kind: FieldKind) -> Result<Scalar, UnsupportedKind> {
    use FieldKind::*;
    match kind {
        Double | Float => Ok(Scalar::Float),
        Int32 | Int64 | Uint32 | Uint64 | Fixed32 | Fixed64 | Sfixed32 | Sfixed64 | Sint32
        | Sint64 => Ok(Scalar::Int),
        Bool => Ok(Scalar::Boolean),
        String => Ok(Scalar::String),
        Bytes => Ok(Scalar::ByteString),
        Message | Enum | Group => Err(UnsupportedKind(kind)),
    }
}

/// Apply the field modifiers: `List` first, then `NonNull`.
pub fn apply_modifiers(base: TypeRef, repeated: bool, required: bool) -> TypeRef {
    let ty = if repeated { TypeRef::list(base) } else { base };
    if required {
        TypeRef::non_null(ty)
    } else {
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_kind() -> impl Strategy<Value = FieldKind> {
        proptest::sample::select(FieldKind::ALL.to_vec())
    }

    #[test]
    fn integer_widths_collapse() {
        for kind in [FieldKind::Int64, FieldKind::Uint32, FieldKind::Sfixed64, FieldKind::Sint32] {
            assert_eq!(map_scalar(kind), Ok(Scalar::Int));
        }
        assert_eq!(map_scalar(FieldKind::Bytes), Ok(Scalar::ByteString));
        assert_eq!(map_scalar(FieldKind::Double), Ok(Scalar::Float));
    }

    #[test]
    fn structural_kinds_are_rejected() {
        assert_eq!(map_scalar(FieldKind::Enum), Err(UnsupportedKind(FieldKind::Enum)));
        assert_eq!(map_scalar(FieldKind::Group), Err(UnsupportedKind(FieldKind::Group)));
    }

    #[test]
    fn repeated_required_int32_is_non_null_list() {
        let base = TypeRef::named(map_scalar(FieldKind::Int32).unwrap().name());
        let ty = apply_modifiers(base, true, true);
        assert_eq!(ty.to_string(), "[Int]!");
        assert_eq!(
            ty,
            TypeRef::non_null(TypeRef::list(TypeRef::named("Int")))
        );
    }

    proptest! {
        #[test]
        fn mapping_is_pure(kind in any_kind()) {
            prop_assert_eq!(map_scalar(kind), map_scalar(kind));
        }

        #[test]
        fn only_structural_kinds_fail(kind in any_kind()) {
            let structural = matches!(kind, FieldKind::Message | FieldKind::Enum | FieldKind::Group);
            prop_assert_eq!(map_scalar(kind).is_err(), structural);
        }

        #[test]
        fn modifiers_compose_list_then_non_null(
            kind in any_kind().prop_filter("scalar kinds", |k| map_scalar(*k).is_ok()),
            repeated in any::<bool>(),
            required in any::<bool>(),
        ) {
            let scalar = map_scalar(kind).unwrap();
            let t = TypeRef::named(scalar.name());
            let expected = match (repeated, required) {
                (true, true) => TypeRef::non_null(TypeRef::list(t.clone())),
                (true, false) => TypeRef::list(t.clone()),
                (false, true) => TypeRef::non_null(t.clone()),
                (false, false) => t.clone(),
            };
            prop_assert_eq!(apply_modifiers(t.clone(), repeated, required), expected);
        }
    }
}
