//! Published output types.
//!
//! Object fields and union members refer to other types by name only, so
//! mutually recursive message graphs never turn into cyclic ownership.

use protogql_types::{Instance, Scalar, Value};

use crate::binding::FieldBinding;
use crate::error::ResolveError;
use crate::union::UnionDispatch;

// ============================================================================
// Type references
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// Innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::Named(_) => false,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

// ============================================================================
// Objects and unions
// ============================================================================

#[derive(Debug, Clone)]
pub struct ObjectField {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub binding: FieldBinding,
}

impl ObjectField {
    pub fn resolve<'v>(&self, instance: Instance<'v>) -> Result<Option<&'v Value>, ResolveError> {
        self.binding.resolve(instance)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    /// Fully-qualified source message.
    pub message: String,
    pub fields: Vec<ObjectField>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&ObjectField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    /// Fully-qualified message declaring the oneof group.
    pub owner: String,
    pub group: String,
    /// Member object names, deduplicated, in member declaration order.
    pub members: Vec<String>,
    pub dispatch: UnionDispatch,
}

impl UnionType {
    /// Member object name for `value`; `None` when undetermined.
    pub fn resolve_type(&self, value: &Value) -> Option<&str> {
        self.dispatch.resolve_type(value)
    }
}

/// Any published type, as handed to a query engine.
#[derive(Debug, Clone, Copy)]
pub enum OutputType<'s> {
    Scalar(Scalar),
    Object(&'s ObjectType),
    Union(&'s UnionType),
}

impl OutputType<'_> {
    pub fn name(&self) -> &str {
        match self {
            OutputType::Scalar(s) => s.name(),
            OutputType::Object(o) => &o.name,
            OutputType::Union(u) => &u.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_refs_render_sdl_style() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named("Int")));
        assert_eq!(ty.to_string(), "[Int]!");
        assert_eq!(ty.named_type(), "Int");
        assert!(ty.is_non_null());
        assert!(ty.is_list());

        let inner = TypeRef::list(TypeRef::non_null(TypeRef::named("Dessert")));
        assert_eq!(inner.to_string(), "[Dessert!]");
        assert!(!inner.is_non_null());
    }
}
