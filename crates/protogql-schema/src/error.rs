//! Compile-time and query-time errors.

use thiserror::Error;

use crate::descriptor::FieldKind;

/// A problem found while building one message's output types.
///
/// Every variant is fatal for the message it names and nothing else; the
/// compiler keeps going and reports all of them at the end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{message}.{field}: unsupported field kind `{kind}`")]
    UnsupportedKind {
        message: String,
        field: String,
        kind: FieldKind,
    },

    #[error("{message}: oneof `{group}` member `{field}` is invalid: {reason}")]
    InvalidOneofMember {
        message: String,
        group: String,
        field: String,
        reason: String,
    },

    #[error("{message}.{field}: type `{type_name}` not found in the loaded descriptors")]
    UnresolvedTypeReference {
        message: String,
        field: String,
        type_name: String,
    },

    #[error("{message}.{field}: message field has no type reference")]
    MissingTypeReference { message: String, field: String },

    #[error("{message}.{field}: `{type_name}` produces no object type")]
    ExcludedTypeReference {
        message: String,
        field: String,
        type_name: String,
    },

    #[error("{message}: output name `{name}` is already taken by `{existing}`")]
    DuplicateTypeName {
        message: String,
        name: String,
        existing: String,
    },

    #[error("{message}: depends on `{dependency}`, which failed to build")]
    DependsOnFailedType { message: String, dependency: String },

    #[error("module `{0}` is not loaded")]
    UnknownModule(String),

    #[error("{message}: invalid bitflags layout: {reason}")]
    InvalidBitflags { message: String, reason: String },
}

impl CompileError {
    /// Fully-qualified name of the message the error is attributed to.
    pub fn message(&self) -> Option<&str> {
        match self {
            CompileError::UnsupportedKind { message, .. }
            | CompileError::InvalidOneofMember { message, .. }
            | CompileError::UnresolvedTypeReference { message, .. }
            | CompileError::MissingTypeReference { message, .. }
            | CompileError::ExcludedTypeReference { message, .. }
            | CompileError::DuplicateTypeName { message, .. }
            | CompileError::DependsOnFailedType { message, .. }
            | CompileError::InvalidBitflags { message, .. } => Some(message),
            CompileError::UnknownModule(_) => None,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            CompileError::UnsupportedKind { field, .. }
            | CompileError::InvalidOneofMember { field, .. }
            | CompileError::UnresolvedTypeReference { field, .. }
            | CompileError::MissingTypeReference { field, .. }
            | CompileError::ExcludedTypeReference { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Every error accumulated over one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.0.iter()
    }
}

impl std::fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} compile error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl<'a> IntoIterator for &'a CompileErrors {
    type Item = &'a CompileError;
    type IntoIter = std::slice::Iter<'a, CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Query-time failures. All of them are recoverable, field-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The binding does not recognize the instance shape it was given.
    #[error("field `{field}` of `{object}` not resolved on instance `{instance}`")]
    FieldNotResolved {
        object: String,
        field: String,
        instance: String,
    },

    /// The union resolver could not determine a member type.
    #[error("union `{union}` has no member for `{value}`")]
    UnknownUnionVariant { union: String, value: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("object `{object}` has no field `{field}`")]
    UnknownField { object: String, field: String },

    /// An object-typed field produced a value that is not a record or wrapper.
    #[error("field `{field}` of `{object}` holds a {found}, expected an instance")]
    NotAnInstance {
        object: String,
        field: String,
        found: &'static str,
    },
}
