//! protogql runtime types
//!
//! Everything a compiled schema touches at query time lives here:
//!
//! - [`value`]: the record/variant instance model bindings read from
//! - [`scalars`]: the output scalar set and its JSON coercions
//! - [`timestamp`], [`permissions`], [`any`], [`error`]: the well-known value
//!   types a schema maps foreign references onto
//!
//! Registries are plain values. Build them once at startup, wrap them in a
//! [`Registries`] handle and pass that handle to whatever serializes values.

pub mod any;
pub mod error;
pub mod permissions;
pub mod scalars;
pub mod timestamp;
pub mod value;

use std::sync::Arc;

pub use any::{Any, AnyCodec, AnyError, AnyRegistry, CborCodec, JsonCodec};
pub use error::ErrorValue;
pub use permissions::{Permission, PermissionError, PermissionRegistry, PermissionsBitmap};
pub use scalars::{IntRange, Scalar, SerializeContext};
pub use timestamp::{Timestamp, TimestampError};
pub use value::{Instance, Record, Value, Variant, VariantKey};

/// Process-scoped registries, shared by handle.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub permissions: Arc<PermissionRegistry>,
    pub any: Arc<AnyRegistry>,
}

impl Registries {
    pub fn new(permissions: Arc<PermissionRegistry>, any: Arc<AnyRegistry>) -> Self {
        Self { permissions, any }
    }
}
