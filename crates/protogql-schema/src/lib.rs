//! protogql schema compiler
//!
//! Compiles protobuf-style message descriptors into a GraphQL output schema:
//! object types, scalars and unions, plus the resolver bindings a query
//! engine uses to read field values out of runtime records.
//!
//! Pipeline, leaves first:
//!
//! - [`scalar`]: field kind -> output scalar, list/non-null modifiers
//! - [`resolve`]: message references -> local object, inlined foreign object
//!   or foreign scalar
//! - [`oneof`]: oneof groups of a message, validated
//! - [`object`]: one object type per message
//! - [`binding`]: per-field value extraction, including through oneof wrappers
//! - [`union`]: per-group type-switch
//! - [`compiler`]: the two-phase driver producing a [`Schema`]
//!
//! ```no_run
//! use protogql_schema::{compile, CompileOptions, DescriptorSet};
//!
//! # fn run(set: DescriptorSet) -> Result<(), protogql_schema::CompileErrors> {
//! let schema = compile(&set, &["menu"], CompileOptions::default()).into_result()?;
//! println!("{}", schema.to_sdl());
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod bitflags;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod naming;
pub mod object;
pub mod oneof;
pub mod options;
pub mod output;
pub mod resolve;
pub mod scalar;
pub mod schema;
pub mod union;

pub use binding::{AccessorTable, FieldBinding};
pub use bitflags::{FlagError, FlagLayout};
pub use compiler::{compile, Compilation, Compiler};
pub use descriptor::{
    DescriptorSet, FieldDescriptor, FieldKind, MessageDescriptor, ModuleDescriptor, OneofDecl,
};
pub use error::{CompileError, CompileErrors, ResolveError};
pub use options::{CompileOptions, ForeignOverride, TypeNaming};
pub use output::{ObjectField, ObjectType, OutputType, TypeRef, UnionType};
pub use resolve::{ResolvedRef, TypeResolver};
pub use scalar::{apply_modifiers, map_scalar, UnsupportedKind};
pub use schema::Schema;
pub use union::UnionDispatch;

pub use protogql_types as types;
