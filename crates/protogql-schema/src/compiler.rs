//! Two-phase compilation driver.
//!
//! Phase one declares an output name for every message that will become an
//! object (and for every union its oneof groups produce), so references
//! between messages resolve regardless of declaration order or cycles.
//! Phase two populates the declared types. Failures are isolated per
//! message; a final pass drops any surviving type that still names a failed
//! one, so the published schema has no dangling references.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use protogql_types::{Scalar, VariantKey};

use crate::binding::AccessorTable;
use crate::bitflags::FlagLayout;
use crate::descriptor::{DescriptorSet, MessageDescriptor};
use crate::error::{CompileError, CompileErrors};
use crate::naming::{foreign_object_name, object_name, union_name};
use crate::object::{build_object, BuiltObject};
use crate::oneof::{collect_groups, OneofGroup};
use crate::options::{CompileOptions, TypeNaming};
use crate::resolve::TypeResolver;
use crate::schema::Schema;

/// The outcome of one compilation: whatever built, plus every error.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub schema: Schema,
    pub errors: CompileErrors,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The schema when nothing failed, else all errors.
    pub fn into_result(self) -> Result<Schema, CompileErrors> {
        if self.errors.is_empty() {
            Ok(self.schema)
        } else {
            Err(self.errors)
        }
    }
}

pub fn compile(set: &DescriptorSet, modules: &[&str], options: CompileOptions) -> Compilation {
    Compiler::new(set, options).compile(modules)
}

struct Unit<'a> {
    message: &'a MessageDescriptor,
    full_name: String,
    object: String,
    /// Pascal form of the object name; unions are named after it.
    union_prefix: String,
    groups: Vec<OneofGroup<'a>>,
    failed: bool,
}

pub struct Compiler<'a> {
    set: &'a DescriptorSet,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(set: &'a DescriptorSet, options: CompileOptions) -> Self {
        Self { set, options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile every message of `modules`, plus any inlined foreign messages.
    pub fn compile(&self, modules: &[&str]) -> Compilation {
        let mut errors = Vec::new();
        let mut units = self.collect_units(modules, &mut errors);

        let declared = self.declare(&mut units, &mut errors);
        let accessors = self.accessor_tables(&units);

        // Phase two.
        let resolver = TypeResolver::new(self.set, &self.options, &declared);
        let mut built: Vec<(usize, BuiltObject)> = Vec::new();
        for (i, unit) in units.iter_mut().enumerate() {
            if unit.failed {
                continue;
            }
            let table = accessors.get(&unit.full_name).cloned().unwrap_or_default();
            let names = (unit.object.as_str(), unit.union_prefix.as_str());
            match build_object(&resolver, unit.message, names, &unit.groups, table) {
                Ok(object) => {
                    tracing::debug!(
                        descriptor = %unit.full_name,
                        object = %unit.object,
                        fields = object.object.fields.len(),
                        unions = object.unions.len(),
                        "built object"
                    );
                    built.push((i, object));
                }
                Err(errs) => {
                    unit.failed = true;
                    errors.extend(errs);
                }
            }
        }

        prune_dangling(&mut built, &mut errors);

        let mut flag_layouts = BTreeMap::new();
        let mut objects = Vec::with_capacity(built.len());
        let mut unions = Vec::new();
        for (i, b) in built {
            let unit = &units[i];
            if unit.message.bitflags {
                if let Ok(layout) = FlagLayout::from_message(unit.message) {
                    flag_layouts.insert(unit.full_name.clone(), layout);
                }
            }
            objects.push(b.object);
            unions.extend(b.unions);
        }

        for err in &errors {
            tracing::warn!(
                descriptor = err.message().unwrap_or_default(),
                field = err.field().unwrap_or_default(),
                error = %err,
                "compile error"
            );
        }
        tracing::info!(
            objects = objects.len(),
            unions = unions.len(),
            errors = errors.len(),
            "schema compiled"
        );

        Compilation {
            schema: Schema::new(objects, unions, flag_layouts, self.options.int_range),
            errors: CompileErrors(errors),
        }
    }

    fn collect_units(&self, modules: &[&str], errors: &mut Vec<CompileError>) -> Vec<Unit<'a>> {
        let mut units = Vec::new();
        let mut seen = HashSet::new();
        for &name in modules {
            if !seen.insert(name) {
                continue;
            }
            let Some(module) = self.set.module(name) else {
                errors.push(CompileError::UnknownModule(name.to_string()));
                continue;
            };
            if self.options.require_graphql_option && !module.graphql {
                tracing::info!(module = %name, "module does not set the graphql option, skipping");
                continue;
            }
            for message in &module.messages {
                if message.is_excluded() {
                    tracing::debug!(descriptor = %message.full_name(), "skipping excluded message");
                    continue;
                }
                units.push(Unit {
                    message,
                    full_name: message.full_name(),
                    object: object_name(&message.type_name, self.options.type_naming),
                    union_prefix: object_name(&message.type_name, TypeNaming::Pascal),
                    groups: Vec::new(),
                    failed: false,
                });
            }
        }

        for inlined in self.options.inlined() {
            let Some(message) = self.set.lookup(inlined) else {
                tracing::warn!(descriptor = %inlined, "inline override names an unknown message");
                continue;
            };
            if seen.contains(message.module.as_str()) {
                continue;
            }
            if message.is_excluded() {
                tracing::warn!(descriptor = %inlined, "inline override names an excluded message");
                continue;
            }
            units.push(Unit {
                message,
                full_name: message.full_name(),
                object: foreign_object_name(&message.module, &message.type_name, self.options.type_naming),
                union_prefix: foreign_object_name(&message.module, &message.type_name, TypeNaming::Pascal),
                groups: Vec::new(),
                failed: false,
            });
        }
        units
    }

    /// Phase one: reserve every object and union name.
    fn declare(&self, units: &mut [Unit<'a>], errors: &mut Vec<CompileError>) -> BTreeMap<String, String> {
        let mut taken: HashMap<String, String> = Scalar::ALL
            .iter()
            .map(|s| (s.name().to_string(), format!("scalar {s}")))
            .collect();
        let mut declared = BTreeMap::new();

        for unit in units.iter_mut() {
            if let Some(existing) = taken.get(&unit.object) {
                errors.push(CompileError::DuplicateTypeName {
                    message: unit.full_name.clone(),
                    name: unit.object.clone(),
                    existing: existing.clone(),
                });
                unit.failed = true;
                continue;
            }
            taken.insert(unit.object.clone(), unit.full_name.clone());
            declared.insert(unit.full_name.clone(), unit.object.clone());
            tracing::debug!(descriptor = %unit.full_name, object = %unit.object, "declared object");
        }

        for unit in units.iter_mut().filter(|u| !u.failed) {
            let message: &'a MessageDescriptor = unit.message;
            if message.bitflags {
                if let Err(err) = FlagLayout::from_message(message) {
                    errors.push(err);
                    unit.failed = true;
                    continue;
                }
            }
            let groups = match collect_groups(message) {
                Ok(groups) => groups,
                Err(errs) => {
                    errors.extend(errs);
                    unit.failed = true;
                    continue;
                }
            };
            for group in &groups {
                let name = union_name(&unit.union_prefix, group.name);
                if let Some(existing) = taken.get(&name) {
                    errors.push(CompileError::DuplicateTypeName {
                        message: unit.full_name.clone(),
                        name,
                        existing: existing.clone(),
                    });
                    unit.failed = true;
                } else {
                    taken.insert(name, format!("{}.{}", unit.full_name, group.name));
                }
            }
            unit.groups = groups;
        }
        declared
    }

    /// For every payload message, the oneof arms that carry it.
    fn accessor_tables(&self, units: &[Unit<'a>]) -> HashMap<String, Arc<AccessorTable>> {
        let mut tables: HashMap<String, AccessorTable> = HashMap::new();
        for unit in units.iter().filter(|u| !u.failed) {
            for group in &unit.groups {
                for member in &group.members {
                    let Some(payload) = member.type_name.as_deref().and_then(|t| self.set.lookup(t)) else {
                        continue;
                    };
                    tables
                        .entry(payload.full_name())
                        .or_default()
                        .insert(VariantKey::new(unit.full_name.as_str(), member.name.as_str()));
                }
            }
        }
        tables.into_iter().map(|(k, v)| (k, Arc::new(v))).collect()
    }
}

/// Drop built objects that refer to a type that did not make it, until
/// nothing changes.
fn prune_dangling(built: &mut Vec<(usize, BuiltObject)>, errors: &mut Vec<CompileError>) {
    loop {
        let known: BTreeSet<&str> = built
            .iter()
            .flat_map(|(_, b)| {
                std::iter::once(b.object.name.as_str()).chain(b.unions.iter().map(|u| u.name.as_str()))
            })
            .chain(Scalar::ALL.iter().map(|s| s.name()))
            .collect();

        let broken: Vec<(usize, String)> = built
            .iter()
            .enumerate()
            .filter_map(|(pos, (_, b))| {
                let field_types = b.object.fields.iter().map(|f| f.ty.named_type());
                let members = b.unions.iter().flat_map(|u| u.members.iter().map(String::as_str));
                field_types
                    .chain(members)
                    .find(|name| !known.contains(name))
                    .map(|missing| (pos, missing.to_string()))
            })
            .collect();

        if broken.is_empty() {
            return;
        }
        for (pos, dependency) in broken.into_iter().rev() {
            let (_, b) = built.remove(pos);
            errors.push(CompileError::DependsOnFailedType {
                message: b.object.message,
                dependency,
            });
        }
    }
}
