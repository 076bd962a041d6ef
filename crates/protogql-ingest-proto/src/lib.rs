//! Descriptor-set ingestion (protoc/Buf descriptor JSON → message descriptors).
//!
//! Input is the JSON rendering of a `google.protobuf.FileDescriptorSet`, as
//! produced by `buf build --as-file-descriptor-set -o descriptor.json` or by
//! `protoc --descriptor_set_out` piped through a JSON converter. Both the
//! camelCase and the snake_case key spellings are accepted.
//!
//! - Files sharing a package merge into one module.
//! - Nested messages are flattened; their type name keeps the nesting path.
//! - Source comments become descriptions.
//! - Synthetic oneofs generated for proto3 `optional` fields are dropped;
//!   such fields become plain fields.
//! - A file setting the `graphql` file option marks its whole module.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use protogql_schema::{
    DescriptorSet, FieldDescriptor, FieldKind, MessageDescriptor, ModuleDescriptor, OneofDecl,
};
use serde::Deserialize;
use serde_json::Value;

// =============================================================================
// Public API
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProtoLoadStats {
    pub files: usize,
    pub modules: usize,
    pub messages: usize,
    pub fields: usize,
    pub map_entries: usize,
    pub synthetic_oneofs: usize,
}

#[derive(Debug, Clone)]
pub struct ProtoLoadResult {
    pub set: DescriptorSet,
    pub stats: ProtoLoadStats,
}

/// Parse descriptor-set JSON into a [`DescriptorSet`].
pub fn load_descriptor_set_json(text: &str) -> Result<DescriptorSet> {
    Ok(ingest_descriptor_set_json(text)?.set)
}

/// Read and parse a descriptor-set JSON file.
pub fn load_descriptor_set_path(path: impl AsRef<Path>) -> Result<DescriptorSet> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor set {}", path.display()))?;
    load_descriptor_set_json(&text).with_context(|| format!("in {}", path.display()))
}

pub fn ingest_descriptor_set_json(text: &str) -> Result<ProtoLoadResult> {
    let set: FileDescriptorSetJson = serde_json::from_str(text)
        .map_err(|e| anyhow!("failed to parse descriptor set JSON: {e}"))?;

    let mut stats = ProtoLoadStats {
        files: set.file.len(),
        ..ProtoLoadStats::default()
    };
    let mut modules: Vec<ModuleDescriptor> = Vec::new();
    let mut module_index: HashMap<String, usize> = HashMap::new();

    for file in &set.file {
        let file_name = file.name.clone().unwrap_or_else(|| "<unknown>".to_string());
        let package = file.package.clone().unwrap_or_default();
        let comments = comment_index(file.source_code_info.as_ref());

        let mi = *module_index.entry(package.clone()).or_insert_with(|| {
            modules.push(ModuleDescriptor::new(package.as_str()));
            modules.len() - 1
        });

        let mut messages = Vec::new();
        for (i, m) in file.message_type.iter().enumerate() {
            flatten_message(
                &package,
                m,
                Vec::new(),
                vec![4, i as i32],
                &comments,
                &mut messages,
                &mut stats,
            )
            .with_context(|| format!("in file {file_name}"))?;
        }
        tracing::debug!(
            file = %file_name,
            package = %package,
            messages = messages.len(),
            "loaded descriptor file"
        );
        if option_flag(file.options.as_ref(), is_graphql_key) {
            modules[mi].graphql = true;
        }
        modules[mi].messages.extend(messages);
    }

    stats.modules = modules.len();
    Ok(ProtoLoadResult {
        set: DescriptorSet::new(modules),
        stats,
    })
}

// =============================================================================
// Descriptor JSON (subset)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct FileDescriptorSetJson {
    #[serde(default)]
    file: Vec<FileDescriptorProtoJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileDescriptorProtoJson {
    name: Option<String>,
    package: Option<String>,
    #[serde(default, rename = "messageType", alias = "message_type")]
    message_type: Vec<DescriptorProtoJson>,
    #[serde(default, rename = "sourceCodeInfo", alias = "source_code_info")]
    source_code_info: Option<SourceCodeInfoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct DescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    field: Vec<FieldDescriptorProtoJson>,
    #[serde(default, rename = "nestedType", alias = "nested_type")]
    nested_type: Vec<DescriptorProtoJson>,
    #[serde(default, rename = "oneofDecl", alias = "oneof_decl")]
    oneof_decl: Vec<OneofDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct OneofDescriptorProtoJson {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldDescriptorProtoJson {
    name: Option<String>,
    label: Option<String>,
    #[serde(rename = "type")]
    typ: Option<String>,
    #[serde(rename = "typeName", alias = "type_name")]
    type_name: Option<String>,
    #[serde(rename = "oneofIndex", alias = "oneof_index")]
    oneof_index: Option<i32>,
    #[serde(default, rename = "proto3Optional", alias = "proto3_optional")]
    proto3_optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceCodeInfoJson {
    #[serde(default)]
    location: Vec<LocationJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct LocationJson {
    #[serde(default)]
    path: Vec<i32>,
    #[serde(rename = "leadingComments", alias = "leading_comments")]
    leading_comments: Option<String>,
    #[serde(rename = "trailingComments", alias = "trailing_comments")]
    trailing_comments: Option<String>,
    #[serde(default, rename = "leadingDetachedComments", alias = "leading_detached_comments")]
    leading_detached_comments: Vec<String>,
}

type OptionsJson = BTreeMap<String, Value>;

// descriptor.proto field numbers used in source-code paths
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED: i32 = 3;
const MESSAGE_ONEOF: i32 = 8;

// =============================================================================
// Conversion
// =============================================================================

fn comment_index(sci: Option<&SourceCodeInfoJson>) -> HashMap<Vec<i32>, String> {
    let mut index = HashMap::new();
    let Some(sci) = sci else {
        return index;
    };
    for loc in &sci.location {
        let leading = loc.leading_comments.as_deref().unwrap_or("").trim();
        let trailing = loc.trailing_comments.as_deref().unwrap_or("").trim();
        let mut parts: Vec<&str> = loc
            .leading_detached_comments
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if !leading.is_empty() {
            parts.push(leading);
        }
        if !trailing.is_empty() {
            parts.push(trailing);
        }
        let joined = parts.join("\n\n").trim().to_string();
        if !joined.is_empty() {
            index.insert(loc.path.clone(), joined);
        }
    }
    index
}

fn child_path(base: &[i32], kind: i32, index: usize) -> Vec<i32> {
    let mut path = base.to_vec();
    path.push(kind);
    path.push(index as i32);
    path
}

fn flatten_message(
    package: &str,
    m: &DescriptorProtoJson,
    mut prefix: Vec<String>,
    path: Vec<i32>,
    comments: &HashMap<Vec<i32>, String>,
    out: &mut Vec<MessageDescriptor>,
    stats: &mut ProtoLoadStats,
) -> Result<()> {
    let Some(name) = m.name.clone() else {
        return Ok(());
    };
    prefix.push(name);
    let display_name = prefix.join(".");

    let map_entry = option_flag(m.options.as_ref(), |key| key == "mapEntry" || key == "map_entry");
    let bitflags = option_flag(m.options.as_ref(), is_bitflags_key);

    // Oneofs that only hold proto3 `optional` fields are synthetic.
    let mut members: Vec<(usize, bool)> = vec![(0, true); m.oneof_decl.len()];
    for f in &m.field {
        let slot = f
            .oneof_index
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| members.get_mut(i));
        if let Some(slot) = slot {
            slot.0 += 1;
            slot.1 &= f.proto3_optional;
        }
    }
    let mut remap: Vec<Option<usize>> = Vec::with_capacity(m.oneof_decl.len());
    let mut oneofs = Vec::new();
    for (oi, decl) in m.oneof_decl.iter().enumerate() {
        let (count, all_optional) = members[oi];
        if count > 0 && all_optional {
            stats.synthetic_oneofs += 1;
            remap.push(None);
            continue;
        }
        remap.push(Some(oneofs.len()));
        let mut oneof = OneofDecl::new(decl.name.clone().unwrap_or_default());
        oneof.description = comments.get(&child_path(&path, MESSAGE_ONEOF, oi)).cloned();
        oneofs.push(oneof);
    }

    let mut fields = Vec::with_capacity(m.field.len());
    for (fi, f) in m.field.iter().enumerate() {
        let field_name = f
            .name
            .clone()
            .ok_or_else(|| anyhow!("{package}.{display_name}: field #{fi} has no name"))?;
        let kind = match f.typ.as_deref() {
            Some(t) => FieldKind::from_proto_name(t)
                .ok_or_else(|| anyhow!("{package}.{display_name}.{field_name}: unknown field type `{t}`"))?,
            // unresolved descriptors may omit the type of message references
            None if f.type_name.is_some() => FieldKind::Message,
            None => return Err(anyhow!("{package}.{display_name}.{field_name}: field has no type")),
        };
        let oneof_index = match f.oneof_index {
            Some(i) => {
                let i = usize::try_from(i)
                    .map_err(|_| anyhow!("{package}.{display_name}.{field_name}: negative oneof index"))?;
                match remap.get(i) {
                    Some(mapped) => *mapped,
                    // dangling; the compiler reports it against the message
                    None => Some(i),
                }
            }
            None => None,
        };
        fields.push(FieldDescriptor {
            name: field_name,
            kind,
            type_name: if kind == FieldKind::Message {
                f.type_name.clone()
            } else {
                None
            },
            repeated: f.label.as_deref() == Some("LABEL_REPEATED"),
            required: f.label.as_deref() == Some("LABEL_REQUIRED"),
            oneof_index,
            description: comments.get(&child_path(&path, MESSAGE_FIELD, fi)).cloned(),
        });
    }

    stats.messages += 1;
    stats.fields += fields.len();
    if map_entry {
        stats.map_entries += 1;
    }

    out.push(MessageDescriptor {
        type_name: prefix.clone(),
        module: package.to_string(),
        fields,
        oneofs,
        description: comments.get(&path).cloned(),
        map_entry,
        bitflags,
    });

    for (ni, nested) in m.nested_type.iter().enumerate() {
        flatten_message(
            package,
            nested,
            prefix.clone(),
            child_path(&path, MESSAGE_NESTED, ni),
            comments,
            out,
            stats,
        )?;
    }
    Ok(())
}

fn option_flag(options: Option<&OptionsJson>, key_matches: impl Fn(&str) -> bool) -> bool {
    options
        .map(|opts| {
            opts.iter()
                .any(|(k, v)| key_matches(k) && v.as_bool().unwrap_or(false))
        })
        .unwrap_or(false)
}

/// `graphql`, or any extension key such as `[gogogqlproto.graphql]`.
fn is_graphql_key(key: &str) -> bool {
    key == "graphql" || (key.starts_with('[') && key.ends_with(".graphql]"))
}

/// `bitflags`, or any extension key such as `[gogogqlproto.bitflags]`.
fn is_bitflags_key(key: &str) -> bool {
    key == "bitflags" || (key.starts_with('[') && key.ends_with(".bitflags]"))
}
