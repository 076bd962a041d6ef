//! Message descriptor tree (the compiler's read-only input).
//!
//! The tree is produced by a descriptor parser (see `protogql-ingest-proto`)
//! or built directly in code. Once wrapped in a [`DescriptorSet`] it is never
//! mutated; the set only adds a global fully-qualified-name index on top.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Field kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    Bool,
    String,
    Bytes,
    /// Reference to another message; the field carries a type name.
    Message,
    Enum,
    Group,
}

impl FieldKind {
    pub const ALL: [FieldKind; 18] = [
        FieldKind::Double,
        FieldKind::Float,
        FieldKind::Int32,
        FieldKind::Int64,
        FieldKind::Uint32,
        FieldKind::Uint64,
        FieldKind::Fixed32,
        FieldKind::Fixed64,
        FieldKind::Sfixed32,
        FieldKind::Sfixed64,
        FieldKind::Sint32,
        FieldKind::Sint64,
        FieldKind::Bool,
        FieldKind::String,
        FieldKind::Bytes,
        FieldKind::Message,
        FieldKind::Enum,
        FieldKind::Group,
    ];

    /// Parse the descriptor enum spelling (`TYPE_INT32`, `TYPE_MESSAGE`, ...).
    pub fn from_proto_name(name: &str) -> Option<Self> {
        let kind = match name {
            "TYPE_DOUBLE" => FieldKind::Double,
            "TYPE_FLOAT" => FieldKind::Float,
            "TYPE_INT32" => FieldKind::Int32,
            "TYPE_INT64" => FieldKind::Int64,
            "TYPE_UINT32" => FieldKind::Uint32,
            "TYPE_UINT64" => FieldKind::Uint64,
            "TYPE_FIXED32" => FieldKind::Fixed32,
            "TYPE_FIXED64" => FieldKind::Fixed64,
            "TYPE_SFIXED32" => FieldKind::Sfixed32,
            "TYPE_SFIXED64" => FieldKind::Sfixed64,
            "TYPE_SINT32" => FieldKind::Sint32,
            "TYPE_SINT64" => FieldKind::Sint64,
            "TYPE_BOOL" => FieldKind::Bool,
            "TYPE_STRING" => FieldKind::String,
            "TYPE_BYTES" => FieldKind::Bytes,
            "TYPE_MESSAGE" => FieldKind::Message,
            "TYPE_ENUM" => FieldKind::Enum,
            "TYPE_GROUP" => FieldKind::Group,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Double => "double",
            FieldKind::Float => "float",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Message => "message",
            FieldKind::Enum => "enum",
            FieldKind::Group => "group",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Fully-qualified referenced message (`.pkg.Msg` or `pkg.Msg`); only for
    /// [`FieldKind::Message`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub required: bool,
    /// Index into the owning message's `oneofs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn scalar(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: None,
            repeated: false,
            required: false,
            oneof_index: None,
            description: None,
        }
    }

    pub fn message(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::scalar(name, FieldKind::Message)
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn in_oneof(mut self, index: usize) -> Self {
        self.oneof_index = Some(index);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneofDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OneofDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    /// Name components reflecting nesting (`["Outer", "Inner"]`).
    pub type_name: Vec<String>,
    /// Owning module; filled in from the enclosing [`ModuleDescriptor`] when empty.
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub oneofs: Vec<OneofDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Synthetic map-entry message; never compiled.
    #[serde(default)]
    pub map_entry: bool,
    /// All-bool message that also gets a bit-flag layout.
    #[serde(default)]
    pub bitflags: bool,
}

impl MessageDescriptor {
    pub fn new(module: impl Into<String>, type_name: &[&str]) -> Self {
        Self {
            type_name: type_name.iter().map(|s| s.to_string()).collect(),
            module: module.into(),
            fields: Vec::new(),
            oneofs: Vec::new(),
            description: None,
            map_entry: false,
            bitflags: false,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn oneof(mut self, oneof: OneofDecl) -> Self {
        self.oneofs.push(oneof);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `module.Outer.Inner`
    pub fn full_name(&self) -> String {
        qualify_type_name(&self.module, &self.type_name.join("."))
    }

    pub fn simple_name(&self) -> &str {
        self.type_name.last().map(String::as_str).unwrap_or_default()
    }

    /// Excluded from schema generation (map entries, messages without fields).
    pub fn is_excluded(&self) -> bool {
        self.map_entry || self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,
    /// Some source file of the module sets the `graphql` file option.
    #[serde(default)]
    pub graphql: bool,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
            graphql: false,
        }
    }

    pub fn message(mut self, message: MessageDescriptor) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_graphql(mut self, graphql: bool) -> Self {
        self.graphql = graphql;
        self
    }
}

// ============================================================================
// Descriptor set
// ============================================================================

/// All loaded modules plus a global fully-qualified-name index.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    modules: Vec<ModuleDescriptor>,
    // full name -> (module index, message index)
    index: HashMap<String, (usize, usize)>,
}

#[derive(Deserialize)]
struct DescriptorSetDoc {
    #[serde(default)]
    modules: Vec<ModuleDescriptor>,
}

impl DescriptorSet {
    pub fn new(mut modules: Vec<ModuleDescriptor>) -> Self {
        let mut index = HashMap::new();
        for (mi, module) in modules.iter_mut().enumerate() {
            for (i, message) in module.messages.iter_mut().enumerate() {
                if message.module.is_empty() {
                    message.module = module.name.clone();
                }
                let full_name = message.full_name();
                if index.contains_key(&full_name) {
                    tracing::warn!(descriptor = %full_name, "duplicate message definition ignored");
                    continue;
                }
                index.insert(full_name, (mi, i));
            }
        }
        Self { modules, index }
    }

    /// Parse the native JSON form: `{"modules": [ModuleDescriptor, ...]}`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let doc: DescriptorSetDoc = serde_json::from_str(text)?;
        Ok(Self::new(doc.modules))
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Look a message up by fully-qualified name; a leading `.` is accepted.
    pub fn lookup(&self, type_name: &str) -> Option<&MessageDescriptor> {
        let cleaned = type_name.trim_start_matches('.');
        let &(mi, i) = self.index.get(cleaned)?;
        self.modules.get(mi)?.messages.get(i)
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.modules.iter().flat_map(|m| m.messages.iter())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub fn qualify_type_name(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{module}.{name}")
    }
}
