//! Runtime record model.
//!
//! Query engines hand bindings one of two instance shapes:
//!
//! - a [`Record`]: an instance of some message, keyed by its fully-qualified name
//! - a [`Variant`]: the wrapper for one arm of a oneof group, carrying (at most)
//!   one payload record
//!
//! A oneof group is stored on its owning record under the group name as a
//! [`Value::Variant`]; the variant's identity is the `(owner, member)` pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::any::Any;
use crate::error::ErrorValue;
use crate::permissions::Permission;
use crate::timestamp::Timestamp;

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
    Permission(Permission),
    Any(Any),
    Error(ErrorValue),
    Message(Box<Record>),
    Variant(Box<Variant>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short tag used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Permission(_) => "permission",
            Value::Any(_) => "any",
            Value::Error(_) => "error",
            Value::Message(_) => "message",
            Value::Variant(_) => "variant",
            Value::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Message(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(v) => Some(v),
            _ => None,
        }
    }

    /// Untagged JSON view, for payload inspection and debugging. Query
    /// responses go through the scalar coercions instead.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Json::String(s.to_string()),
                Err(_) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            },
            Value::Timestamp(ts) => Json::from(ts.millis()),
            Value::Permission(p) => Json::from(p.perm),
            Value::Any(any) => serde_json::json!({
                "type_url": any.type_url,
                "value": any.value,
            }),
            Value::Error(err) => serde_json::json!({
                "kind": err.kind,
                "message": err.message,
            }),
            Value::Message(r) => r.to_json(),
            Value::Variant(v) => {
                let mut obj = serde_json::Map::new();
                let payload = v.payload().map(Record::to_json).unwrap_or(Json::Null);
                obj.insert(v.member.clone(), payload);
                Json::Object(obj)
            }
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Permission> for Value {
    fn from(v: Permission) -> Self {
        Value::Permission(v)
    }
}

impl From<Any> for Value {
    fn from(v: Any) -> Self {
        Value::Any(v)
    }
}

impl From<ErrorValue> for Value {
    fn from(v: ErrorValue) -> Self {
        Value::Error(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Message(Box::new(v))
    }
}

impl From<Variant> for Value {
    fn from(v: Variant) -> Self {
        Value::Variant(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Records
// ============================================================================

/// One instance of a message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Fully-qualified message name (`module.Outer.Inner`).
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Present, non-null field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Last component of the qualified message name.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.message)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

// ============================================================================
// Union wrappers
// ============================================================================

/// Identity of a oneof arm: the owning message and the member field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub owner: String,
    pub member: String,
}

impl VariantKey {
    pub fn new(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
        }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.owner, self.member)
    }
}

/// The populated arm of a oneof group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Fully-qualified name of the message declaring the group.
    pub owner: String,
    /// Member field name within the group.
    pub member: String,
    #[serde(default)]
    pub payload: Option<Box<Record>>,
}

impl Variant {
    pub fn new(owner: impl Into<String>, member: impl Into<String>, payload: Record) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
            payload: Some(Box::new(payload)),
        }
    }

    /// A wrapper whose payload accessor yields nothing.
    pub fn empty(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
            payload: None,
        }
    }

    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.owner.clone(), self.member.clone())
    }

    pub fn payload(&self) -> Option<&Record> {
        self.payload.as_deref()
    }
}

// ============================================================================
// Instances
// ============================================================================

/// The instance shapes a field binding understands.
#[derive(Debug, Clone, Copy)]
pub enum Instance<'a> {
    Record(&'a Record),
    Variant(&'a Variant),
}

impl<'a> Instance<'a> {
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Message(r) => Some(Instance::Record(r)),
            Value::Variant(v) => Some(Instance::Variant(v)),
            _ => None,
        }
    }

    /// Human-readable identity for error reports.
    pub fn describe(&self) -> String {
        match self {
            Instance::Record(r) => r.message.clone(),
            Instance::Variant(v) => format!("{}.{} (wrapper)", v.owner, v.member),
        }
    }
}

impl<'a> From<&'a Record> for Instance<'a> {
    fn from(r: &'a Record) -> Self {
        Instance::Record(r)
    }
}

impl<'a> From<&'a Variant> for Instance<'a> {
    fn from(v: &'a Variant) -> Self {
        Instance::Variant(v)
    }
}

/// `a.b.Outer.Inner` → `Inner`.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_get_skips_nulls() {
        let r = Record::new("menu.Dessert")
            .with("name", "coolwhip")
            .with("topping", Value::Null);
        assert_eq!(r.get("name").and_then(Value::as_str), Some("coolwhip"));
        assert!(r.get("topping").is_none());
        assert!(r.get("missing").is_none());
        assert_eq!(r.simple_name(), "Dessert");
    }

    #[test]
    fn instance_from_value_accepts_records_and_variants() {
        let rec: Value = Record::new("menu.Lunch").into();
        let var: Value = Variant::empty("menu.LineItem", "lunch").into();
        assert!(matches!(Instance::from_value(&rec), Some(Instance::Record(_))));
        assert!(matches!(Instance::from_value(&var), Some(Instance::Variant(_))));
        assert!(Instance::from_value(&Value::Int(1)).is_none());
    }

    #[test]
    fn variant_key_identifies_owner_and_member() {
        let v = Variant::new("menu.LineItem", "dessert", Record::new("menu.Dessert"));
        assert_eq!(v.key(), VariantKey::new("menu.LineItem", "dessert"));
        assert_eq!(v.key().to_string(), "menu.LineItem.dessert");
        assert_eq!(v.payload().map(|p| p.message.as_str()), Some("menu.Dessert"));
    }
}
