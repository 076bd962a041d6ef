//! Output scalars and their runtime coercions.
//!
//! Every leaf of a compiled schema is one of these scalars. `serialize`
//! turns a resolved [`Value`] into the JSON a query response carries;
//! `parse_value` goes the other way for variables and literals. Coercions
//! never fail loudly: anything that cannot be represented becomes `null`.
//! The string scalars are the exception and render any other non-null value
//! as text, foreign records included.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::any::Any;
use crate::error::ErrorValue;
use crate::timestamp::Timestamp;
use crate::Registries;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scalar {
    Float,
    Int,
    Boolean,
    String,
    /// Raw bytes; never coerced through a lossy UTF-8 conversion.
    ByteString,
    /// Milliseconds since the epoch.
    Timestamp,
    Any,
    /// Capability bitmap, serialized as its capability names.
    Permission,
    /// Error carried as data, serialized as its message.
    Error,
}

/// How the `Int` scalar treats values outside the signed 32-bit range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntRange {
    /// Full 64-bit range, serialized losslessly.
    #[default]
    Int64,
    /// Values outside `i32` become null.
    Int32,
}

/// Everything serialization needs besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct SerializeContext<'a> {
    pub registries: &'a Registries,
    pub int_range: IntRange,
}

impl<'a> SerializeContext<'a> {
    pub fn new(registries: &'a Registries) -> Self {
        Self {
            registries,
            int_range: IntRange::default(),
        }
    }

    pub fn with_int_range(mut self, int_range: IntRange) -> Self {
        self.int_range = int_range;
        self
    }
}

impl Scalar {
    pub const ALL: [Scalar; 9] = [
        Scalar::Float,
        Scalar::Int,
        Scalar::Boolean,
        Scalar::String,
        Scalar::ByteString,
        Scalar::Timestamp,
        Scalar::Any,
        Scalar::Permission,
        Scalar::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scalar::Float => "Float",
            Scalar::Int => "Int",
            Scalar::Boolean => "Boolean",
            Scalar::String => "String",
            Scalar::ByteString => "ByteString",
            Scalar::Timestamp => "Timestamp",
            Scalar::Any => "Any",
            Scalar::Permission => "Permission",
            Scalar::Error => "Error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Scalars every GraphQL server provides without a declaration.
    pub fn is_builtin(self) -> bool {
        matches!(
            self,
            Scalar::Float | Scalar::Int | Scalar::Boolean | Scalar::String
        )
    }

    pub fn serialize(self, value: &Value, ctx: &SerializeContext<'_>) -> Json {
        if let Value::List(items) = value {
            return Json::Array(items.iter().map(|v| self.serialize(v, ctx)).collect());
        }
        match self {
            Scalar::Float => coerce_float(value),
            Scalar::Int => coerce_int(value, ctx.int_range),
            Scalar::Timestamp => coerce_int(value, IntRange::Int64),
            Scalar::Boolean => coerce_bool(value),
            Scalar::String => coerce_string(value),
            Scalar::ByteString => coerce_byte_string(value),
            Scalar::Any => coerce_any(value, ctx),
            Scalar::Permission => match value {
                Value::Permission(p) => p.to_json(&ctx.registries.permissions),
                _ => Json::Null,
            },
            Scalar::Error => match value {
                Value::Error(err) => Json::String(err.message.clone()),
                _ => Json::Null,
            },
        }
    }

    pub fn parse_value(self, input: &Json) -> Option<Value> {
        match (self, input) {
            (_, Json::Null) => Some(Value::Null),
            (Scalar::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
            (Scalar::Int, Json::Number(n)) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_u64().map(Value::UInt)),
            (Scalar::Timestamp, Json::Number(n)) => n.as_i64().map(|millis| {
                Value::Timestamp(Timestamp::new(
                    millis.div_euclid(1000),
                    (millis.rem_euclid(1000) * 1_000_000) as i32,
                ))
            }),
            (Scalar::Boolean, Json::Bool(b)) => Some(Value::Bool(*b)),
            (Scalar::String, Json::String(s)) => Some(Value::String(s.clone())),
            (Scalar::ByteString, Json::String(s)) => Some(Value::Bytes(s.as_bytes().to_vec())),
            (Scalar::Any, Json::String(s)) => Some(Value::Any(Any {
                type_url: String::new(),
                value: s.as_bytes().to_vec(),
            })),
            (Scalar::Error, Json::String(s)) => Some(Value::Error(ErrorValue::new("Error", s.as_str()))),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Coercions
// ============================================================================

fn coerce_int(value: &Value, range: IntRange) -> Json {
    let wide: Option<i128> = match value {
        Value::Bool(b) => Some(i128::from(*b)),
        Value::Int(i) => Some(i128::from(*i)),
        Value::UInt(u) => Some(i128::from(*u)),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i128),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i128),
        Value::Timestamp(ts) => Some(i128::from(ts.millis())),
        _ => None,
    };
    let Some(wide) = wide else {
        return Json::Null;
    };
    let fits = match range {
        IntRange::Int32 => i32::try_from(wide).is_ok(),
        IntRange::Int64 => i64::try_from(wide).is_ok() || u64::try_from(wide).is_ok(),
    };
    if !fits {
        return Json::Null;
    }
    if let Ok(i) = i64::try_from(wide) {
        Json::from(i)
    } else {
        u64::try_from(wide).map(Json::from).unwrap_or(Json::Null)
    }
}

fn coerce_float(value: &Value) -> Json {
    let f = match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    f.and_then(serde_json::Number::from_f64)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

fn coerce_bool(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Bool(*i != 0),
        Value::UInt(u) => Json::Bool(*u != 0),
        Value::Float(f) => Json::Bool(*f != 0.0),
        Value::String(s) => Json::Bool(!(s.is_empty() || s == "false")),
        _ => Json::Null,
    }
}

fn coerce_string(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::Bool(b) => Json::String(b.to_string()),
        Value::Int(i) => Json::String(i.to_string()),
        Value::UInt(u) => Json::String(u.to_string()),
        Value::Float(f) => Json::String(f.to_string()),
        Value::Timestamp(ts) => Json::String(ts.to_string()),
        Value::Bytes(_) => coerce_byte_string(value),
        Value::Error(err) => Json::String(err.message.clone()),
        Value::Null => Json::Null,
        // Records and other structured values render as their compact JSON text.
        other => Json::String(other.to_json().to_string()),
    }
}

fn coerce_byte_string(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Json::String(s.to_string()),
            Err(_) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        },
        other => coerce_string(other),
    }
}

fn coerce_any(value: &Value, ctx: &SerializeContext<'_>) -> Json {
    let Value::Any(any) = value else {
        return Json::Null;
    };
    if ctx.registries.any.contains(&any.type_url) {
        match ctx.registries.any.to_json(any) {
            Ok(json) => return json,
            Err(err) => {
                tracing::debug!(tag = %any.type_url, error = %err, "any payload failed to decode");
            }
        }
    }
    std::str::from_utf8(&any.value)
        .map(|s| Json::String(s.to_string()))
        .unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::{Any, JsonCodec};
    use crate::permissions::Permission;
    use crate::value::Record;
    use serde_json::json;
    use std::sync::Arc;

    fn ser(scalar: Scalar, value: Value) -> Json {
        let registries = Registries::default();
        scalar.serialize(&value, &SerializeContext::new(&registries))
    }

    #[test]
    fn names_roundtrip() {
        for s in Scalar::ALL {
            assert_eq!(Scalar::from_name(s.name()), Some(s));
        }
        assert_eq!(Scalar::from_name("Decimal"), None);
    }

    #[test]
    fn int_keeps_64_bit_values_by_default() {
        assert_eq!(ser(Scalar::Int, Value::Int(i64::MAX)), json!(i64::MAX));
        assert_eq!(ser(Scalar::Int, Value::UInt(u64::MAX)), json!(u64::MAX));
        assert_eq!(ser(Scalar::Int, Value::Bool(true)), json!(1));
        assert_eq!(ser(Scalar::Int, Value::from("42.9")), json!(42));
        assert_eq!(ser(Scalar::Int, Value::from("forty")), Json::Null);
    }

    #[test]
    fn int32_range_nulls_out_wide_values() {
        let registries = Registries::default();
        let ctx = SerializeContext::new(&registries).with_int_range(IntRange::Int32);
        assert_eq!(Scalar::Int.serialize(&Value::Int(i64::from(i32::MAX)), &ctx), json!(i32::MAX));
        assert_eq!(Scalar::Int.serialize(&Value::Int(i64::from(i32::MAX) + 1), &ctx), Json::Null);
        assert_eq!(Scalar::Int.serialize(&Value::UInt(u64::MAX), &ctx), Json::Null);
    }

    #[test]
    fn timestamp_serializes_as_millis() {
        let ts = Timestamp::new(100, 100_000_000);
        assert_eq!(ser(Scalar::Timestamp, ts.into()), json!(100_100));
    }

    #[test]
    fn byte_string_is_never_lossy() {
        assert_eq!(ser(Scalar::ByteString, b"disgusting".to_vec().into()), json!("disgusting"));
        assert_eq!(ser(Scalar::ByteString, vec![0xff, 0x00].into()), json!([255, 0]));
    }

    #[test]
    fn lists_serialize_elementwise() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(ser(Scalar::Int, list), json!([1, 2]));
    }

    #[test]
    fn permission_serializes_names() {
        let registries = Registries::default();
        registries.permissions.register("user", 0, "admin").unwrap();
        registries.permissions.register("user", 1, "edit").unwrap();
        let value = Value::Permission(Permission::new("user", 0x3));
        let out = Scalar::Permission.serialize(&value, &SerializeContext::new(&registries));
        assert_eq!(out, json!(["admin", "edit"]));
    }

    #[test]
    fn any_decodes_through_registry_or_falls_back_to_text() {
        let registries = Registries::default();
        registries
            .any
            .register("Dessert", Arc::new(JsonCodec::new("menu.Dessert")));
        let ctx = SerializeContext::new(&registries);

        let record = Record::new("menu.Dessert").with("name", "flan");
        let any = registries.any.marshal(&record).unwrap();
        assert_eq!(
            Scalar::Any.serialize(&Value::Any(any), &ctx),
            json!({"name": "flan"})
        );

        let opaque = Any {
            type_url: "Unknown".to_string(),
            value: b"raw".to_vec(),
        };
        assert_eq!(Scalar::Any.serialize(&Value::Any(opaque), &ctx), json!("raw"));
    }

    #[test]
    fn parse_value_inverts_timestamp_millis() {
        let parsed = Scalar::Timestamp.parse_value(&json!(100_100)).unwrap();
        assert_eq!(parsed, Value::Timestamp(Timestamp::new(100, 100_000_000)));
        assert_eq!(Scalar::Int.parse_value(&json!("x")), None);
        assert_eq!(Scalar::Boolean.parse_value(&Json::Null), Some(Value::Null));
    }

    #[test]
    fn byte_string_renders_foreign_records_as_text() {
        let money = Record::new("m2.Money").with("cents", 1250);
        assert_eq!(ser(Scalar::ByteString, money.into()), json!(r#"{"cents":1250}"#));
        assert_eq!(ser(Scalar::ByteString, Value::Null), Json::Null);
    }

    #[test]
    fn boolean_strings_follow_graphql_rules() {
        assert_eq!(ser(Scalar::Boolean, Value::from("false")), json!(false));
        assert_eq!(ser(Scalar::Boolean, Value::from("")), json!(false));
        assert_eq!(ser(Scalar::Boolean, Value::from("yes")), json!(true));
        assert_eq!(ser(Scalar::Boolean, Value::Float(0.0)), json!(false));
    }

    #[test]
    fn any_parse_then_serialize_keeps_the_text() {
        let registries = Registries::default();
        let ctx = SerializeContext::new(&registries);
        let parsed = Scalar::Any.parse_value(&json!("raw")).unwrap();
        assert!(matches!(parsed, Value::Any(_)));
        assert_eq!(Scalar::Any.serialize(&parsed, &ctx), json!("raw"));
    }

    #[test]
    fn error_serializes_its_message() {
        let err = ErrorValue::new("PermissionsError", "not authorized: billing");
        assert_eq!(ser(Scalar::Error, err.into()), json!("not authorized: billing"));
        assert_eq!(ser(Scalar::Error, Value::from("plain")), Json::Null);
        let parsed = Scalar::Error.parse_value(&json!("boom")).unwrap();
        assert_eq!(ser(Scalar::Error, parsed), json!("boom"));
        assert_eq!(Scalar::from_name("Error"), Some(Scalar::Error));
    }
}
