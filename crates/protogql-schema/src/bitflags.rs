//! Bit-flag layouts for all-bool messages.
//!
//! Field `i` of a flagged message is bit `i`; flag names are the snake_case
//! field names. Layouts operate on [`Record`] instances of the message.

use protogql_types::{Record, Value};
use thiserror::Error;

use crate::descriptor::{FieldKind, MessageDescriptor};
use crate::error::CompileError;
use crate::naming::{pascal_case, snake_case};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("invalid flag: {0}")]
    InvalidFlag(String),
    #[error("invalid type: {0}")]
    InvalidType(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagLayout {
    message: String,
    /// (flag name, field name), in bit order.
    flags: Vec<(String, String)>,
}

impl FlagLayout {
    pub fn from_message(message: &MessageDescriptor) -> Result<Self, CompileError> {
        let invalid = |reason: String| CompileError::InvalidBitflags {
            message: message.full_name(),
            reason,
        };
        if message.fields.len() > 64 {
            return Err(invalid(format!("{} fields exceed 64 bits", message.fields.len())));
        }
        let mut flags = Vec::with_capacity(message.fields.len());
        for field in &message.fields {
            if field.kind != FieldKind::Bool || field.repeated {
                return Err(invalid(format!("field `{}` is not a single bool", field.name)));
            }
            flags.push((snake_case(&pascal_case(&field.name)), field.name.clone()));
        }
        Ok(Self {
            message: message.full_name(),
            flags,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn flag_names(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(|(flag, _)| flag.as_str())
    }

    fn field_for(&self, flag: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(name, _)| name == flag)
            .map(|(_, field)| field.as_str())
    }

    fn is_set(record: &Record, field: &str) -> bool {
        record.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn to_u64(&self, record: &Record) -> u64 {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, (_, field))| Self::is_set(record, field))
            .fold(0u64, |bits, (bit, _)| bits | (1u64 << bit))
    }

    /// Every field is assigned; bits past the layout are ignored.
    pub fn from_u64(&self, bits: u64) -> Record {
        let mut record = Record::new(self.message.as_str());
        for (bit, (_, field)) in self.flags.iter().enumerate() {
            record.set(field.as_str(), bits & (1u64 << bit) != 0);
        }
        record
    }

    /// Decode a stored numeric column.
    pub fn scan(&self, value: &Value) -> Result<Record, FlagError> {
        let bits = match value {
            Value::Int(i) => *i as u64,
            Value::UInt(u) => *u,
            Value::Float(f) if f.is_finite() => *f as u64,
            other => return Err(FlagError::InvalidType(other.kind())),
        };
        Ok(self.from_u64(bits))
    }

    /// Storage form: the bitmap as a signed 64-bit integer.
    pub fn to_storage(&self, record: &Record) -> i64 {
        self.to_u64(record) as i64
    }

    pub fn high_flags(&self, record: &Record) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, field)| Self::is_set(record, field))
            .map(|(flag, _)| flag.as_str())
            .collect()
    }

    pub fn low_flags(&self, record: &Record) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, field)| !Self::is_set(record, field))
            .map(|(flag, _)| flag.as_str())
            .collect()
    }

    pub fn set_flag(&self, record: &mut Record, flag: &str) -> Result<(), FlagError> {
        self.assign(record, flag, true)
    }

    pub fn clear_flag(&self, record: &mut Record, flag: &str) -> Result<(), FlagError> {
        self.assign(record, flag, false)
    }

    fn assign(&self, record: &mut Record, flag: &str, on: bool) -> Result<(), FlagError> {
        let field = self
            .field_for(flag)
            .ok_or_else(|| FlagError::InvalidFlag(flag.to_string()))?;
        record.set(field, on);
        Ok(())
    }

    /// Set every known flag; unknown ones are collected as errors.
    pub fn set_flags(&self, record: &mut Record, flags: &[&str]) -> Vec<FlagError> {
        flags
            .iter()
            .filter_map(|f| self.set_flag(record, f).err())
            .collect()
    }

    pub fn clear_flags(&self, record: &mut Record, flags: &[&str]) -> Vec<FlagError> {
        flags
            .iter()
            .filter_map(|f| self.clear_flag(record, f).err())
            .collect()
    }

    /// Unknown flags test false.
    pub fn test_flag(&self, record: &Record, flag: &str) -> bool {
        self.field_for(flag)
            .map(|field| Self::is_set(record, field))
            .unwrap_or(false)
    }

    pub fn test_flags(&self, record: &Record, flags: &[&str]) -> bool {
        flags.iter().all(|f| self.test_flag(record, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;

    fn perms() -> FlagLayout {
        let msg = MessageDescriptor::new("users", &["Perms"])
            .field(FieldDescriptor::scalar("admin", FieldKind::Bool))
            .field(FieldDescriptor::scalar("canEdit", FieldKind::Bool))
            .field(FieldDescriptor::scalar("billing_owner", FieldKind::Bool));
        FlagLayout::from_message(&msg).unwrap()
    }

    #[test]
    fn flag_names_are_snake_case() {
        let layout = perms();
        assert_eq!(
            layout.flag_names().collect::<Vec<_>>(),
            vec!["admin", "can_edit", "billing_owner"]
        );
    }

    #[test]
    fn bits_follow_field_order() {
        let layout = perms();
        let record = Record::new("users.Perms")
            .with("admin", true)
            .with("billing_owner", true);
        assert_eq!(layout.to_u64(&record), 0b101);
        assert_eq!(layout.high_flags(&record), vec!["admin", "billing_owner"]);
        assert_eq!(layout.low_flags(&record), vec!["can_edit"]);

        let back = layout.from_u64(0b010);
        assert!(layout.test_flag(&back, "can_edit"));
        assert!(!layout.test_flag(&back, "admin"));
    }

    #[test]
    fn set_and_clear_collect_unknown_flags() {
        let layout = perms();
        let mut record = Record::new("users.Perms");
        let errors = layout.set_flags(&mut record, &["admin", "root", "can_edit"]);
        assert_eq!(errors, vec![FlagError::InvalidFlag("root".to_string())]);
        assert!(layout.test_flags(&record, &["admin", "can_edit"]));
        assert!(!layout.test_flags(&record, &["admin", "billing_owner"]));

        layout.clear_flag(&mut record, "admin").unwrap();
        assert_eq!(layout.to_u64(&record), 0b010);
        assert!(layout.clear_flag(&mut record, "nope").is_err());
        assert!(!layout.test_flag(&record, "nope"));
    }

    #[test]
    fn scan_accepts_numeric_columns() {
        let layout = perms();
        let record = layout.scan(&Value::Int(0b011)).unwrap();
        assert_eq!(layout.to_storage(&record), 3);
        assert_eq!(
            layout.scan(&Value::from("3")),
            Err(FlagError::InvalidType("string"))
        );
    }

    #[test]
    fn non_bool_fields_are_rejected() {
        let msg = MessageDescriptor::new("users", &["Broken"])
            .field(FieldDescriptor::scalar("admin", FieldKind::Bool))
            .field(FieldDescriptor::scalar("level", FieldKind::Int32));
        assert!(matches!(
            FlagLayout::from_message(&msg),
            Err(CompileError::InvalidBitflags { .. })
        ));
    }
}
