//! Dynamic, type-tagged payloads.
//!
//! An [`Any`] carries an encoded record plus the tag of the message it
//! encodes. Decoding goes through an [`AnyRegistry`], an explicit table from
//! tag to [`AnyCodec`] filled in once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Record;

#[derive(Debug, Error)]
pub enum AnyError {
    #[error("couldn't find type `{0}` in registry")]
    UnknownType(String),
    #[error("failed to encode `{tag}`: {message}")]
    Encode { tag: String, message: String },
    #[error("failed to decode `{tag}`: {message}")]
    Decode { tag: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Any {
    pub type_url: String,
    pub value: Vec<u8>,
}

/// Encodes and decodes the records of one tagged type.
pub trait AnyCodec: Send + Sync {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, String>;
    fn decode(&self, bytes: &[u8]) -> Result<Record, String>;
}

// ============================================================================
// Built-in codecs
// ============================================================================

/// JSON encoding of the record's fields.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    message: String,
}

impl JsonCodec {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl AnyCodec for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, String> {
        serde_json::to_vec(&record.fields).map_err(|e| e.to_string())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, String> {
        let fields = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Ok(Record {
            message: self.message.clone(),
            fields,
        })
    }
}

/// CBOR encoding of the record's fields.
#[derive(Debug, Clone)]
pub struct CborCodec {
    message: String,
}

impl CborCodec {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl AnyCodec for CborCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, String> {
        let mut out = Vec::new();
        ciborium::into_writer(&record.fields, &mut out).map_err(|e| e.to_string())?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, String> {
        let fields = ciborium::from_reader(bytes).map_err(|e| e.to_string())?;
        Ok(Record {
            message: self.message.clone(),
            fields,
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default)]
pub struct AnyRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn AnyCodec>>>,
}

impl std::fmt::Debug for AnyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<String> = self.codecs.read().keys().cloned().collect();
        tags.sort();
        f.debug_struct("AnyRegistry").field("tags", &tags).finish()
    }
}

impl AnyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tag: impl Into<String>, codec: Arc<dyn AnyCodec>) {
        let tag = tag.into();
        tracing::debug!(tag = %tag, "registering any codec");
        self.codecs.write().insert(tag, codec);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.codecs.read().contains_key(tag)
    }

    fn codec(&self, tag: &str) -> Result<Arc<dyn AnyCodec>, AnyError> {
        self.codecs
            .read()
            .get(tag)
            .cloned()
            .ok_or_else(|| AnyError::UnknownType(tag.to_string()))
    }

    /// Encode `record`, tagging it with its simple message name.
    pub fn marshal(&self, record: &Record) -> Result<Any, AnyError> {
        let tag = record.simple_name().to_string();
        let codec = self.codec(&tag)?;
        let value = codec.encode(record).map_err(|message| AnyError::Encode {
            tag: tag.clone(),
            message,
        })?;
        Ok(Any {
            type_url: tag,
            value,
        })
    }

    pub fn unmarshal(&self, any: &Any) -> Result<Record, AnyError> {
        let codec = self.codec(&any.type_url)?;
        codec.decode(&any.value).map_err(|message| AnyError::Decode {
            tag: any.type_url.clone(),
            message,
        })
    }

    /// JSON view of the decoded payload's fields.
    pub fn to_json(&self, any: &Any) -> Result<serde_json::Value, AnyError> {
        Ok(self.unmarshal(any)?.to_json())
    }
}
