//! Well-known error value.
//!
//! Records may carry an error as data (a failed check, a partial result).
//! It serializes through the `Error` scalar as its message text.

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorValue {
    /// Short tag, e.g. `PermissionsError`.
    pub kind: String,
    pub message: String,
}

impl ErrorValue {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorValue {}

impl From<&PermissionError> for ErrorValue {
    fn from(err: &PermissionError) -> Self {
        let kind = match err {
            PermissionError::NotAuthorized(_) => "PermissionsError",
            PermissionError::BitOutOfRange { .. } => "PermissionRegistryError",
        };
        Self::new(kind, err.to_string())
    }
}
