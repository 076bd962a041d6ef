//! Compiler configuration.
//!
//! Options are plain serde data so they can live next to the descriptor
//! inputs as a JSON file:
//!
//! ```json
//! {
//!   "type_naming": "pascal",
//!   "int_range": "int64",
//!   "require_graphql_option": true,
//!   "overrides": { "money.Money": "inline", "geo.Point": { "scalar": "String" } }
//! }
//! ```

use std::collections::BTreeMap;

use protogql_types::{IntRange, Scalar};
use serde::{Deserialize, Serialize};

/// Output object naming scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNaming {
    /// `LineItem`, nested `Outer_Inner`.
    #[default]
    Pascal,
    /// `line_item`, nested `outer__inner`. Union names stay Pascal
    /// (`LineItemDish`).
    Snake,
}

/// What a reference to a particular foreign message becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignOverride {
    /// Pin the reference to a scalar.
    Scalar(Scalar),
    /// Compile the foreign message into this schema as an object.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub type_naming: TypeNaming,
    pub int_range: IntRange,
    /// Foreign message simple name -> scalar.
    pub well_known: BTreeMap<String, Scalar>,
    /// Fully-qualified foreign message -> override. Wins over `well_known`.
    pub overrides: BTreeMap<String, ForeignOverride>,
    /// Only compile modules whose source files set the `graphql` file option.
    pub require_graphql_option: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        let well_known = [
            ("Timestamp", Scalar::Timestamp),
            ("Any", Scalar::Any),
            ("Permission", Scalar::Permission),
            ("Error", Scalar::Error),
        ]
        .into_iter()
        .map(|(name, scalar)| (name.to_string(), scalar))
        .collect();
        Self {
            type_naming: TypeNaming::default(),
            int_range: IntRange::default(),
            well_known,
            overrides: BTreeMap::new(),
            require_graphql_option: false,
        }
    }
}

impl CompileOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_type_naming(mut self, naming: TypeNaming) -> Self {
        self.type_naming = naming;
        self
    }

    pub fn with_int_range(mut self, int_range: IntRange) -> Self {
        self.int_range = int_range;
        self
    }

    pub fn with_graphql_option_required(mut self, required: bool) -> Self {
        self.require_graphql_option = required;
        self
    }

    pub fn with_override(mut self, message: impl Into<String>, value: ForeignOverride) -> Self {
        let message: String = message.into();
        self.overrides
            .insert(message.trim_start_matches('.').to_string(), value);
        self
    }

    /// Fully-qualified names of foreign messages to compile as objects.
    pub fn inlined(&self) -> impl Iterator<Item = &str> {
        self.overrides.iter().filter_map(|(name, o)| match o {
            ForeignOverride::Inline => Some(name.as_str()),
            ForeignOverride::Scalar(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_well_known_foreign_types() {
        let options = CompileOptions::default();
        assert_eq!(options.type_naming, TypeNaming::Pascal);
        assert_eq!(options.int_range, IntRange::Int64);
        assert_eq!(options.well_known.get("Timestamp"), Some(&Scalar::Timestamp));
        assert_eq!(options.well_known.get("Any"), Some(&Scalar::Any));
        assert_eq!(options.well_known.get("Error"), Some(&Scalar::Error));
        assert!(options.overrides.is_empty());
        assert!(!options.require_graphql_option);
    }

    #[test]
    fn from_json_fills_missing_keys_with_defaults() {
        let options = CompileOptions::from_json(
            r#"{
                "type_naming": "snake",
                "overrides": {
                    "money.Money": "inline",
                    "geo.Point": {"scalar": "String"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(options.type_naming, TypeNaming::Snake);
        assert_eq!(options.int_range, IntRange::Int64);
        assert_eq!(options.well_known.len(), 4);
        assert_eq!(
            options.overrides.get("geo.Point"),
            Some(&ForeignOverride::Scalar(Scalar::String))
        );
        assert_eq!(options.inlined().collect::<Vec<_>>(), vec!["money.Money"]);
    }

    #[test]
    fn with_override_strips_leading_dot() {
        let options = CompileOptions::default().with_override(".money.Money", ForeignOverride::Inline);
        assert!(options.overrides.contains_key("money.Money"));
    }
}
