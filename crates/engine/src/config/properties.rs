//! Property lookup for configuration
//!
//! Configuration is read through [`PropertySource`]: a lookup from dotted key
//! to raw string value. Defaults are applied by the resolver, never by the
//! source.
//!
//! [`Properties`] can be loaded from a TOML file. Nested tables are
//! flattened into dotted keys, so
//!
//! ```toml
//! [spatial]
//! strategy = "Composite"
//! "strategy.spatial-prefix-tree" = "QuadPrefixTree"
//! "context.world-bounds" = [-10, 10, -5, 5]
//! ```
//!
//! yields `spatial.strategy`, `spatial.strategy.spatial-prefix-tree` and
//! `spatial.context.world-bounds = "-10,10,-5,5"`. Keys that are both a value
//! and a prefix of other keys have to be quoted, as above.

use spatia_core::{Result, SpatialError};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::path::Path;

/// Key to raw value lookup
pub trait PropertySource {
    /// Raw value of a key, if set
    fn property(&self, key: &str) -> Option<String>;
}

impl<S: BuildHasher> PropertySource for HashMap<String, String, S> {
    fn property(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl PropertySource for BTreeMap<String, String> {
    fn property(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Ordered set of configuration properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    /// Empty property set
    pub fn new() -> Self {
        Properties::default()
    }

    /// Set a property, returning the updated set
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no property is set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse TOML text, flattening nested tables into dotted keys
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not valid TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| {
            SpatialError::configuration(format!("Failed to parse configuration: {}", e))
        })?;
        let mut properties = Properties::new();
        flatten_table("", &table, &mut properties.values);
        Ok(properties)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SpatialError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

impl PropertySource for Properties {
    fn property(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(nested) => flatten_table(&full_key, nested, out),
            other => {
                out.insert(full_key, scalar_text(other));
            }
        }
    }
}

fn scalar_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
