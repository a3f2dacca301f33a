//! Record types and entries as seen by the spatial index
//!
//! The host record store describes each record type with a
//! [`TypeDescriptor`] naming the property paths that carry shapes, and hands
//! over each stored record as an [`IndexableEntry`].

use crate::value::Value;
use std::collections::BTreeMap;

/// Namespace under which spatial index paths are registered on a type
pub const SPATIAL_NAMESPACE: &str = "spatial";

// ============================================================================
// IndexableEntry
// ============================================================================

/// A versioned record that can be indexed
///
/// Versions increase by one on every update of the same `uid`.
pub trait IndexableEntry {
    /// Name of the record type
    fn type_name(&self) -> &str;

    /// Record identifier, unique within the type
    fn uid(&self) -> &str;

    /// Record version
    fn version(&self) -> u64;

    /// Value at a dotted property path, if present
    fn path_value(&self, path: &str) -> Option<&Value>;
}

/// Plain in-memory entry
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceEntry {
    type_name: String,
    uid: String,
    version: u64,
    properties: BTreeMap<String, Value>,
}

impl SpaceEntry {
    /// Create an entry without properties
    pub fn new(type_name: impl Into<String>, uid: impl Into<String>, version: u64) -> Self {
        SpaceEntry {
            type_name: type_name.into(),
            uid: uid.into(),
            version,
            properties: BTreeMap::new(),
        }
    }

    /// Set a top level property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Top level properties
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Copy of this entry with the next version number
    pub fn next_version(&self) -> Self {
        SpaceEntry {
            version: self.version + 1,
            ..self.clone()
        }
    }
}

impl IndexableEntry for SpaceEntry {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn path_value(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((property, rest)) => self.properties.get(property)?.get_path(rest),
            None => self.properties.get(path),
        }
    }
}

// ============================================================================
// Type descriptors
// ============================================================================

/// Paths registered on a type under one query extension namespace
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeQueryExtension {
    paths: Vec<String>,
}

impl TypeQueryExtension {
    /// Registered paths, in registration order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn add_path(&mut self, path: String) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }
}

/// Description of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    extensions: BTreeMap<String, TypeQueryExtension>,
}

impl TypeDescriptor {
    /// Start describing a type
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            descriptor: TypeDescriptor {
                name: name.into(),
                extensions: BTreeMap::new(),
            },
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Paths registered under a namespace
    pub fn query_extension(&self, namespace: &str) -> Option<&TypeQueryExtension> {
        self.extensions.get(namespace)
    }

    /// Paths registered for spatial indexing
    pub fn spatial_paths(&self) -> &[String] {
        self.query_extension(SPATIAL_NAMESPACE)
            .map(TypeQueryExtension::paths)
            .unwrap_or(&[])
    }
}

/// Builder for [`TypeDescriptor`]
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    /// Index the shape stored directly under `property`
    pub fn spatial_index(self, property: &str) -> Self {
        self.add_path(SPATIAL_NAMESPACE, property.to_string())
    }

    /// Index the shape stored at `path` inside `property`
    pub fn spatial_index_at(self, property: &str, path: &str) -> Self {
        self.add_path(SPATIAL_NAMESPACE, format!("{}.{}", property, path))
    }

    /// Register a path under an arbitrary namespace
    pub fn add_path(mut self, namespace: &str, path: String) -> Self {
        self.descriptor
            .extensions
            .entry(namespace.to_string())
            .or_default()
            .add_path(path);
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}
