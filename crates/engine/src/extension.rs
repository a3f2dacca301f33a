//! Query extension seam
//!
//! A host record store drives secondary indexes through the
//! [`QueryExtensionManager`] trait and discovers them through providers
//! keyed by namespace. The spatial index registers under `spatial`.

use crate::config::ManagerConfig;
use crate::iterator::SpatialQueryIterator;
use crate::manager::SpatialIndexManager;
use spatia_core::{IndexableEntry, Result, TypeDescriptor, Value, SPATIAL_NAMESPACE};

/// Secondary index driven by record lifecycle events
///
/// Thread safety: all methods may be called concurrently from multiple
/// threads (requires Send + Sync).
pub trait QueryExtensionManager: Send + Sync {
    /// A record type became known to the host
    ///
    /// # Errors
    ///
    /// Returns an error if storage for the type cannot be created.
    fn introduce_type(&self, descriptor: &TypeDescriptor) -> Result<()>;

    /// A record was written
    ///
    /// With `remove_previous` the record supersedes `version - 1`.
    /// Returns whether anything was indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, a shape is invalid or the
    /// index cannot be updated.
    fn insert_entry(&self, entry: &dyn IndexableEntry, remove_previous: bool) -> Result<bool>;

    /// A record version was deleted
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or the index cannot be updated.
    fn remove_entry(&self, type_name: &str, uid: &str, version: u64) -> Result<()>;

    /// Identifiers of records whose value at `path` satisfies `<operation> operand`
    ///
    /// # Errors
    ///
    /// Returns an error for unknown operations, non-shape operands, unknown
    /// types and storage failures.
    fn scan_index(
        &self,
        type_name: &str,
        path: &str,
        operation: &str,
        operand: &Value,
    ) -> Result<SpatialQueryIterator>;

    /// Evaluate `left <operation> right` in memory
    ///
    /// # Errors
    ///
    /// Returns an error for unknown operations and non-shape operands.
    fn filter(&self, operation: &str, left: &Value, right: &Value) -> Result<bool>;

    /// Release all index resources
    ///
    /// # Errors
    ///
    /// Returns an error if any index fails to close.
    fn close(&self) -> Result<()>;
}

impl QueryExtensionManager for SpatialIndexManager {
    fn introduce_type(&self, descriptor: &TypeDescriptor) -> Result<()> {
        SpatialIndexManager::introduce_type(self, descriptor)
    }

    fn insert_entry(&self, entry: &dyn IndexableEntry, remove_previous: bool) -> Result<bool> {
        SpatialIndexManager::insert_entry(self, entry, remove_previous)
    }

    fn remove_entry(&self, type_name: &str, uid: &str, version: u64) -> Result<()> {
        SpatialIndexManager::remove_entry(self, type_name, uid, version)
    }

    fn scan_index(
        &self,
        type_name: &str,
        path: &str,
        operation: &str,
        operand: &Value,
    ) -> Result<SpatialQueryIterator> {
        SpatialIndexManager::scan_index(self, type_name, path, operation, operand)
    }

    fn filter(&self, operation: &str, left: &Value, right: &Value) -> Result<bool> {
        SpatialIndexManager::filter(self, operation, left, right)
    }

    fn close(&self) -> Result<()> {
        SpatialIndexManager::close(self)
    }
}

/// Entry point the host uses to create the spatial index
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialQueryExtensionProvider;

impl SpatialQueryExtensionProvider {
    /// Namespace of the spatial index settings and type paths
    pub fn namespace(&self) -> &'static str {
        SPATIAL_NAMESPACE
    }

    /// Create a manager from host configuration
    ///
    /// The configuration's namespace is replaced by [`Self::namespace`].
    pub fn create_manager(&self, config: ManagerConfig) -> Result<SpatialIndexManager> {
        SpatialIndexManager::from_manager_config(&config.with_namespace(self.namespace()))
    }
}
