//! Spatial index manager
//!
//! Routes record lifecycle events to per-type indexes and answers spatial
//! queries against them.
//!
//! ## Indexed documents
//!
//! Each entry carrying at least one shape on an indexed path becomes one
//! document holding:
//! - the strategy fields of every indexed path
//! - `SPATIA_ID`: the entry uid (stored)
//! - `SPATIA_ID_VERSION`: `<uid>_<version>` (stored and searchable)
//!
//! An update adds the new document and deletes the one keyed by the
//! previous version, so at most one version of an entry is indexed.
//!
//! ## Storage lifecycle
//!
//! The index is rebuilt from the record store on every start: a storage
//! root left behind by a previous run is deleted on construction, and the
//! root is deleted again on [`SpatialIndexManager::close`]. Index calls
//! made after close fail with [`SpatialError::Closed`]; `filter` and
//! `to_geometry` touch no index and keep working.

use crate::config::{DirectoryKind, ManagerConfig, SpatialConfig};
use crate::iterator::SpatialQueryIterator;
use crate::operation::SpatialOperation;
use crate::type_index::TypeIndex;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use geo_types::Geometry;
use spatia_core::{
    IndexableEntry, MutationKind, Result, Shape, SpatialError, TypeDescriptor, Value,
    SPATIAL_NAMESPACE,
};
use spatia_storage::{Document, Field, IndexReader, StorageError, StoredValue, Term};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stored field holding the entry uid
pub const SPATIA_ID: &str = "SPATIA_ID";

/// Searchable field holding `<uid>_<version>`
pub const SPATIA_ID_VERSION: &str = "SPATIA_ID_VERSION";

/// Directory of a type's documents below `root/<type>`
const ENTRIES_DIR: &str = "entries";

const SCAN_FAILED: &str = "Failed to scan index";

fn version_token(uid: &str, version: u64) -> String {
    format!("{}_{}", uid, version)
}

/// Wrap a storage failure, reporting a writer closed under the call as a closed manager
fn storage_error(
    e: StorageError,
    wrap: impl FnOnce(StorageError) -> SpatialError,
) -> SpatialError {
    match e {
        StorageError::Closed => SpatialError::Closed,
        other => wrap(other),
    }
}

/// Spatial index over all introduced record types
pub struct SpatialIndexManager {
    config: SpatialConfig,
    indexes: DashMap<String, Arc<TypeIndex>>,
    closed: AtomicBool,
}

impl SpatialIndexManager {
    /// Create a manager, deleting storage left by a previous run
    pub fn new(config: SpatialConfig) -> Result<Self> {
        if config.directory_kind() == DirectoryKind::MMapDirectory {
            remove_root(config.location()).map_err(|e| {
                SpatialError::configuration(format!(
                    "Failed to clear spatial index location {}: {}",
                    config.location().display(),
                    e
                ))
            })?;
        }
        info!(
            target: "spatia::manager",
            strategy = %config.strategy_kind(),
            directory = %config.directory_kind(),
            location = %config.location().display(),
            "Spatial index manager started"
        );
        Ok(SpatialIndexManager {
            config,
            indexes: DashMap::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Resolve configuration and create a manager
    pub fn from_manager_config(config: &ManagerConfig) -> Result<Self> {
        Self::new(SpatialConfig::new(config)?)
    }

    /// Resolved configuration
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Create the index of a record type
    ///
    /// Introducing a type twice keeps the first index and logs a warning.
    pub fn introduce_type(&self, descriptor: &TypeDescriptor) -> Result<()> {
        self.ensure_open()?;
        let type_name = descriptor.name();
        match self.indexes.entry(type_name.to_string()) {
            Entry::Occupied(_) => {
                warn!(
                    target: "spatia::manager",
                    type_name,
                    "Type is already introduced to the spatial index"
                );
            }
            Entry::Vacant(vacant) => {
                let query_extension = descriptor
                    .query_extension(SPATIAL_NAMESPACE)
                    .cloned()
                    .unwrap_or_default();
                let index = self
                    .config
                    .directory(Path::new(type_name).join(ENTRIES_DIR))
                    .and_then(|directory| {
                        TypeIndex::create(
                            type_name,
                            directory,
                            query_extension,
                            self.config.max_uncommitted_changes(),
                        )
                    })
                    .map_err(|e| SpatialError::IntroduceType {
                        type_name: type_name.to_string(),
                        source: Box::new(e),
                    })?;
                info!(
                    target: "spatia::manager",
                    type_name,
                    paths = ?index.paths(),
                    "Introduced type"
                );
                vacant.insert(Arc::new(index));
            }
        }
        Ok(())
    }

    /// Index of an introduced type
    pub fn type_index(&self, type_name: &str) -> Result<Arc<TypeIndex>> {
        self.indexes
            .get(type_name)
            .map(|index| Arc::clone(index.value()))
            .ok_or_else(|| SpatialError::UnknownType(type_name.to_string()))
    }

    /// Names of the introduced types, sorted
    pub fn introduced_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Index an entry, optionally superseding its previous version
    ///
    /// Returns whether a document was indexed; entries without shapes on
    /// indexed paths produce none. With `remove_previous` the document of
    /// version `version - 1` is deleted even then, so a dropped shape
    /// leaves the index.
    pub fn insert_entry<E: IndexableEntry + ?Sized>(
        &self,
        entry: &E,
        remove_previous: bool,
    ) -> Result<bool> {
        self.ensure_open()?;
        let index = self.type_index(entry.type_name())?;
        let mut document = Document::new();
        for path in index.paths() {
            if let Some(Value::Shape(shape)) = entry.path_value(path) {
                document.extend(self.config.strategy(path).create_indexable_fields(shape)?);
            }
        }

        let uid = entry.uid();
        let version = entry.version();
        let operation = if remove_previous {
            MutationKind::Update
        } else {
            MutationKind::Insert
        };
        let wrap = |e: StorageError| {
            storage_error(e, |e| SpatialError::IndexMutation {
                type_name: entry.type_name().to_string(),
                operation,
                uid: uid.to_string(),
                source: Box::new(e),
            })
        };

        let indexed = !document.is_empty();
        if indexed {
            document.add(Field::stored(SPATIA_ID, StoredValue::Text(uid.to_string())));
            document.add(Field::keyword(SPATIA_ID_VERSION, version_token(uid, version)));
            index.writer().add_document(document).map_err(wrap)?;
        }
        let previous = version.checked_sub(1).filter(|_| remove_previous);
        if let Some(previous) = previous {
            index
                .writer()
                .delete_documents(Term::new(SPATIA_ID_VERSION, version_token(uid, previous)))
                .map_err(wrap)?;
        }
        if indexed || previous.is_some() {
            index.commit(false).map_err(wrap)?;
        }
        debug!(
            target: "spatia::manager",
            type_name = entry.type_name(),
            uid,
            version,
            %operation,
            indexed,
            "Indexed entry"
        );
        Ok(indexed)
    }

    /// Remove the document of one entry version
    pub fn remove_entry(&self, type_name: &str, uid: &str, version: u64) -> Result<()> {
        self.ensure_open()?;
        let index = self.type_index(type_name)?;
        let wrap = |e: StorageError| {
            storage_error(e, |e| SpatialError::IndexMutation {
                type_name: type_name.to_string(),
                operation: MutationKind::Remove,
                uid: uid.to_string(),
                source: Box::new(e),
            })
        };
        index
            .writer()
            .delete_documents(Term::new(SPATIA_ID_VERSION, version_token(uid, version)))
            .map_err(wrap)?;
        index.commit(false).map_err(wrap)?;
        debug!(target: "spatia::manager", type_name, uid, version, "Removed entry");
        Ok(())
    }

    /// Find the entries of a type whose shape at `path` satisfies `<operation> operand`
    ///
    /// Buffered mutations are flushed first; the returned iterator reads
    /// from a snapshot taken right after.
    pub fn scan_index(
        &self,
        type_name: &str,
        path: &str,
        operation: &str,
        operand: &Value,
    ) -> Result<SpatialQueryIterator> {
        self.ensure_open()?;
        let operation = SpatialOperation::parse(operation)?;
        let shape = operand.as_shape().ok_or_else(|| {
            SpatialError::invalid_argument(format!(
                "Operation {} can be applied only for geometrical shapes, instead given: {}",
                operation, operand
            ))
        })?;
        let index = self.type_index(type_name)?;
        let query = self.config.strategy(path).make_query(operation, shape)?;

        index
            .commit(true)
            .map_err(|e| storage_error(e, |e| SpatialError::query_execution(SCAN_FAILED, e)))?;
        let reader = IndexReader::open(index.directory())
            .map_err(|e| SpatialError::query_execution(SCAN_FAILED, e))?;
        let hits = reader
            .search(&query, usize::MAX)
            .map_err(|e| SpatialError::query_execution(SCAN_FAILED, e))?;

        debug!(
            target: "spatia::query",
            type_name,
            path,
            %operation,
            generation = reader.generation(),
            hits = hits.len(),
            "Scanned spatial index"
        );
        let prematched_path = if self.config.rematch_already_matched_index_path(path) {
            None
        } else {
            Some(path.to_string())
        };
        Ok(SpatialQueryIterator::new(reader, hits, prematched_path))
    }

    /// Evaluate `left <operation> right` without touching any index
    pub fn filter(&self, operation: &str, left: &Value, right: &Value) -> Result<bool> {
        let (Some(left_shape), Some(right_shape)) = (left.as_shape(), right.as_shape()) else {
            return Err(SpatialError::invalid_argument(format!(
                "Operation {} can be applied only for geometrical shapes, instead given: {} and {}",
                operation, left, right
            )));
        };
        let operation = SpatialOperation::parse(operation)?;
        operation.evaluate(self.config.context(), left_shape, right_shape)
    }

    /// Validate a shape and convert it to its canonical geometry
    pub fn to_geometry(&self, shape: &Shape) -> Result<Geometry<f64>> {
        self.config.context().to_geometry(shape)
    }

    /// Close every type index and delete the storage root
    ///
    /// All indexes are closed even if one fails; the first failure is
    /// returned. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut first_error: Option<StorageError> = None;
        for entry in self.indexes.iter() {
            if let Err(e) = entry.value().close() {
                warn!(
                    target: "spatia::manager",
                    type_name = %entry.key(),
                    error = %e,
                    "Failed to close type index"
                );
                first_error = first_error.or(Some(e));
            }
        }
        self.indexes.clear();
        if self.config.directory_kind() == DirectoryKind::MMapDirectory {
            if let Err(e) = remove_root(self.config.location()) {
                first_error = first_error.or(Some(StorageError::Io(e)));
            }
        }
        info!(target: "spatia::manager", "Spatial index manager closed");
        match first_error {
            Some(e) => Err(SpatialError::Close {
                source: Box::new(e),
            }),
            None => Ok(()),
        }
    }
}

impl SpatialIndexManager {
    /// Check if the manager was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(SpatialError::Closed)
        } else {
            Ok(())
        }
    }
}

fn remove_root(location: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(location) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl std::fmt::Debug for SpatialIndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndexManager")
            .field("strategy", &self.config.strategy_kind())
            .field("location", &self.config.location())
            .field("types", &self.indexes.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
