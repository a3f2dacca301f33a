//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::{Path, PathBuf};
use std::sync::Once;

pub use spatia::{
    IndexableEntry, ManagerConfig, Properties, Result, Shape, ShapeFormat, SpaceEntry,
    SpatialError, SpatialIndexManager, TypeDescriptor, Value,
};
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output at debug level to the test harness.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Properties under the `spatial` namespace from `(key, value)` pairs.
pub fn spatial_properties(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (format!("spatial.{}", k), v.to_string()))
        .collect()
}

// ============================================================================
// TestIndex - manager plus the directory it lives in
// ============================================================================

/// Spatial index manager rooted in a temporary work directory.
pub struct TestIndex {
    pub manager: SpatialIndexManager,
    pub dir: TempDir,
}

impl TestIndex {
    /// On-disk index with default settings.
    pub fn new() -> Self {
        Self::with(&[])
    }

    /// In-memory index.
    pub fn in_memory() -> Self {
        Self::with(&[("storage.directory-type", "RAMDirectory")])
    }

    /// On-disk index with extra `spatial.*` settings.
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = ManagerConfig::new(spatial_properties(pairs)).with_work_dir(dir.path());
        let manager =
            SpatialIndexManager::from_manager_config(&config).expect("Failed to create manager");
        TestIndex { manager, dir }
    }

    /// Storage root of the index.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("spatial-index")
    }

    /// Introduce the `Station` type, indexed at `location`.
    pub fn with_stations(self) -> Self {
        self.manager
            .introduce_type(&station_type())
            .expect("Failed to introduce Station");
        self
    }

    /// Identifiers matched by a scan of `Station.location`.
    pub fn scan(&self, operation: &str, shape: Shape) -> Vec<String> {
        let mut ids: Vec<String> = self
            .manager
            .scan_index("Station", "location", operation, &Value::from(shape))
            .expect("scan failed")
            .collect::<Result<_>>()
            .expect("iteration failed");
        ids.sort();
        ids
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Type with one spatial path, `location`.
pub fn station_type() -> TypeDescriptor {
    TypeDescriptor::builder("Station")
        .spatial_index("location")
        .build()
}

/// Station entry located at `shape`.
pub fn station(uid: &str, version: u64, shape: Shape) -> SpaceEntry {
    SpaceEntry::new("Station", uid, version).with_property("location", shape)
}

/// Shapes exercised by round trip tests.
pub fn sample_shapes() -> Vec<Shape> {
    vec![
        Shape::point(2.5, -1.25),
        Shape::rectangle(-10.0, 10.0, -5.0, 5.0),
        Shape::line_string(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.5)]),
        Shape::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0), (0.0, 0.0)]),
        Shape::polygon(&[(10.0, 10.0), (12.0, 10.0), (11.0, 13.0), (10.0, 10.0)]),
        Shape::circle(3.0, 4.0, 1.5),
    ]
}
