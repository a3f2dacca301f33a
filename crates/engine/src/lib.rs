//! Spatial index engine for Spatia
//!
//! This crate turns shapes into searchable documents and answers spatial
//! predicates over them:
//! - Configuration: strategy, grid, context and storage settings
//! - Grids: geohash and quad prefix trees, shape coverings
//! - Strategies: RecursivePrefixTree, BBox, Composite
//! - Type indexes: one writer per record type with a commit threshold
//! - Index manager: record lifecycle events, scans, in-memory filters
//!
//! The index is derived state. The host record store is the system of
//! record, and storage is wiped on start and on close.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod extension;
pub mod grid;
pub mod iterator;
pub mod location;
pub mod manager;
pub mod operation;
pub mod strategy;
pub mod type_index;

pub use config::{
    DirectoryKind, ManagerConfig, PrefixTreeKind, Properties, PropertySource, SpatialConfig,
    StrategyKind, SupportedValue,
};
pub use extension::{QueryExtensionManager, SpatialQueryExtensionProvider};
pub use grid::{CellRelation, CellSet, CoverShape, SpatialPrefixTree, MAX_COVERING_CELLS};
pub use iterator::SpatialQueryIterator;
pub use manager::{SpatialIndexManager, SPATIA_ID, SPATIA_ID_VERSION};
pub use operation::SpatialOperation;
pub use strategy::{BBoxStrategy, CompositeStrategy, PrefixTreeStrategy, SpatialStrategy};
pub use type_index::TypeIndex;
