//! Spatia - pluggable spatial indexing for versioned record stores
//!
//! Spatia indexes the shapes held by records of a host store and answers
//! WITHIN, CONTAINS and INTERSECTS predicates over them. The host drives
//! it through record lifecycle events: a type is introduced, entries are
//! inserted, updated and removed, and queries scan one indexed path.
//!
//! # Quick Start
//!
//! ```ignore
//! use spatia::{ManagerConfig, Properties, Shape, SpaceEntry, SpatialIndexManager,
//!     TypeDescriptor, Value};
//!
//! let properties = Properties::new().with("spatial.storage.directory-type", "RAMDirectory");
//! let manager = SpatialIndexManager::from_manager_config(&ManagerConfig::new(properties))?;
//!
//! manager.introduce_type(&TypeDescriptor::builder("Station").spatial_index("location").build())?;
//! let entry = SpaceEntry::new("Station", "s1", 1)
//!     .with_property("location", Shape::point(13.4, 52.5));
//! manager.insert_entry(&entry, false)?;
//!
//! let area = Value::from(Shape::rectangle(13.0, 14.0, 52.0, 53.0));
//! for uid in manager.scan_index("Station", "location", "WITHIN", &area)? {
//!     println!("{}", uid?);
//! }
//! manager.close()?;
//! ```
//!
//! # Architecture
//!
//! - `spatia-core`: shapes, values, entries, type descriptors, errors
//! - `spatia-storage`: the document index shapes are stored in
//! - `spatia-engine`: configuration, grids, strategies and the index manager
//!
//! Everything a host needs is re-exported here.

pub use spatia_core::*;
pub use spatia_engine::*;

/// Document index the spatial engine stores into
pub use spatia_storage as storage;
