//! Core types for Spatia
//!
//! This crate defines the foundational types used throughout the system:
//! - Shape: geometric values and their WKT / GeoJSON text forms
//! - SpatialContext: coordinate system that validates shapes
//! - Value: property values carried by entries
//! - IndexableEntry, SpaceEntry, TypeDescriptor: records and record types
//! - SpatialError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod entry;
pub mod error;
pub mod shape;
pub mod value;

pub use context::{ContextKind, SpatialContext};
pub use entry::{
    IndexableEntry, SpaceEntry, TypeDescriptor, TypeDescriptorBuilder, TypeQueryExtension,
    SPATIAL_NAMESPACE,
};
pub use error::{BoxError, MutationKind, Result, SpatialError};
pub use shape::{Circle, Shape, ShapeFormat};
pub use value::Value;
