//! Error types for the spatial index
//!
//! This module defines all error types surfaced by the spatial index.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Configuration messages are part of the external contract and are
//! rendered verbatim (no prefix is added by `Display`).

use std::fmt;
use thiserror::Error;

/// Result type alias for spatial index operations
pub type Result<T> = std::result::Result<T, SpatialError>;

/// Boxed underlying cause carried by wrapped errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Kind of index mutation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// First indexing of an entry
    Insert,
    /// Re-indexing of an entry that supersedes its previous version
    Update,
    /// Removal of an entry
    Remove,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "insert"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Remove => write!(f, "remove"),
        }
    }
}

/// Error types for the spatial index
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Unsupported enumerated value or malformed setting, raised at construction
    #[error("{0}")]
    Configuration(String),

    /// Operand is not a geometric shape, or an argument is otherwise unusable
    #[error("{0}")]
    InvalidArgument(String),

    /// Unknown spatial operation name
    #[error("Operation {operation} not found - supported operations: [{supported}]")]
    UnsupportedOperation {
        /// Operation name as given by the caller
        operation: String,
        /// Comma separated list of supported operations
        supported: String,
    },

    /// Shape violates the rules of the coordinate context
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Shape text could not be parsed
    #[error("Failed to parse {format} shape: {message}")]
    ShapeParse {
        /// Text format that was being parsed
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Type was never introduced to the index manager
    #[error("Type [{0}] is not introduced to the spatial index")]
    UnknownType(String),

    /// Storage for a newly introduced type could not be created
    #[error("Failed to introduce type {type_name}")]
    IntroduceType {
        /// Type being introduced
        type_name: String,
        /// Underlying storage failure
        #[source]
        source: BoxError,
    },

    /// Underlying storage failure during insert, update or remove
    #[error("Failed to {operation} entry of type {type_name} with id [{uid}]")]
    IndexMutation {
        /// Type of the entry
        type_name: String,
        /// Operation that failed
        operation: MutationKind,
        /// Record identifier
        uid: String,
        /// Underlying storage failure
        #[source]
        source: BoxError,
    },

    /// Underlying storage failure while shutting the index down
    #[error("Failed to close spatial index")]
    Close {
        /// Underlying storage failure
        #[source]
        source: BoxError,
    },

    /// Manager was closed before the call
    #[error("Spatial index manager is closed")]
    Closed,

    /// Underlying storage failure while committing, opening a snapshot or searching
    #[error("{message}")]
    QueryExecution {
        /// What was being attempted
        message: String,
        /// Underlying storage failure
        #[source]
        source: BoxError,
    },
}

impl SpatialError {
    /// Build a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        SpatialError::Configuration(message.into())
    }

    /// Build an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        SpatialError::InvalidArgument(message.into())
    }

    /// Build an invalid shape error
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        SpatialError::InvalidShape(message.into())
    }

    /// Wrap a storage failure raised while executing a query
    pub fn query_execution(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        SpatialError::QueryExecution {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Check if this error was raised while resolving configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, SpatialError::Configuration(_))
    }
}
