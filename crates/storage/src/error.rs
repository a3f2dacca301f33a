//! Storage error types

use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by directories, segments, writers and readers
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file system failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A file failed validation
    #[error("Corrupted index file {file}: {reason}")]
    Corruption {
        /// File name inside the directory
        file: String,
        /// What was wrong
        reason: String,
    },

    /// MessagePack encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The writer was closed
    #[error("Index writer is closed")]
    Closed,

    /// A reader was asked for a document it does not hold
    #[error("No document {doc} in segment #{segment} of this reader")]
    DocumentNotFound {
        /// Segment position within the reader
        segment: usize,
        /// Document ordinal within the segment
        doc: u32,
    },
}

impl StorageError {
    pub(crate) fn corruption(file: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Corruption {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

impl From<rmp_serde::encode::Error> for StorageError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StorageError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
