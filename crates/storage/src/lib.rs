//! Document index engine for Spatia
//!
//! This crate implements the small inverted index the spatial engine stores
//! its documents in:
//! - Directory: MMap (on disk, memory-mapped reads) or RAM storage
//! - IndexWriter: buffered add / delete-by-term, atomic commit
//! - IndexReader: point-in-time snapshot with unranked search
//! - Query: term, any-term, match-all and stored-field filtered selection
//!
//! Committed state is a set of immutable segment files plus one manifest
//! replaced atomically on every commit.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod document;
pub mod error;
mod manifest;
pub mod query;
pub mod reader;
pub mod segment;
pub mod writer;

pub use directory::{Directory, FileData};
pub use document::{Document, Field, FieldKind, StoredDocument, StoredValue, Term};
pub use error::{Result, StorageError};
pub use query::{DocFilter, Query};
pub use reader::{DocAddress, IndexReader};
pub use segment::Segment;
pub use writer::{IndexWriter, MERGE_SEGMENT_THRESHOLD};
