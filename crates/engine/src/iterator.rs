//! Query result iterator
//!
//! Matches are collected when the query runs; identifiers are resolved one
//! at a time from the reader snapshot the query ran against.

use crate::manager::SPATIA_ID;
use spatia_core::{Result, SpatialError};
use spatia_storage::{DocAddress, IndexReader};

const NEXT_ITEM_FAILED: &str = "Failed to get next item";

/// Forward-only sequence of matching record identifiers
///
/// Dropping or closing the iterator releases its snapshot.
pub struct SpatialQueryIterator {
    reader: IndexReader,
    hits: Vec<DocAddress>,
    position: usize,
    prematched_path: Option<String>,
}

impl SpatialQueryIterator {
    pub(crate) fn new(
        reader: IndexReader,
        hits: Vec<DocAddress>,
        prematched_path: Option<String>,
    ) -> Self {
        SpatialQueryIterator {
            reader,
            hits,
            position: 0,
            prematched_path,
        }
    }

    /// Check if another match is available
    pub fn has_next(&self) -> bool {
        self.position < self.hits.len()
    }

    /// Identifier of the next match
    ///
    /// # Errors
    ///
    /// Returns `QueryExecution` if the stored identifier cannot be read, and
    /// `InvalidArgument` once the iterator is exhausted.
    pub fn next_uid(&mut self) -> Result<String> {
        let Some(&address) = self.hits.get(self.position) else {
            return Err(SpatialError::invalid_argument("Query iterator is exhausted"));
        };
        self.position += 1;
        let document = self
            .reader
            .document(address)
            .map_err(|e| SpatialError::query_execution(NEXT_ITEM_FAILED, e))?;
        document
            .get_text(SPATIA_ID)
            .map(str::to_string)
            .ok_or_else(|| {
                SpatialError::query_execution(
                    NEXT_ITEM_FAILED,
                    format!("document {:?} has no {} field", address, SPATIA_ID),
                )
            })
    }

    /// Path whose matches need no re-verification, if any
    pub fn prematched_path(&self) -> Option<&str> {
        self.prematched_path.as_deref()
    }

    /// Check if matches on `path` are already exact
    pub fn is_already_matched(&self, path: &str) -> bool {
        self.prematched_path() == Some(path)
    }

    /// Total number of matches
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Check if the query matched nothing
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Release the snapshot
    pub fn close(self) {}
}

impl Iterator for SpatialQueryIterator {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_uid())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.hits.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl std::fmt::Debug for SpatialQueryIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialQueryIterator")
            .field("generation", &self.reader.generation())
            .field("position", &self.position)
            .field("hits", &self.hits.len())
            .field("prematched_path", &self.prematched_path)
            .finish()
    }
}
