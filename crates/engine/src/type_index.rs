//! Per-type index state
//!
//! A [`TypeIndex`] owns the writer of one record type and decides when
//! buffered mutations are flushed. Every non-forced commit counts one
//! change; the call whose change reaches the threshold flushes and resets
//! the count. Counting and deciding is a single atomic step, so `threshold`
//! non-forced commits flush exactly once however they interleave.

use spatia_core::TypeQueryExtension;
use spatia_storage::{Directory, IndexWriter, Result};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Index of one record type
pub struct TypeIndex {
    type_name: String,
    writer: IndexWriter,
    query_extension: TypeQueryExtension,
    uncommitted: AtomicUsize,
    max_uncommitted_changes: usize,
    flushes: AtomicU64,
}

impl TypeIndex {
    /// Create an empty index in `directory`
    pub fn create(
        type_name: impl Into<String>,
        directory: Directory,
        query_extension: TypeQueryExtension,
        max_uncommitted_changes: usize,
    ) -> Result<Self> {
        Ok(TypeIndex {
            type_name: type_name.into(),
            writer: IndexWriter::create(directory)?,
            query_extension,
            uncommitted: AtomicUsize::new(0),
            max_uncommitted_changes: max_uncommitted_changes.max(1),
            flushes: AtomicU64::new(0),
        })
    }

    /// Record type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Writer of the index
    pub fn writer(&self) -> &IndexWriter {
        &self.writer
    }

    /// Storage of the index
    pub fn directory(&self) -> &Directory {
        self.writer.directory()
    }

    /// Indexed paths of the type
    pub fn query_extension(&self) -> &TypeQueryExtension {
        &self.query_extension
    }

    /// Indexed paths of the type, in registration order
    pub fn paths(&self) -> &[String] {
        self.query_extension.paths()
    }

    /// Count a change and flush if forced or the threshold is reached
    ///
    /// Returns whether a flush happened.
    pub fn commit(&self, force: bool) -> Result<bool> {
        let threshold = self.max_uncommitted_changes;
        let flush = if force {
            self.uncommitted.store(0, Ordering::Release);
            true
        } else {
            let previous = self
                .uncommitted
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    Some(if n + 1 >= threshold { 0 } else { n + 1 })
                })
                .unwrap_or_else(|n| n);
            previous + 1 >= threshold
        };
        if !flush {
            return Ok(false);
        }
        let changed = self.writer.commit()?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "spatia::index",
            type_name = %self.type_name,
            force,
            changed,
            generation = self.writer.generation(),
            "Flushed type index"
        );
        Ok(true)
    }

    /// Number of flushes so far, forced ones included
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Changes counted since the last flush
    pub fn uncommitted_changes(&self) -> usize {
        self.uncommitted.load(Ordering::Acquire)
    }

    /// Number of commits that changed the index
    pub fn commit_generation(&self) -> u64 {
        self.writer.generation()
    }

    /// Flush and close the writer; files are left in place
    pub fn close(&self) -> Result<()> {
        self.writer.close()
    }
}

impl std::fmt::Debug for TypeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeIndex")
            .field("type_name", &self.type_name)
            .field("directory", self.writer.directory())
            .field("uncommitted", &self.uncommitted_changes())
            .field("max_uncommitted_changes", &self.max_uncommitted_changes)
            .finish()
    }
}
