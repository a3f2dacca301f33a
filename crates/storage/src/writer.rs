//! Index writer
//!
//! Buffers document additions and term deletions, and makes them visible
//! atomically on [`IndexWriter::commit`].
//!
//! ## Commit protocol
//!
//! 1. Drain the pending operations (in call order)
//! 2. Apply each delete to every committed segment (recorded as deleted
//!    ordinals) and to the additions buffered before it
//! 3. Write the surviving additions as one new segment
//! 4. Once more than [`MERGE_SEGMENT_THRESHOLD`] segments are live, rewrite
//!    their live documents as one segment
//! 5. Write the new manifest atomically; this is the commit point
//! 6. Delete segment files the new manifest no longer lists
//!
//! Adds and deletes may be called from any number of threads. Commits are
//! serialized by the commit lock.
//!
//! Readers decode a segment when they open it, and a reader racing a
//! deletion reloads the manifest, so removed files are never read again.

use crate::directory::Directory;
use crate::document::{Document, StoredDocument, Term};
use crate::error::{Result, StorageError};
use crate::manifest::{self, ManifestData, SegmentManifestEntry};
use crate::segment::{encode_segment, is_segment_file, segment_file_name, Segment};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Live segment count above which a commit merges all segments into one
pub const MERGE_SEGMENT_THRESHOLD: usize = 8;

type SegmentDocs = Vec<(Vec<Term>, StoredDocument)>;

enum PendingOp {
    Add(Document),
    Delete(Term),
}

/// State owned by the commit lock
struct CommitState {
    manifest: ManifestData,
    segments: HashMap<u64, Arc<Segment>>,
}

impl CommitState {
    fn segment(&mut self, directory: &Directory, segment_id: u64) -> Result<Arc<Segment>> {
        if let Some(segment) = self.segments.get(&segment_id) {
            return Ok(Arc::clone(segment));
        }
        let segment = Arc::new(Segment::open(directory, segment_id)?);
        self.segments.insert(segment_id, Arc::clone(&segment));
        Ok(segment)
    }
}

/// Writer for one index directory
pub struct IndexWriter {
    directory: Directory,
    pending: Mutex<Vec<PendingOp>>,
    commit_lock: Mutex<CommitState>,
    generation: AtomicU64,
    closed: AtomicBool,
}

impl IndexWriter {
    /// Create a fresh index in `directory`, discarding whatever it held
    pub fn create(directory: Directory) -> Result<Self> {
        directory.clear()?;
        let manifest = ManifestData::default();
        manifest::write_manifest(&directory, &manifest)?;
        info!(target: "spatia::storage", directory = ?directory, "Created index");
        Ok(IndexWriter {
            directory,
            pending: Mutex::new(Vec::new()),
            commit_lock: Mutex::new(CommitState {
                manifest,
                segments: HashMap::new(),
            }),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Directory this writer commits to
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Buffer a document addition
    pub fn add_document(&self, document: Document) -> Result<()> {
        self.ensure_open()?;
        self.pending.lock().push(PendingOp::Add(document));
        Ok(())
    }

    /// Buffer deletion of every document holding `term`
    pub fn delete_documents(&self, term: Term) -> Result<()> {
        self.ensure_open()?;
        self.pending.lock().push(PendingOp::Delete(term));
        Ok(())
    }

    /// Number of buffered operations
    pub fn pending_operations(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of commits that changed the index
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Make all buffered operations durable and visible to new readers
    ///
    /// Returns `false` if there was nothing to commit.
    pub fn commit(&self) -> Result<bool> {
        let mut state = self.commit_lock.lock();
        self.ensure_open()?;
        self.commit_locked(&mut state)
    }

    fn commit_locked(&self, state: &mut CommitState) -> Result<bool> {
        let ops = std::mem::take(&mut *self.pending.lock());
        if ops.is_empty() {
            return Ok(false);
        }

        let mut manifest = state.manifest.clone();
        let mut added: Vec<Option<(Vec<Term>, StoredDocument)>> = Vec::new();
        let mut deletes = 0usize;

        for op in ops {
            match op {
                PendingOp::Add(document) => added.push(Some(document.into_parts())),
                PendingOp::Delete(term) => {
                    deletes += 1;
                    for entry in manifest.segments.iter_mut() {
                        let segment = state.segment(&self.directory, entry.segment_id)?;
                        entry.deleted.extend(segment.postings(&term).iter().copied());
                    }
                    for slot in added.iter_mut() {
                        if matches!(slot, Some((terms, _)) if terms.binary_search(&term).is_ok()) {
                            *slot = None;
                        }
                    }
                }
            }
        }

        let docs: SegmentDocs = added.into_iter().flatten().collect();
        let added = docs.len();
        self.write_segment(&mut manifest, &docs)?;

        manifest.segments.retain(|entry| !entry.is_fully_deleted());
        if manifest.segments.len() > MERGE_SEGMENT_THRESHOLD {
            self.merge_segments(state, &mut manifest)?;
        }
        manifest.generation += 1;
        manifest::write_manifest(&self.directory, &manifest)?;

        state
            .segments
            .retain(|id, _| manifest.segments.iter().any(|e| e.segment_id == *id));
        self.remove_unreferenced_segments(&manifest);
        debug!(
            target: "spatia::storage",
            generation = manifest.generation,
            added,
            deletes,
            segments = manifest.segments.len(),
            "Committed index generation"
        );
        self.generation.store(manifest.generation, Ordering::Release);
        state.manifest = manifest;
        Ok(true)
    }

    /// Write `docs` as a new segment and list it in `manifest`
    fn write_segment(
        &self,
        manifest: &mut ManifestData,
        docs: &[(Vec<Term>, StoredDocument)],
    ) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let segment_id = manifest.next_segment_id;
        manifest.next_segment_id += 1;
        let bytes = encode_segment(segment_id, docs)?;
        self.directory
            .write_atomic(&segment_file_name(segment_id), &bytes)?;
        manifest.segments.push(SegmentManifestEntry {
            segment_id,
            doc_count: docs.len() as u32,
            deleted: BTreeSet::new(),
        });
        Ok(())
    }

    /// Replace every segment of `manifest` by one holding their live documents
    ///
    /// Documents keep their native order.
    fn merge_segments(&self, state: &mut CommitState, manifest: &mut ManifestData) -> Result<()> {
        let mut docs = SegmentDocs::new();
        for entry in &manifest.segments {
            let segment = state.segment(&self.directory, entry.segment_id)?;
            docs.extend(segment.live_documents(&entry.deleted)?);
        }
        let merged = std::mem::take(&mut manifest.segments).len();
        self.write_segment(manifest, &docs)?;
        debug!(
            target: "spatia::storage",
            merged,
            docs = docs.len(),
            "Merged segments"
        );
        Ok(())
    }

    /// Delete segment files that `manifest` does not list
    ///
    /// Failures are logged: a leftover file is retried on the next commit.
    fn remove_unreferenced_segments(&self, manifest: &ManifestData) {
        let live: HashSet<String> = manifest
            .segments
            .iter()
            .map(|entry| segment_file_name(entry.segment_id))
            .collect();
        let names = match self.directory.list() {
            Ok(names) => names,
            Err(e) => {
                warn!(target: "spatia::storage", error = %e, "Failed to list index files");
                return;
            }
        };
        for name in names {
            if !is_segment_file(&name) || live.contains(&name) {
                continue;
            }
            match self.directory.delete(&name) {
                Ok(()) => debug!(target: "spatia::storage", file = %name, "Deleted segment file"),
                Err(e) => warn!(
                    target: "spatia::storage",
                    file = %name,
                    error = %e,
                    "Failed to delete segment file"
                ),
            }
        }
    }

    /// Commit outstanding operations and stop accepting new ones
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.commit_lock.lock();
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        let result = self.commit_locked(&mut state).map(|_| ());
        self.closed.store(true, Ordering::Release);
        state.segments.clear();
        result
    }

    /// Check if the writer was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("directory", &self.directory)
            .field("generation", &self.generation())
            .field("closed", &self.is_closed())
            .finish()
    }
}
