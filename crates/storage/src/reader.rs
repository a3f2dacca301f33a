//! Point-in-time index reader
//!
//! A reader loads the manifest once and opens the segments it lists. Later
//! commits are invisible to it.

use crate::directory::Directory;
use crate::document::StoredDocument;
use crate::error::{Result, StorageError};
use crate::manifest::{self, ManifestData};
use crate::query::Query;
use crate::segment::Segment;
use std::collections::BTreeSet;
use std::io;
use tracing::debug;

/// Manifest reloads tolerated while commits delete segments under a reader
const OPEN_ATTEMPTS: usize = 16;

/// Position of a document within a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocAddress {
    /// Segment position within the reader
    pub segment: usize,
    /// Document ordinal within the segment
    pub doc: u32,
}

struct ReaderSegment {
    segment: Segment,
    deleted: BTreeSet<u32>,
}

/// Snapshot of one committed index generation
pub struct IndexReader {
    generation: u64,
    segments: Vec<ReaderSegment>,
}

impl IndexReader {
    /// Open the latest committed generation of `directory`
    ///
    /// A segment deleted by a commit racing this call is not an error: the
    /// manifest is reloaded and the newer generation opened instead.
    pub fn open(directory: &Directory) -> Result<Self> {
        let mut attempt = 1;
        loop {
            let manifest = manifest::load_manifest(directory)?;
            match Self::open_manifest(directory, manifest) {
                Err(StorageError::Io(e))
                    if e.kind() == io::ErrorKind::NotFound && attempt < OPEN_ATTEMPTS =>
                {
                    debug!(
                        target: "spatia::storage",
                        attempt,
                        "Segment deleted while opening reader, reloading manifest"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn open_manifest(directory: &Directory, manifest: ManifestData) -> Result<Self> {
        let segments = manifest
            .segments
            .into_iter()
            .map(|entry| {
                Ok(ReaderSegment {
                    segment: Segment::open(directory, entry.segment_id)?,
                    deleted: entry.deleted,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IndexReader {
            generation: manifest.generation,
            segments,
        })
    }

    /// Commit generation this reader sees
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of segments in the snapshot
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of live documents
    pub fn num_docs(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.segment.doc_count() as usize - s.deleted.len())
            .sum()
    }

    /// Run a query, returning at most `limit` matches in native order
    pub fn search(&self, query: &Query, limit: usize) -> Result<Vec<DocAddress>> {
        let mut hits = Vec::new();
        for (position, reader_segment) in self.segments.iter().enumerate() {
            if hits.len() >= limit {
                break;
            }
            let ords = query.matching(&reader_segment.segment, &reader_segment.deleted)?;
            let remaining = limit - hits.len();
            hits.extend(ords.into_iter().take(remaining).map(|doc| DocAddress {
                segment: position,
                doc,
            }));
        }
        Ok(hits)
    }

    /// Stored fields of a matched document
    pub fn document(&self, address: DocAddress) -> Result<StoredDocument> {
        let not_found = || StorageError::DocumentNotFound {
            segment: address.segment,
            doc: address.doc,
        };
        let reader_segment = self.segments.get(address.segment).ok_or_else(not_found)?;
        if address.doc >= reader_segment.segment.doc_count() {
            return Err(not_found());
        }
        reader_segment.segment.document(address.doc)
    }
}

impl std::fmt::Debug for IndexReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexReader")
            .field("generation", &self.generation)
            .field("segments", &self.segments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Field, StoredValue, Term};
    use crate::query::DocFilter;
    use crate::writer::IndexWriter;

    #[derive(Debug)]
    struct MinX(f64);

    impl DocFilter for MinX {
        fn matches(&self, doc: &StoredDocument) -> bool {
            doc.get_doubles("box").is_some_and(|b| b[0] >= self.0)
        }
    }

    fn populated() -> IndexWriter {
        let writer = IndexWriter::create(Directory::ram()).unwrap();
        for batch in 0..2 {
            for i in 0..3 {
                let n = batch * 3 + i;
                let mut doc = Document::new();
                doc.add(Field::keyword("id", format!("d{}", n)));
                doc.add(Field::indexed("cell", vec![format!("c{}", n % 2)]));
                doc.add(Field::stored("box", StoredValue::Doubles(vec![n as f64])));
                writer.add_document(doc).unwrap();
            }
            writer.commit().unwrap();
        }
        writer
    }

    fn id_list(reader: &IndexReader, hits: &[DocAddress]) -> Vec<String> {
        hits.iter()
            .map(|a| reader.document(*a).unwrap().get_text("id").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_native_order_across_segments() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();
        assert_eq!(reader.segment_count(), 2);
        assert_eq!(reader.generation(), 2);
        let hits = reader.search(&Query::MatchAll, usize::MAX).unwrap();
        assert_eq!(id_list(&reader, &hits), vec!["d0", "d1", "d2", "d3", "d4", "d5"]);
    }

    #[test]
    fn test_term_and_any_term() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();

        let hits = reader.search(&Query::Term(Term::new("cell", "c1")), usize::MAX).unwrap();
        assert_eq!(id_list(&reader, &hits), vec!["d1", "d3", "d5"]);

        let any = Query::AnyTerm {
            field: "cell".to_string(),
            texts: vec!["c0".to_string(), "c1".to_string(), "zz".to_string()],
        };
        assert_eq!(reader.search(&any, usize::MAX).unwrap().len(), 6);
    }

    #[test]
    fn test_filtered_query() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();
        let query = Query::filtered(Query::Term(Term::new("cell", "c0")), MinX(2.0));
        let hits = reader.search(&query, usize::MAX).unwrap();
        assert_eq!(id_list(&reader, &hits), vec!["d2", "d4"]);
    }

    #[test]
    fn test_limit() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();
        assert_eq!(reader.search(&Query::MatchAll, 4).unwrap().len(), 4);
        assert!(reader.search(&Query::MatchAll, 0).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_isolation() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();
        writer.delete_documents(Term::new("id", "d0")).unwrap();
        writer.commit().unwrap();

        assert_eq!(reader.num_docs(), 6);
        assert_eq!(IndexReader::open(writer.directory()).unwrap().num_docs(), 5);
    }

    #[test]
    fn test_open_races_segment_deletion() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let writer = Arc::new(IndexWriter::create(Directory::ram()).unwrap());
        let done = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let directory = writer.directory().clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut opened = 0;
                    loop {
                        let reader = IndexReader::open(&directory).unwrap();
                        assert!(reader.num_docs() <= 1);
                        opened += 1;
                        if done.load(Ordering::Acquire) {
                            return opened;
                        }
                    }
                })
            })
            .collect();

        for version in 0..100 {
            writer.delete_documents(Term::new("id", "u")).unwrap();
            let mut doc = Document::new();
            doc.add(Field::keyword("id", "u"));
            doc.add(Field::keyword("version", format!("u_{}", version)));
            writer.add_document(doc).unwrap();
            writer.commit().unwrap();
        }
        done.store(true, Ordering::Release);
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(IndexReader::open(writer.directory()).unwrap().num_docs(), 1);
    }

    #[test]
    fn test_bad_address() {
        let writer = populated();
        let reader = IndexReader::open(writer.directory()).unwrap();
        let err = reader.document(DocAddress { segment: 9, doc: 0 }).unwrap_err();
        assert!(matches!(err, StorageError::DocumentNotFound { segment: 9, doc: 0 }));
        assert!(reader.document(DocAddress { segment: 0, doc: 3 }).is_err());
    }
}
