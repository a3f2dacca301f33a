//! Immutable segment file format (.sps)
//!
//! Each commit that adds documents writes exactly one segment. Segments are
//! never modified after they are written; deletions are tracked in the
//! manifest.
//!
//! ## File Format
//!
//! ```text
//! HEADER (36 bytes):
//!   magic "SPSG"            4B
//!   version                 u32 LE
//!   segment_id              u64 LE
//!   doc_count               u32 LE
//!   postings_len            u64 LE
//!   docs_len                u64 LE
//!
//! POSTINGS (postings_len bytes):
//!   MessagePack map "field\0text" -> ascending doc ordinals
//!
//! DOC OFFSET TABLE ((doc_count + 1) x 8 bytes):
//!   per doc: start offset   u64 LE   -> relative to docs section start
//!   final entry is docs_len
//!
//! DOCS (docs_len bytes):
//!   MessagePack stored documents, back to back
//!
//! FOOTER:
//!   crc32 of everything above  u32 LE
//! ```

use crate::directory::{Directory, FileData};
use crate::document::{StoredDocument, Term};
use crate::error::{Result, StorageError};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet};

/// Magic bytes for .sps files
const SEGMENT_MAGIC: &[u8; 4] = b"SPSG";
/// Current format version
const SEGMENT_VERSION: u32 = 1;
/// Header size in bytes
const HEADER_SIZE: usize = 36;
/// Footer size in bytes
const FOOTER_SIZE: usize = 4;

/// File name of a segment inside its directory
pub(crate) fn segment_file_name(segment_id: u64) -> String {
    format!("seg_{:010}.sps", segment_id)
}

/// Check if a directory file name is a segment file
pub(crate) fn is_segment_file(name: &str) -> bool {
    name.starts_with("seg_") && name.ends_with(".sps")
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a segment from documents given as (terms, stored fields)
pub(crate) fn encode_segment(
    segment_id: u64,
    docs: &[(Vec<Term>, StoredDocument)],
) -> Result<Vec<u8>> {
    let mut postings: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for (ord, (terms, _)) in docs.iter().enumerate() {
        for term in terms {
            postings.entry(term.key()).or_default().push(ord as u32);
        }
    }
    let postings_bytes = rmp_serde::to_vec(&postings)?;

    let mut offsets = Vec::with_capacity(docs.len() + 1);
    let mut docs_bytes = Vec::new();
    for (_, stored) in docs {
        offsets.push(docs_bytes.len() as u64);
        rmp_serde::encode::write(&mut docs_bytes, stored)?;
    }
    offsets.push(docs_bytes.len() as u64);

    let total = HEADER_SIZE
        + postings_bytes.len()
        + offsets.len() * 8
        + docs_bytes.len()
        + FOOTER_SIZE;
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(SEGMENT_MAGIC);
    buf.write_u32::<LittleEndian>(SEGMENT_VERSION)?;
    buf.write_u64::<LittleEndian>(segment_id)?;
    buf.write_u32::<LittleEndian>(docs.len() as u32)?;
    buf.write_u64::<LittleEndian>(postings_bytes.len() as u64)?;
    buf.write_u64::<LittleEndian>(docs_bytes.len() as u64)?;
    buf.extend_from_slice(&postings_bytes);
    for offset in offsets {
        buf.write_u64::<LittleEndian>(offset)?;
    }
    buf.extend_from_slice(&docs_bytes);
    let crc = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(crc)?;
    Ok(buf)
}

// ============================================================================
// Segment
// ============================================================================

/// An opened, validated segment
#[derive(Debug)]
pub struct Segment {
    data: FileData,
    segment_id: u64,
    doc_count: u32,
    postings: BTreeMap<String, Vec<u32>>,
    offsets_start: usize,
    docs_start: usize,
}

impl Segment {
    /// Open a segment from a directory
    pub(crate) fn open(directory: &Directory, segment_id: u64) -> Result<Self> {
        let name = segment_file_name(segment_id);
        let data = directory.open_file(&name)?;
        Self::from_data(&name, data)
    }

    fn from_data(name: &str, data: FileData) -> Result<Self> {
        let bytes: &[u8] = &data;
        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(StorageError::corruption(name, "segment too small"));
        }
        if &bytes[0..4] != SEGMENT_MAGIC {
            return Err(StorageError::corruption(name, "bad segment magic"));
        }
        let version = LittleEndian::read_u32(&bytes[4..8]);
        if version != SEGMENT_VERSION {
            return Err(StorageError::corruption(
                name,
                format!("unsupported segment version {}", version),
            ));
        }
        let body_len = bytes.len() - FOOTER_SIZE;
        let expected_crc = LittleEndian::read_u32(&bytes[body_len..]);
        if crc32fast::hash(&bytes[..body_len]) != expected_crc {
            return Err(StorageError::corruption(name, "checksum mismatch"));
        }

        let segment_id = LittleEndian::read_u64(&bytes[8..16]);
        let doc_count = LittleEndian::read_u32(&bytes[16..20]);
        let postings_len = LittleEndian::read_u64(&bytes[20..28]) as usize;
        let docs_len = LittleEndian::read_u64(&bytes[28..36]) as usize;

        let offsets_start = HEADER_SIZE + postings_len;
        let docs_start = offsets_start + (doc_count as usize + 1) * 8;
        if docs_start + docs_len != body_len {
            return Err(StorageError::corruption(name, "section lengths do not add up"));
        }

        let postings = rmp_serde::from_slice(&bytes[HEADER_SIZE..offsets_start])?;

        Ok(Segment {
            segment_id,
            doc_count,
            postings,
            offsets_start,
            docs_start,
            data,
        })
    }

    /// Segment ID
    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    /// Number of documents in this segment, including deleted ones
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Ordinals of documents holding a term, ascending
    pub fn postings(&self, term: &Term) -> &[u32] {
        self.postings_by_key(&term.key())
    }

    pub(crate) fn postings_by_key(&self, key: &str) -> &[u32] {
        self.postings.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stored fields of a document
    pub fn document(&self, ord: u32) -> Result<StoredDocument> {
        if ord >= self.doc_count {
            return Err(StorageError::corruption(
                segment_file_name(self.segment_id),
                format!("document {} out of range ({} docs)", ord, self.doc_count),
            ));
        }
        let bytes: &[u8] = &self.data;
        let entry = self.offsets_start + ord as usize * 8;
        let start = LittleEndian::read_u64(&bytes[entry..entry + 8]) as usize;
        let end = LittleEndian::read_u64(&bytes[entry + 8..entry + 16]) as usize;
        if start > end || self.docs_start + end > bytes.len() - FOOTER_SIZE {
            return Err(StorageError::corruption(
                segment_file_name(self.segment_id),
                format!("bad offsets for document {}", ord),
            ));
        }
        Ok(rmp_serde::from_slice(
            &bytes[self.docs_start + start..self.docs_start + end],
        )?)
    }

    /// Terms and stored fields of every document not in `deleted`, in ordinal order
    ///
    /// Inverts the postings, so the result can be re-encoded into a new segment.
    pub(crate) fn live_documents(
        &self,
        deleted: &BTreeSet<u32>,
    ) -> Result<Vec<(Vec<Term>, StoredDocument)>> {
        let mut terms: Vec<Vec<Term>> = vec![Vec::new(); self.doc_count as usize];
        for (key, ords) in &self.postings {
            let term = Term::from_key(key).ok_or_else(|| {
                StorageError::corruption(segment_file_name(self.segment_id), "bad postings key")
            })?;
            for &ord in ords {
                match terms.get_mut(ord as usize) {
                    Some(doc_terms) => doc_terms.push(term.clone()),
                    None => {
                        return Err(StorageError::corruption(
                            segment_file_name(self.segment_id),
                            format!("posting {} out of range", ord),
                        ))
                    }
                }
            }
        }
        terms
            .into_iter()
            .enumerate()
            .filter(|(ord, _)| !deleted.contains(&(*ord as u32)))
            .map(|(ord, mut doc_terms)| {
                doc_terms.sort();
                Ok((doc_terms, self.document(ord as u32)?))
            })
            .collect()
    }
}
