//! Segment manifest for persisting committed index state
//!
//! The manifest (`segments.manifest`) stores:
//! - Commit generation
//! - Next segment id to assign
//! - Live segment list with per-segment deleted doc ordinals
//!
//! Written atomically via the directory (temp + rename on disk). A reader
//! that loads the manifest sees exactly one committed generation.

use crate::directory::Directory;
use crate::error::{Result, StorageError};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Magic bytes for the segment manifest
const MANIFEST_MAGIC: &[u8; 4] = b"SPMF";
/// Current manifest version
const MANIFEST_VERSION: u32 = 1;
/// Manifest file name inside an index directory
pub(crate) const MANIFEST_FILE: &str = "segments.manifest";

// ============================================================================
// Manifest Data (serializable)
// ============================================================================

/// Serializable representation of one committed index generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ManifestData {
    /// Number of commits so far
    pub generation: u64,
    /// Next segment ID to assign
    pub next_segment_id: u64,
    /// Segments visible in this generation, oldest first
    pub segments: Vec<SegmentManifestEntry>,
}

/// Manifest entry for a single segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SegmentManifestEntry {
    /// Unique segment identifier
    pub segment_id: u64,
    /// Number of documents in this segment
    pub doc_count: u32,
    /// Deleted doc ordinals
    pub deleted: BTreeSet<u32>,
}

impl SegmentManifestEntry {
    /// Check if every document of the segment is deleted
    pub fn is_fully_deleted(&self) -> bool {
        self.deleted.len() >= self.doc_count as usize
    }
}

// ============================================================================
// Read / Write
// ============================================================================

/// Write manifest data atomically.
pub(crate) fn write_manifest(directory: &Directory, data: &ManifestData) -> Result<()> {
    let payload = rmp_serde::to_vec(data)?;

    // Build final buffer: magic + version + payload
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(MANIFEST_MAGIC);
    buf.extend_from_slice(&MANIFEST_VERSION.to_le_bytes());
    buf.extend_from_slice(&payload);

    directory.write_atomic(MANIFEST_FILE, &buf)
}

/// Load manifest data.
pub(crate) fn load_manifest(directory: &Directory) -> Result<ManifestData> {
    let buf = directory.open_file(MANIFEST_FILE)?;
    if buf.len() < 8 {
        return Err(StorageError::corruption(MANIFEST_FILE, "manifest too small"));
    }
    if &buf[0..4] != MANIFEST_MAGIC {
        return Err(StorageError::corruption(MANIFEST_FILE, "bad manifest magic"));
    }
    let version = LittleEndian::read_u32(&buf[4..8]);
    if version != MANIFEST_VERSION {
        return Err(StorageError::corruption(
            MANIFEST_FILE,
            format!("unsupported manifest version {}", version),
        ));
    }
    Ok(rmp_serde::from_slice(&buf[8..])?)
}

// ============================================================================
// Tests
// ============================================================================
