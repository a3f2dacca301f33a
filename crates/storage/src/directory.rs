//! Index directories
//!
//! A [`Directory`] is a flat namespace of immutable files. Two backends:
//!
//! - `MMap`: files under a path on disk, read through `memmap2`
//! - `Ram`: files held in process memory, shared between clones
//!
//! Files are only ever written whole via [`Directory::write_atomic`]
//! (temp + fsync + rename on disk), so a reader never observes a partially
//! written file.

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TMP_SUFFIX: &str = ".tmp";

// ============================================================================
// FileData
// ============================================================================

/// Contents of an opened file
pub enum FileData {
    /// Memory-mapped file
    Mmap(memmap2::Mmap),
    /// In-memory file shared with the directory
    Shared(Arc<Vec<u8>>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Shared(v) => v,
        }
    }
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileData::Mmap(m) => write!(f, "FileData::Mmap({} bytes)", m.len()),
            FileData::Shared(v) => write!(f, "FileData::Shared({} bytes)", v.len()),
        }
    }
}

// ============================================================================
// Directory
// ============================================================================

type RamFiles = Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>;

/// Storage handle for one index
#[derive(Clone)]
pub enum Directory {
    /// Files on disk under a root path
    MMap(PathBuf),
    /// Files in process memory
    Ram(RamFiles),
}

impl Directory {
    /// Open (creating if needed) an on-disk directory
    pub fn mmap(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Directory::MMap(path))
    }

    /// Fresh empty in-memory directory
    pub fn ram() -> Self {
        Directory::Ram(Arc::new(RwLock::new(HashMap::new())))
    }

    /// Root path of an on-disk directory
    pub fn path(&self) -> Option<&Path> {
        match self {
            Directory::MMap(path) => Some(path),
            Directory::Ram(_) => None,
        }
    }

    /// Write a whole file, replacing any previous content atomically
    pub fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        match self {
            Directory::MMap(root) => {
                let path = root.join(name);
                let tmp_path = root.join(format!("{}{}", name, TMP_SUFFIX));
                {
                    let mut file = fs::File::create(&tmp_path)?;
                    file.write_all(bytes)?;
                    file.sync_all()?;
                }
                fs::rename(&tmp_path, &path)?;
                Ok(())
            }
            Directory::Ram(files) => {
                files
                    .write()
                    .insert(name.to_string(), Arc::new(bytes.to_vec()));
                Ok(())
            }
        }
    }

    /// Open a file for reading
    pub fn open_file(&self, name: &str) -> Result<FileData> {
        match self {
            Directory::MMap(root) => {
                let file = fs::File::open(root.join(name))?;
                // SAFETY: files are written once via rename and never modified in place
                let mmap = unsafe { memmap2::Mmap::map(&file)? };
                Ok(FileData::Mmap(mmap))
            }
            Directory::Ram(files) => files
                .read()
                .get(name)
                .cloned()
                .map(FileData::Shared)
                .ok_or_else(|| not_found(name).into()),
        }
    }

    /// Check if a file exists
    pub fn exists(&self, name: &str) -> bool {
        match self {
            Directory::MMap(root) => root.join(name).is_file(),
            Directory::Ram(files) => files.read().contains_key(name),
        }
    }

    /// Names of all files, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = match self {
            Directory::MMap(root) => {
                let mut names = Vec::new();
                for entry in fs::read_dir(root)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        if let Some(name) = entry.file_name().to_str() {
                            names.push(name.to_string());
                        }
                    }
                }
                names
            }
            Directory::Ram(files) => files.read().keys().cloned().collect(),
        };
        names.sort();
        Ok(names)
    }

    /// Delete a file
    pub fn delete(&self, name: &str) -> Result<()> {
        match self {
            Directory::MMap(root) => Ok(fs::remove_file(root.join(name))?),
            Directory::Ram(files) => match files.write().remove(name) {
                Some(_) => Ok(()),
                None => Err(not_found(name).into()),
            },
        }
    }

    /// Delete every file
    pub fn clear(&self) -> Result<()> {
        match self {
            Directory::MMap(_) => {
                for name in self.list()? {
                    self.delete(&name)?;
                }
                Ok(())
            }
            Directory::Ram(files) => {
                files.write().clear();
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directory::MMap(path) => write!(f, "MMapDirectory({})", path.display()),
            Directory::Ram(files) => write!(f, "RAMDirectory({} files)", files.read().len()),
        }
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", name))
}
