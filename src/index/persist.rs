//! On-disk form of the index
//!
//! Two JSON files: the serialized inverted index and the flat document array.
//! Each is written to a temp file in the destination directory and renamed
//! into place. The document array is the source of truth; the ranked index
//! is derived from it whenever the two disagree.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{Document, IndexError, InvertedIndex};

/// Locations of the two index files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub index_path: PathBuf,
    pub documents_path: PathBuf,
}

impl IndexPaths {
    pub fn new(index_path: impl Into<PathBuf>, documents_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            documents_path: documents_path.into(),
        }
    }
}

/// Reads both files
///
/// The document array is authoritative. A missing, unreadable or stale
/// ranked index is rebuilt from it, so a crash between the two renames of
/// [`save`] loses nothing.
///
/// # Returns
///
/// * `Ok(None)` - Neither file exists
/// * `Ok(Some(..))` - The documents and an index that agrees with them
/// * `Err(IndexError)` - The document file is missing or unreadable
pub fn load(paths: &IndexPaths) -> Result<Option<(InvertedIndex, Vec<Document>)>, IndexError> {
    match (paths.index_path.exists(), paths.documents_path.exists()) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(IndexError::Inconsistent(
                "index file exists without a document file".to_string(),
            ))
        }
        _ => {}
    }

    let documents: Vec<Document> = serde_json::from_slice(&fs::read(&paths.documents_path)?)?;

    let index = match read_index(&paths.index_path) {
        Ok(index) if agrees(&index, &documents) => index,
        Ok(index) => {
            warn!(
                "Index holds {} documents, document file holds {}, rebuilding",
                index.len(),
                documents.len()
            );
            rebuild(&documents)
        }
        Err(e) => {
            warn!("Failed to read {}: {}, rebuilding", paths.index_path.display(), e);
            rebuild(&documents)
        }
    };

    Ok(Some((index, documents)))
}

fn read_index(path: &Path) -> Result<InvertedIndex, IndexError> {
    let mut index: InvertedIndex = serde_json::from_slice(&fs::read(path)?)?;
    index.rebuild_lookup();
    Ok(index)
}

fn agrees(index: &InvertedIndex, documents: &[Document]) -> bool {
    index.len() == documents.len() && documents.iter().all(|doc| index.contains(&doc.url))
}

/// Builds a ranked index from scratch over `documents`
fn rebuild(documents: &[Document]) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for doc in documents {
        index.add(&doc.url, &doc.title, &doc.content);
    }
    index
}

/// Writes both files atomically, documents first
///
/// Both payloads are serialized before anything touches the disk.
pub fn save(paths: &IndexPaths, index: &InvertedIndex, documents: &[&Document]) -> Result<(), IndexError> {
    let index_bytes = serde_json::to_vec(index)?;
    let documents_bytes = serde_json::to_vec(documents)?;

    write_atomic(&paths.documents_path, &documents_bytes)?;
    write_atomic(&paths.index_path, &index_bytes)?;
    Ok(())
}

/// Writes `bytes` to `path` through a temp file in the same directory
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp_file = NamedTempFile::new_in(&parent)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Moves unreadable index files aside as `<name>.corrupt`
pub fn quarantine(paths: &IndexPaths) {
    for path in [&paths.index_path, &paths.documents_path] {
        if !path.exists() {
            continue;
        }
        let aside = corrupt_path(path);
        match fs::rename(path, &aside) {
            Ok(()) => info!("Moved unreadable index file to {}", aside.display()),
            Err(e) => warn!("Failed to move {} aside: {}", path.display(), e),
        }
    }
}

/// Deletes both files, ignoring ones that do not exist
pub fn delete(paths: &IndexPaths) -> Result<(), IndexError> {
    for path in [&paths.index_path, &paths.documents_path] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

pub(crate) fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}
