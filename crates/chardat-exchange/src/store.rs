//! On-disk storage of character blobs, one `<id>.chardat` file per character

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StoreError;
use crate::resolver::CharacterId;

/// File extension of stored character blobs.
pub const BLOB_EXTENSION: &str = "chardat";

/// Result of [`BlobStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// A blob for this id already exists and was left untouched
    Skipped(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, id: CharacterId) -> PathBuf {
        self.root.join(format!("{}.{}", id, BLOB_EXTENSION))
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.path(id).exists()
    }

    /// Write a blob. Existing blobs are never overwritten.
    pub fn save(&self, id: CharacterId, blob: &[u8]) -> Result<SaveOutcome, StoreError> {
        let path = self.path(id);
        fs::create_dir_all(&self.root).map_err(|e| StoreError::from_io(self.root.clone(), e))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!("{:?} already exists and will not be overwritten", path);
                return Ok(SaveOutcome::Skipped(path));
            }
            Err(e) => return Err(StoreError::from_io(path, e)),
        };
        file.write_all(blob)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::from_io(path.clone(), e))?;

        info!("wrote {} bytes to {:?}", blob.len(), path);
        Ok(SaveOutcome::Written(path))
    }

    pub fn load(&self, id: CharacterId) -> Result<Vec<u8>, StoreError> {
        let path = self.path(id);
        let blob = fs::read(&path).map_err(|e| StoreError::from_io(path.clone(), e))?;
        info!("read {} bytes from {:?}", blob.len(), path);
        Ok(blob)
    }

    /// Ids of all stored blobs, sorted.
    pub fn list(&self) -> Result<Vec<CharacterId>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::from_io(self.root.clone(), e)),
        };

        let mut ids: Vec<CharacterId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != BLOB_EXTENSION {
                    return None;
                }
                path.file_stem()?.to_str()?.parse().ok().map(CharacterId)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("characters"));

        let outcome = store.save(CharacterId(7), b"blob").unwrap();
        assert_eq!(outcome, SaveOutcome::Written(store.path(CharacterId(7))));
        assert!(store.path(CharacterId(7)).ends_with("7.chardat"));
        assert_eq!(store.load(CharacterId(7)).unwrap(), b"blob");
    }

    #[test]
    fn existing_blob_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        store.save(CharacterId(1), b"first").unwrap();
        let outcome = store.save(CharacterId(1), b"second").unwrap();
        assert!(matches!(outcome, SaveOutcome::Skipped(_)));
        assert_eq!(store.load(CharacterId(1)).unwrap(), b"first");
    }

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        assert!(matches!(store.load(CharacterId(3)), Err(StoreError::NotFound(_))));
        assert!(!store.contains(CharacterId(3)));
    }

    #[test]
    fn list_only_reports_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("missing"));
        assert!(store.list().unwrap().is_empty());

        let store = BlobStore::new(dir.path());
        store.save(CharacterId(12), b"a").unwrap();
        store.save(CharacterId(2), b"b").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(store.list().unwrap(), vec![CharacterId(2), CharacterId(12)]);
    }
}
