//! JSON database persistence
//!
//! Saves and loads a whole bookmark tree as one JSON file. Saves use atomic
//! writes (write to temp file, then rename) so a database is never left
//! half-written.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;

use super::document::TreeDocument;
use super::error::{StorageError, StorageResult};
use crate::tree::BookmarkTree;

/// Persistence handler bound to one database file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the database file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the database file holding `tree`
    ///
    /// Fails with `AlreadyExists` if the file is already there.
    pub fn create(&self, tree: &BookmarkTree) -> StorageResult<()> {
        ensure_parent_dir(&self.path)?;
        let json = tree.to_document().to_json()?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| StorageError::from_io(e, self.path.clone(), true))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::from_io(e, self.path.clone(), true))?;

        tracing::info!(path = %self.path.display(), "created database");
        Ok(())
    }

    /// Load the tree stored in the database file
    ///
    /// Fails with `NotFound` if the file is missing and `InvalidFormat` if
    /// it does not hold a well-formed bookmark tree.
    pub fn load(&self, offset: FixedOffset) -> StorageResult<BookmarkTree> {
        let json = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::from_io(e, self.path.clone(), false))?;

        let document = TreeDocument::from_json(&json).map_err(|e| self.invalid(e))?;
        let tree = BookmarkTree::from_document(document, offset).map_err(|e| self.invalid(e))?;

        tracing::debug!(path = %self.path.display(), nodes = tree.len(), "loaded database");
        Ok(tree)
    }

    /// Write the whole tree to the database file
    pub fn save(&self, tree: &BookmarkTree) -> StorageResult<()> {
        let json = tree.to_document().to_json()?;
        atomic_write(&self.path, json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), nodes = tree.len(), "saved database");
        Ok(())
    }

    /// Remove the database file
    ///
    /// Fails with `NotFound` if there is nothing to remove.
    pub fn delete(&self) -> StorageResult<()> {
        fs::remove_file(&self.path)
            .map_err(|e| StorageError::from_io(e, self.path.clone(), true))?;
        tracing::info!(path = %self.path.display(), "deleted database");
        Ok(())
    }

    fn invalid(&self, error: impl ToString) -> StorageError {
        StorageError::InvalidFormat {
            path: self.path.clone(),
            details: error.to_string(),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| StorageError::from_io(e, parent.to_path_buf(), true)),
        _ => Ok(()),
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path)?;

    let temp_path = path.with_extension("tmp");
    let write_err = |e: std::io::Error| StorageError::from_io(e, temp_path.clone(), true);

    let mut file = File::create(&temp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::from_io(e, path.to_path_buf(), true))
}
