//! Unified storage interface
//!
//! The `Store` binds one in-memory [`BookmarkTree`] to one database file
//! and keeps them in step: every mutation is applied to the tree and then
//! the whole tree is written back synchronously.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::new(Config::load()?);
//! store.create_database("bookmarks")?;
//!
//! store.add_node(NodeDraft::folder("roots", "rust"))?;
//! store.add_node(NodeDraft::url("rust", "docs", "https://doc.rust-lang.org"))?;
//!
//! let (is_folder, children) = store.get_children("rust")?;
//! ```
//!
//! Errors are `anyhow::Error`. The domain error underneath ([`TreeError`],
//! [`StorageError`], [`ConvertError`]) can be recovered with `downcast_ref`.
//!
//! [`TreeError`]: crate::tree::TreeError
//! [`ConvertError`]: crate::convert::ConvertError

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::convert::{self, ConversionReport, ConvertError, SourceFormat};
use crate::models::{NodeDraft, NodeUpdate, NodeView};
use crate::storage::{JsonPersistence, StorageError};
use crate::tree::{BookmarkTree, OutlineEntry};

/// A bookmark tree bound to its database file
#[derive(Debug)]
pub struct Store {
    tree: BookmarkTree,
    /// `None` until a database is created or opened
    persistence: Option<JsonPersistence>,
    config: Config,
}

impl Store {
    /// Create a store with an empty tree and no database bound
    pub fn new(config: Config) -> Self {
        Self {
            tree: BookmarkTree::with_offset(config.utc_offset()),
            persistence: None,
            config,
        }
    }

    /// Create a store and open the named database
    pub fn open(config: Config, name: &str) -> Result<Self> {
        let mut store = Self::new(config);
        store.open_database(name)?;
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &BookmarkTree {
        &self.tree
    }

    /// Path of the bound database file
    pub fn database_path(&self) -> Option<&Path> {
        self.persistence.as_ref().map(JsonPersistence::path)
    }

    pub fn is_open(&self) -> bool {
        self.persistence.is_some()
    }

    // ==================== Database Lifecycle ====================

    /// Create a new database holding an empty tree and bind to it
    ///
    /// Fails with `StorageError::AlreadyExists` if the file is there; the
    /// caller decides whether to delete it first.
    pub fn create_database(&mut self, name: &str) -> Result<()> {
        let persistence = JsonPersistence::new(self.config.database_path(name));
        let tree = BookmarkTree::with_offset(self.config.utc_offset());

        persistence
            .create(&tree)
            .with_context(|| format!("Failed to create database '{}'", name))?;

        self.tree = tree;
        self.persistence = Some(persistence);
        Ok(())
    }

    /// Load a database, replacing the in-memory tree, and bind to it
    pub fn open_database(&mut self, name: &str) -> Result<()> {
        let persistence = JsonPersistence::new(self.config.database_path(name));
        let tree = persistence
            .load(self.config.utc_offset())
            .with_context(|| format!("Failed to open database '{}'", name))?;

        tracing::info!(path = %persistence.path().display(), nodes = tree.len(), "opened database");
        self.tree = tree;
        self.persistence = Some(persistence);
        Ok(())
    }

    /// Remove a database file, then reset the tree and unbind
    pub fn delete_database(&mut self, name: &str) -> Result<()> {
        JsonPersistence::new(self.config.database_path(name))
            .delete()
            .with_context(|| format!("Failed to delete database '{}'", name))?;

        self.tree.reset();
        self.persistence = None;
        Ok(())
    }

    // ==================== Node Operations ====================

    /// Child names of a node and whether it is a folder
    pub fn get_children(&self, name: &str) -> Result<(bool, Vec<String>)> {
        Ok(self.tree.get_children(name)?)
    }

    /// Fields of a node, folder children given by name
    pub fn get_node(&self, name: &str) -> Result<NodeView> {
        Ok(self.tree.get_node(name)?)
    }

    /// Add a node and persist
    pub fn add_node(&mut self, draft: NodeDraft) -> Result<()> {
        self.ensure_bound()?;
        self.tree.add_node(draft)?;
        self.save()
    }

    /// Update a node and persist
    pub fn update_node(&mut self, name: &str, update: &NodeUpdate) -> Result<()> {
        self.ensure_bound()?;
        self.tree.update_node(name, update)?;
        self.save()
    }

    /// Delete a url or an empty folder and persist
    pub fn delete_node(&mut self, name: &str) -> Result<()> {
        self.ensure_bound()?;
        self.tree.delete_node(name)?;
        self.save()
    }

    /// First name not yet taken: `name`, `name (1)`, `name (2)`, ...
    pub fn duplicate_name(&self, name: &str) -> String {
        self.tree.duplicate_name(name)
    }

    /// Depth-first listing of the whole tree
    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.tree.outline()
    }

    // ==================== Conversion ====================

    /// Import a foreign bookmark export into the bound tree and persist once
    pub fn convert(&mut self, format: SourceFormat, source_path: &Path) -> Result<ConversionReport> {
        self.ensure_bound()?;
        if format == SourceFormat::Mozilla {
            return Err(ConvertError::NotImplemented(format).into());
        }

        let source = convert::read_source(source_path)?;
        let report = format.convert(&mut self.tree, &source)?;
        self.save()?;
        Ok(report)
    }

    /// Import a Chrome `Bookmarks` file
    pub fn convert_chrome(&mut self, source_path: &Path) -> Result<ConversionReport> {
        self.convert(SourceFormat::Chrome, source_path)
    }

    /// Mozilla import is not implemented; always fails without touching the tree
    pub fn convert_mozilla(&mut self, source_path: &Path) -> Result<ConversionReport> {
        self.convert(SourceFormat::Mozilla, source_path)
    }

    // ==================== Persistence ====================

    fn ensure_bound(&self) -> Result<()> {
        if self.persistence.is_none() {
            return Err(StorageError::NoDatabase.into());
        }
        Ok(())
    }

    /// Write the tree to the bound database
    pub fn save(&self) -> Result<()> {
        let persistence = self.persistence.as_ref().ok_or(StorageError::NoDatabase)?;
        persistence
            .save(&self.tree)
            .with_context(|| format!("Failed to save {:?}", persistence.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeKind, ROOT_NAME};
    use crate::tree::TreeError;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            default_database: None,
            utc_offset_minutes: 0,
            log_file: None,
        }
    }

    fn populated_store(temp_dir: &TempDir) -> Store {
        let mut store = Store::new(test_config(temp_dir));
        store.create_database("bookmarks").unwrap();
        store.add_node(NodeDraft::folder(ROOT_NAME, "folder")).unwrap();
        store
            .add_node(
                NodeDraft::url("folder", "URL", "www.url.com")
                    .with_icon("ICON")
                    .with_keywords("old keys"),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_create_database() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(test_config(&temp_dir));
        assert!(!store.is_open());

        store.create_database("bookmarks").unwrap();

        assert!(store.is_open());
        assert_eq!(
            store.database_path().unwrap(),
            temp_dir.path().join("bookmarks.json")
        );
        assert!(temp_dir.path().join("bookmarks.json").exists());
        assert!(store.tree().is_empty());
    }

    #[test]
    fn test_create_existing_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);

        let err = store.create_database("bookmarks").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::AlreadyExists { .. })
        ));
        // The bound tree is untouched
        assert!(store.tree().contains("URL"));
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = populated_store(&temp_dir);
        let original = store.get_node("URL").unwrap();

        let reopened = Store::open(test_config(&temp_dir), "bookmarks").unwrap();

        assert_eq!(
            reopened.get_node(ROOT_NAME).unwrap().children().unwrap(),
            ["folder".to_string()]
        );
        assert_eq!(
            reopened.get_node("folder").unwrap().children().unwrap(),
            ["URL".to_string()]
        );
        let url = reopened.get_node("URL").unwrap();
        assert_eq!(url, original);

        for entry in reopened.outline() {
            let node = reopened.get_node(&entry.name).unwrap();
            assert_eq!(node.guid().len(), 36);
            assert_eq!(node.date_added().len(), 19);
            if let NodeView::Folder(folder) = node {
                assert_eq!(folder.date_modified.len(), 19);
            }
        }
    }

    #[test]
    fn test_open_missing_database() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(test_config(&temp_dir));

        let err = store.open_database("missing").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::NotFound { .. })
        ));
        assert!(!store.is_open());
    }

    #[test]
    fn test_open_replaces_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);

        store.create_database("other").unwrap();
        assert!(!store.tree().contains("URL"));

        store.open_database("bookmarks").unwrap();
        assert!(store.tree().contains("URL"));
    }

    #[test]
    fn test_delete_database() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);

        store.delete_database("bookmarks").unwrap();

        assert!(!temp_dir.path().join("bookmarks.json").exists());
        assert!(store.tree().is_empty());
        assert!(!store.is_open());

        let err = store.delete_database("bookmarks").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_mutation_without_database() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::new(test_config(&temp_dir));

        let err = store.add_node(NodeDraft::folder(ROOT_NAME, "x")).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::NoDatabase)
        ));
        assert!(store.tree().is_empty());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);
        let reload = || Store::open(test_config(&temp_dir), "bookmarks").unwrap();

        store.update_node("URL", &NodeUpdate::rename("new URL")).unwrap();
        assert!(reload().tree().contains("new URL"));

        store.delete_node("new URL").unwrap();
        assert!(!reload().tree().contains("new URL"));
        assert_eq!(reload().tree().len(), 2);
    }

    #[test]
    fn test_tree_errors_are_downcastable() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);

        let err = store.delete_node("folder").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TreeError>(),
            Some(&TreeError::FolderNotEmpty("folder".to_string()))
        );

        let err = store.get_node("nope").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TreeError>(),
            Some(&TreeError::NodeNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_failed_mutation_does_not_save() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);
        let path = temp_dir.path().join("bookmarks.json");
        let before = fs::read_to_string(&path).unwrap();

        assert!(store.delete_node("folder").is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_convert_chrome() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);
        let source_path = temp_dir.path().join("Bookmarks");
        fs::write(
            &source_path,
            r#"{"checksum": "", "version": 1, "roots": {"bookmark_bar": {
                "type": "folder", "id": "1", "name": "folder",
                "date_added": "13097921382951728", "date_modified": "13097921382951728",
                "children": [{"type": "url", "id": "2", "name": "u1",
                              "date_added": "13097921382951728", "url": "http://x"}]
            }}}"#,
        )
        .unwrap();

        let report = store.convert_chrome(&source_path).unwrap();

        assert_eq!(report.renamed, vec![("folder".to_string(), "folder (1)".to_string())]);
        let reopened = Store::open(test_config(&temp_dir), "bookmarks").unwrap();
        assert_eq!(
            reopened.get_children("folder (1)").unwrap(),
            (true, vec!["u1".to_string()])
        );
        assert_eq!(
            reopened.get_node("u1").unwrap().date_added(),
            "2016-01-22T07:29:42"
        );
    }

    #[test]
    fn test_convert_malformed_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);
        let source_path = temp_dir.path().join("Bookmarks");
        fs::write(&source_path, r#"{"version": 1}"#).unwrap();
        let before = store.tree().len();

        let err = store.convert_chrome(&source_path).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::MalformedSourceFormat(_))
        ));
        assert_eq!(store.tree().len(), before);
    }

    #[test]
    fn test_convert_mozilla_not_implemented() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = populated_store(&temp_dir);

        let err = store
            .convert_mozilla(&temp_dir.path().join("places.sqlite"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::NotImplemented(SourceFormat::Mozilla))
        ));
        assert_eq!(store.tree().len(), 3);
    }

    #[test]
    fn test_offset_applies_to_new_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            utc_offset_minutes: 180,
            ..test_config(&temp_dir)
        };
        let store = Store::new(config);
        assert_eq!(store.tree().offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_outline_and_duplicate_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = populated_store(&temp_dir);

        let kinds: Vec<_> = store.outline().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [NodeKind::Folder, NodeKind::Folder, NodeKind::Url]);
        assert_eq!(store.duplicate_name("URL"), "URL (1)");
    }
}
