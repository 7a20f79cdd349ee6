//! marktree Core Library
//!
//! This crate provides the core functionality for marktree, a personal
//! bookmark manager that keeps a tree of folders and URLs in a JSON file.
//!
//! # Architecture
//!
//! - **Tree**: the in-memory source of truth. Names are unique across the
//!   whole tree and every lookup goes through the name registry.
//! - **Storage**: the whole tree is written to one JSON file after every
//!   mutation and read back in full when a database is opened.
//! - **Convert**: browser exports (Chrome) are replayed into the tree.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::new(Config::load()?);
//! store.create_database("bookmarks")?;
//!
//! store.add_node(NodeDraft::folder("roots", "rust"))?;
//! store.add_node(NodeDraft::url("rust", "book", "https://doc.rust-lang.org/book/"))?;
//!
//! let (is_folder, children) = store.get_children("rust")?;
//! ```
//!
//! # Modules
//!
//! - `store`: Database lifecycle and node operations (main entry point)
//! - `tree`: The bookmark tree and its invariants
//! - `models`: Node shapes, creation drafts and partial updates
//! - `storage`: JSON persistence
//! - `convert`: Chrome (and, some day, Mozilla) import
//! - `timestamp`: Browser epoch conversion
//! - `config`: Application configuration

pub mod config;
pub mod convert;
pub mod models;
pub mod storage;
pub mod store;
pub mod timestamp;
pub mod tree;

pub use config::Config;
pub use convert::{ConversionReport, ConvertError, SourceFormat};
pub use models::{Folder, Node, NodeDraft, NodeKind, NodeUpdate, NodeView, Url, ROOT_NAME};
pub use storage::{JsonPersistence, StorageError};
pub use store::Store;
pub use timestamp::{EpochKind, TimeError};
pub use tree::{BookmarkTree, OutlineEntry, TreeError};
