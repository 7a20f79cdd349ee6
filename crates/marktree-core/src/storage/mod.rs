//! Storage layer
//!
//! A database is one JSON file holding the whole tree. It is rewritten in
//! full after every mutation and read back in full when opened.

pub mod document;
pub mod error;
pub mod persistence;

pub use document::{FolderRecord, NodeRecord, TreeDocument};
pub use error::{StorageError, StorageResult};
pub use persistence::JsonPersistence;
