//! In-memory bookmark tree
//!
//! `BookmarkTree` is the single source of truth for the bookmark structure.
//! It owns every node and a registry mapping each name to its node.
//!
//! ## Invariants
//!
//! - Names are unique across the whole tree, not only within a folder.
//!   The registry holds exactly the nodes reachable from the root.
//! - Every non-root node's `parent_guid` is the guid of a folder whose
//!   `children` contains it.
//! - A folder can only be deleted once it is empty.
//! - The root (`roots`) can be neither deleted nor renamed.
//! - A folder's `date_modified` is refreshed when one of its direct children
//!   is added, updated or deleted.

use std::collections::HashMap;

use chrono::FixedOffset;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Folder, FolderView, Node, NodeDraft, NodeKind, NodeUpdate, NodeView, ROOT_NAME};
use crate::timestamp::{now_string, utc};

/// Errors from tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node <{0}> does not exist")]
    NodeNotFound(String),

    #[error("Node <{0}> is not a folder")]
    FolderNotFound(String),

    #[error("Folder <{0}> is not empty and can not be deleted")]
    FolderNotEmpty(String),

    #[error("Bookmark <{0}> already exists")]
    DuplicateName(String),

    #[error("A node with guid {0} already exists")]
    DuplicateGuid(String),

    #[error("Node <roots> can not be renamed or deleted")]
    RootImmutable,

    #[error("Unexpected field '{field}'")]
    UnexpectedField {
        field: String,
        /// Variant the field was checked against, if known
        kind: Option<NodeKind>,
    },

    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// One line of a depth-first listing of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// 0 for the root
    pub depth: usize,
    pub name: String,
    pub kind: NodeKind,
}

/// The bookmark tree with its global name registry
#[derive(Debug, Clone)]
pub struct BookmarkTree {
    pub(crate) root_guid: String,
    /// All nodes, root included, by guid
    pub(crate) nodes: HashMap<String, Node>,
    /// name -> guid
    pub(crate) registry: HashMap<String, String>,
    offset: FixedOffset,
}

impl Default for BookmarkTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BookmarkTree {
    /// Create an empty tree rendering dates in UTC
    pub fn new() -> Self {
        Self::with_offset(utc())
    }

    /// Create an empty tree rendering dates in the given offset
    pub fn with_offset(offset: FixedOffset) -> Self {
        let now = now_string(&offset);
        let root = Folder {
            guid: Uuid::new_v4().to_string(),
            parent_guid: String::new(),
            name: ROOT_NAME.to_string(),
            id_no: 0,
            date_added: now.clone(),
            children: Vec::new(),
            date_modified: now,
        };
        Self::from_root(root, offset)
    }

    /// Tree holding only the given root folder
    pub(crate) fn from_root(root: Folder, offset: FixedOffset) -> Self {
        let guid = root.guid.clone();
        let mut tree = Self {
            root_guid: guid.clone(),
            nodes: HashMap::new(),
            registry: HashMap::new(),
            offset,
        };
        tree.registry.insert(ROOT_NAME.to_string(), guid.clone());
        tree.nodes.insert(guid, Node::Folder(root));
        tree
    }

    /// Replace the tree with a fresh empty one, keeping the offset
    pub fn reset(&mut self) {
        *self = Self::with_offset(self.offset);
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn root_guid(&self) -> &str {
        &self.root_guid
    }

    /// Number of registered nodes, root included
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when the tree holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    pub fn contains_guid(&self, guid: &str) -> bool {
        self.nodes.contains_key(guid)
    }

    fn now(&self) -> String {
        now_string(&self.offset)
    }

    fn guid_of(&self, name: &str) -> Result<&str, TreeError> {
        self.registry
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TreeError::NodeNotFound(name.to_string()))
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Result<&Node, TreeError> {
        let guid = self.guid_of(name)?;
        self.nodes
            .get(guid)
            .ok_or_else(|| TreeError::NodeNotFound(name.to_string()))
    }

    /// Look up a folder by name
    pub fn folder(&self, name: &str) -> Result<&Folder, TreeError> {
        self.node(name)?
            .as_folder()
            .ok_or_else(|| TreeError::FolderNotFound(name.to_string()))
    }

    fn child_names(&self, folder: &Folder) -> Vec<String> {
        folder
            .children
            .iter()
            .filter_map(|guid| self.nodes.get(guid))
            .map(|child| child.name().to_string())
            .collect()
    }

    /// Child names of a node
    ///
    /// Returns `(true, names)` for a folder (possibly empty) and
    /// `(false, [])` for a url.
    pub fn get_children(&self, name: &str) -> Result<(bool, Vec<String>), TreeError> {
        match self.node(name)? {
            Node::Folder(folder) => Ok((true, self.child_names(folder))),
            Node::Url(_) => Ok((false, Vec::new())),
        }
    }

    /// A copy of the node's fields, folder children given by name
    pub fn get_node(&self, name: &str) -> Result<NodeView, TreeError> {
        let view = match self.node(name)? {
            Node::Folder(folder) => NodeView::Folder(FolderView {
                guid: folder.guid.clone(),
                parent_guid: folder.parent_guid.clone(),
                name: folder.name.clone(),
                id_no: folder.id_no,
                date_added: folder.date_added.clone(),
                children: self.child_names(folder),
                date_modified: folder.date_modified.clone(),
            }),
            Node::Url(url) => NodeView::Url(url.clone()),
        };
        Ok(view)
    }

    /// Name of the folder holding a node, `None` for the root
    pub fn parent_name(&self, name: &str) -> Result<Option<String>, TreeError> {
        let node = self.node(name)?;
        Ok(self
            .nodes
            .get(node.parent_guid())
            .map(|parent| parent.name().to_string()))
    }

    /// Attach a new node to the folder named in the draft
    pub fn add_node(&mut self, draft: NodeDraft) -> Result<(), TreeError> {
        let parent_guid = self.folder(&draft.parent_name)?.guid.clone();

        if let Some(name) = draft.resolved_name() {
            if self.contains(name) {
                return Err(TreeError::DuplicateName(name.to_string()));
            }
        }
        if let Some(guid) = &draft.guid {
            if self.nodes.contains_key(guid) {
                return Err(TreeError::DuplicateGuid(guid.clone()));
            }
        }

        let now = self.now();
        let node = draft.into_node(&parent_guid, &now);
        let guid = node.guid().to_string();
        let name = node.name().to_string();

        if let Some(parent) = self.folder_mut(&parent_guid) {
            parent.children.push(guid.clone());
            parent.date_modified = now;
        }
        tracing::debug!(name = %name, kind = %node.kind(), "added node");
        self.registry.insert(name, guid.clone());
        self.nodes.insert(guid, node);
        Ok(())
    }

    /// Update a node's attributes, re-keying the registry on rename
    pub fn update_node(&mut self, name: &str, update: &NodeUpdate) -> Result<(), TreeError> {
        let guid = self.guid_of(name)?.to_string();

        let rename = update.name.as_deref().filter(|new_name| *new_name != name);
        if let Some(new_name) = rename {
            if guid == self.root_guid {
                return Err(TreeError::RootImmutable);
            }
            if new_name.is_empty() {
                return Err(TreeError::InvalidValue {
                    field: "name".to_string(),
                    value: new_name.to_string(),
                });
            }
            if self.contains(new_name) {
                return Err(TreeError::DuplicateName(new_name.to_string()));
            }
        }

        let node = self
            .nodes
            .get_mut(&guid)
            .ok_or_else(|| TreeError::NodeNotFound(name.to_string()))?;
        node.apply(update)?;
        let parent_guid = node.parent_guid().to_string();

        if let Some(new_name) = rename {
            self.registry.remove(name);
            self.registry.insert(new_name.to_string(), guid);
            tracing::debug!(from = %name, to = %new_name, "renamed node");
        }

        let now = self.now();
        if let Some(parent) = self.folder_mut(&parent_guid) {
            parent.date_modified = now;
        }
        Ok(())
    }

    /// Remove a url or an empty folder
    pub fn delete_node(&mut self, name: &str) -> Result<(), TreeError> {
        let guid = self.guid_of(name)?.to_string();
        if guid == self.root_guid {
            return Err(TreeError::RootImmutable);
        }

        let node = self
            .nodes
            .get(&guid)
            .ok_or_else(|| TreeError::NodeNotFound(name.to_string()))?;
        if node.as_folder().is_some_and(|f| !f.children.is_empty()) {
            return Err(TreeError::FolderNotEmpty(name.to_string()));
        }
        let parent_guid = node.parent_guid().to_string();

        let now = self.now();
        if let Some(parent) = self.folder_mut(&parent_guid) {
            parent.children.retain(|child| *child != guid);
            parent.date_modified = now;
        }
        self.nodes.remove(&guid);
        self.registry.remove(name);
        tracing::debug!(name = %name, "deleted node");
        Ok(())
    }

    /// First free variant of a name: `name`, then `name (1)`, `name (2)`, ...
    pub fn duplicate_name(&self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut copy_no = 1;
        while self.contains(&candidate) {
            candidate = format!("{} ({})", name, copy_no);
            copy_no += 1;
        }
        candidate
    }

    /// Depth-first, pre-order listing starting at the root
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0, self.root_guid.as_str())];

        while let Some((depth, guid)) = stack.pop() {
            let Some(node) = self.nodes.get(guid) else {
                continue;
            };
            entries.push(OutlineEntry {
                depth,
                name: node.name().to_string(),
                kind: node.kind(),
            });
            if let Node::Folder(folder) = node {
                for child in folder.children.iter().rev() {
                    stack.push((depth + 1, child.as_str()));
                }
            }
        }
        entries
    }

    fn folder_mut(&mut self, guid: &str) -> Option<&mut Folder> {
        self.nodes.get_mut(guid).and_then(Node::as_folder_mut)
    }
}
