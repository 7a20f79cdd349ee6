//! On-disk shape of a bookmark database
//!
//! The whole tree is one JSON object: the root's fields with its children
//! inlined as nested objects. Folder records are told apart from url
//! records by the presence of a `children` key. The name registry is never
//! written; it is rebuilt while loading.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Folder, Node, Url, ROOT_NAME};
use crate::timestamp::now_string;
use crate::tree::{BookmarkTree, TreeError};

/// The root object of a database file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub parent_guid: String,
    #[serde(default = "root_name")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<NodeRecord>,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub date_modified: String,
}

fn root_name() -> String {
    ROOT_NAME.to_string()
}

/// A nested folder as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub parent_guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id_no: i64,
    #[serde(default)]
    pub date_added: String,
    pub children: Vec<NodeRecord>,
    #[serde(default)]
    pub date_modified: String,
}

/// A stored node, folder or url
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRecord {
    Folder(FolderRecord),
    Url(Url),
}

impl TreeDocument {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl BookmarkTree {
    /// Snapshot the tree in its on-disk shape
    pub fn to_document(&self) -> TreeDocument {
        let (date_added, date_modified, children) = match self.nodes.get(&self.root_guid) {
            Some(Node::Folder(root)) => (
                root.date_added.clone(),
                root.date_modified.clone(),
                self.records_of(&root.children),
            ),
            _ => (String::new(), String::new(), Vec::new()),
        };

        TreeDocument {
            guid: self.root_guid.clone(),
            parent_guid: String::new(),
            name: ROOT_NAME.to_string(),
            children,
            date_added,
            date_modified,
        }
    }

    fn records_of(&self, guids: &[String]) -> Vec<NodeRecord> {
        guids
            .iter()
            .filter_map(|guid| self.nodes.get(guid))
            .map(|node| match node {
                Node::Folder(folder) => NodeRecord::Folder(FolderRecord {
                    guid: folder.guid.clone(),
                    parent_guid: folder.parent_guid.clone(),
                    name: folder.name.clone(),
                    id_no: folder.id_no,
                    date_added: folder.date_added.clone(),
                    children: self.records_of(&folder.children),
                    date_modified: folder.date_modified.clone(),
                }),
                Node::Url(url) => NodeRecord::Url(url.clone()),
            })
            .collect()
    }

    /// Rebuild a tree from its on-disk shape
    ///
    /// The stored root guid and dates are kept, the root name is always
    /// `roots`. Every `parent_guid` is re-derived from the nesting. Missing
    /// guids are generated and missing dates are set to now.
    pub fn from_document(document: TreeDocument, offset: FixedOffset) -> Result<Self, TreeError> {
        let now = now_string(&offset);
        let root = Folder {
            guid: or_new_guid(document.guid),
            parent_guid: String::new(),
            name: ROOT_NAME.to_string(),
            id_no: 0,
            date_added: or_default(document.date_added, &now),
            children: Vec::new(),
            date_modified: or_default(document.date_modified, &now),
        };

        let mut tree = BookmarkTree::from_root(root, offset);
        let root_guid = tree.root_guid.clone();
        for record in document.children {
            tree.restore(&root_guid, record, &now)?;
        }
        Ok(tree)
    }

    fn restore(&mut self, parent_guid: &str, record: NodeRecord, now: &str) -> Result<(), TreeError> {
        let (node, children) = match record {
            NodeRecord::Folder(folder) => {
                let guid = or_new_guid(folder.guid);
                let node = Node::Folder(Folder {
                    name: or_default(folder.name, &guid),
                    guid,
                    parent_guid: parent_guid.to_string(),
                    id_no: folder.id_no,
                    date_added: or_default(folder.date_added, now),
                    children: Vec::new(),
                    date_modified: or_default(folder.date_modified, now),
                });
                (node, folder.children)
            }
            NodeRecord::Url(mut url) => {
                url.guid = or_new_guid(url.guid);
                if url.name.is_empty() {
                    url.name.clone_from(&url.guid);
                }
                if url.date_added.is_empty() {
                    url.date_added = now.to_string();
                }
                url.parent_guid = parent_guid.to_string();
                (Node::Url(url), Vec::new())
            }
        };

        let guid = node.guid().to_string();
        let name = node.name().to_string();
        if self.registry.contains_key(&name) {
            return Err(TreeError::DuplicateName(name));
        }
        if self.nodes.contains_key(&guid) {
            return Err(TreeError::DuplicateGuid(guid));
        }

        if let Some(parent) = self.nodes.get_mut(parent_guid).and_then(Node::as_folder_mut) {
            parent.children.push(guid.clone());
        }
        self.registry.insert(name, guid.clone());
        self.nodes.insert(guid.clone(), node);

        for child in children {
            self.restore(&guid, child, now)?;
        }
        Ok(())
    }
}

fn or_new_guid(guid: String) -> String {
    if guid.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        guid
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
