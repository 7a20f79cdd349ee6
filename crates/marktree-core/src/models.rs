//! Data models for marktree
//!
//! Defines the node shapes of the bookmark tree: folders, which own an ordered
//! list of children, and urls, which are leaves. The root of the tree is a
//! folder with the reserved name [`ROOT_NAME`].
//!
//! In memory a folder keeps the guids of its children; callers never see
//! those directly and get a [`NodeView`] with child names instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::tree::TreeError;

/// Reserved name of the root folder
pub const ROOT_NAME: &str = "roots";

/// Field keys shared by the field-mapping parsers
mod keys {
    pub const GUID: &str = "guid";
    pub const PARENT_NAME: &str = "parent_name";
    pub const NAME: &str = "name";
    pub const ID_NO: &str = "id_no";
    pub const DATE_ADDED: &str = "date_added";
    pub const DATE_MODIFIED: &str = "date_modified";
    pub const URL: &str = "url";
    pub const ICON: &str = "icon";
    pub const KEYWORDS: &str = "keywords";
}

/// Variant tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Url,
}

impl NodeKind {
    pub fn from_is_folder(is_folder: bool) -> Self {
        if is_folder {
            NodeKind::Folder
        } else {
            NodeKind::Url
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Folder => f.write_str("folder"),
            NodeKind::Url => f.write_str("url"),
        }
    }
}

/// A folder with an ordered list of children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub guid: String,
    /// Empty for the root
    pub parent_guid: String,
    pub name: String,
    /// Legacy numeric id, kept for compatibility with Chrome
    pub id_no: i64,
    pub date_added: String,
    /// Guids of the children, in display order
    pub children: Vec<String>,
    /// Last change of the folder or one of its direct children
    pub date_modified: String,
}

/// A bookmarked URL
///
/// The on-disk record of a url has exactly these fields, so the same struct
/// is used for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
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
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub keywords: String,
}

/// A node of the bookmark tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Folder(Folder),
    Url(Url),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Folder(_) => NodeKind::Folder,
            Node::Url(_) => NodeKind::Url,
        }
    }

    pub fn guid(&self) -> &str {
        match self {
            Node::Folder(f) => &f.guid,
            Node::Url(u) => &u.guid,
        }
    }

    pub fn parent_guid(&self) -> &str {
        match self {
            Node::Folder(f) => &f.parent_guid,
            Node::Url(u) => &u.parent_guid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder(f) => &f.name,
            Node::Url(u) => &u.name,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Node::Folder(f) => Some(f),
            Node::Url(_) => None,
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Node::Folder(f) => Some(f),
            Node::Url(_) => None,
        }
    }

    pub(crate) fn set_parent_guid(&mut self, parent_guid: impl Into<String>) {
        let parent_guid = parent_guid.into();
        match self {
            Node::Folder(f) => f.parent_guid = parent_guid,
            Node::Url(u) => u.parent_guid = parent_guid,
        }
    }

    /// Apply a partial update
    ///
    /// The whole update is checked against the fields legal for this variant
    /// before anything is written, so a rejected update leaves the node as it was.
    pub fn apply(&mut self, update: &NodeUpdate) -> Result<(), TreeError> {
        if let Some(field) = update.illegal_field_for(self.kind()) {
            return Err(TreeError::UnexpectedField {
                field: field.to_string(),
                kind: Some(self.kind()),
            });
        }

        match self {
            Node::Folder(f) => {
                assign(&mut f.name, &update.name);
                assign(&mut f.date_added, &update.date_added);
                assign(&mut f.date_modified, &update.date_modified);
                if let Some(id_no) = update.id_no {
                    f.id_no = id_no;
                }
            }
            Node::Url(u) => {
                assign(&mut u.name, &update.name);
                assign(&mut u.date_added, &update.date_added);
                assign(&mut u.url, &update.url);
                assign(&mut u.icon, &update.icon);
                assign(&mut u.keywords, &update.keywords);
                if let Some(id_no) = update.id_no {
                    u.id_no = id_no;
                }
            }
        }
        Ok(())
    }
}

fn assign(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

/// Request to create a node under an existing folder
///
/// Omitted optional fields get defaults when the node is attached:
/// a fresh v4 guid, the guid as name, and the current time as dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    /// Name of the folder to attach to
    pub parent_name: String,
    pub kind: NodeKind,
    pub guid: Option<String>,
    pub name: Option<String>,
    pub id_no: i64,
    pub date_added: Option<String>,
    /// Folders only
    pub date_modified: Option<String>,
    /// Urls only
    pub url: String,
    pub icon: String,
    pub keywords: String,
}

impl NodeDraft {
    fn new(kind: NodeKind, parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: parent_name.into(),
            kind,
            guid: None,
            name: None,
            id_no: 0,
            date_added: None,
            date_modified: None,
            url: String::new(),
            icon: String::new(),
            keywords: String::new(),
        }
    }

    /// Draft a folder named `name` inside `parent_name`
    pub fn folder(parent_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(NodeKind::Folder, parent_name).with_name(name)
    }

    /// Draft a url named `name` inside `parent_name`
    pub fn url(
        parent_name: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let mut draft = Self::new(NodeKind::Url, parent_name).with_name(name);
        draft.url = url.into();
        draft
    }

    /// Build a draft from a string field mapping
    ///
    /// `parent_name` is required. Keys not legal for the requested variant
    /// are rejected.
    pub fn from_fields<I, K, V>(fields: I, is_folder: bool) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let kind = NodeKind::from_is_folder(is_folder);
        let mut draft = Self::new(kind, String::new());
        let mut parent_name = None;

        for (key, value) in fields {
            let key = key.as_ref();
            let value = value.into();
            match (key, kind) {
                (keys::PARENT_NAME, _) => parent_name = Some(value),
                (keys::GUID, _) => draft.guid = non_empty(value),
                (keys::NAME, _) => draft.name = non_empty(value),
                (keys::ID_NO, _) => draft.id_no = parse_id_no(&value)?,
                (keys::DATE_ADDED, _) => draft.date_added = non_empty(value),
                (keys::DATE_MODIFIED, NodeKind::Folder) => draft.date_modified = non_empty(value),
                (keys::URL, NodeKind::Url) => draft.url = value,
                (keys::ICON, NodeKind::Url) => draft.icon = value,
                (keys::KEYWORDS, NodeKind::Url) => draft.keywords = value,
                _ => {
                    return Err(TreeError::UnexpectedField {
                        field: key.to_string(),
                        kind: Some(kind),
                    })
                }
            }
        }

        draft.parent_name =
            parent_name.ok_or_else(|| TreeError::MissingField(keys::PARENT_NAME.to_string()))?;
        Ok(draft)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = non_empty(guid.into());
        self
    }

    pub fn with_id_no(mut self, id_no: i64) -> Self {
        self.id_no = id_no;
        self
    }

    pub fn with_date_added(mut self, date_added: impl Into<String>) -> Self {
        self.date_added = non_empty(date_added.into());
        self
    }

    pub fn with_date_modified(mut self, date_modified: impl Into<String>) -> Self {
        self.date_modified = non_empty(date_modified.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    /// The name the node will get once attached
    pub fn resolved_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.guid.as_deref())
    }

    /// Materialize the node under `parent_guid`, filling defaults
    pub(crate) fn into_node(self, parent_guid: &str, now: &str) -> Node {
        let guid = self.guid.unwrap_or_else(|| Uuid::new_v4().to_string());
        let name = self.name.unwrap_or_else(|| guid.clone());
        let date_added = self.date_added.unwrap_or_else(|| now.to_string());

        match self.kind {
            NodeKind::Folder => Node::Folder(Folder {
                guid,
                parent_guid: parent_guid.to_string(),
                name,
                id_no: self.id_no,
                date_added,
                children: Vec::new(),
                date_modified: self.date_modified.unwrap_or_else(|| now.to_string()),
            }),
            NodeKind::Url => Node::Url(Url {
                guid,
                parent_guid: parent_guid.to_string(),
                name,
                id_no: self.id_no,
                date_added,
                url: self.url,
                icon: self.icon,
                keywords: self.keywords,
            }),
        }
    }
}

/// Partial update of a node's attributes
///
/// `None` leaves the field untouched. Structural fields (`guid`,
/// `parent_guid`, `children`) belong to the tree and are not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub id_no: Option<i64>,
    pub date_added: Option<String>,
    /// Folders only
    pub date_modified: Option<String>,
    /// Urls only
    pub url: Option<String>,
    pub icon: Option<String>,
    pub keywords: Option<String>,
}

impl NodeUpdate {
    /// Build an update from a string field mapping, rejecting unknown keys
    pub fn from_fields<I, K, V>(fields: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut update = Self::default();
        for (key, value) in fields {
            let value = value.into();
            match key.as_ref() {
                keys::NAME => update.name = Some(value),
                keys::ID_NO => update.id_no = Some(parse_id_no(&value)?),
                keys::DATE_ADDED => update.date_added = Some(value),
                keys::DATE_MODIFIED => update.date_modified = Some(value),
                keys::URL => update.url = Some(value),
                keys::ICON => update.icon = Some(value),
                keys::KEYWORDS => update.keywords = Some(value),
                other => {
                    return Err(TreeError::UnexpectedField {
                        field: other.to_string(),
                        kind: None,
                    })
                }
            }
        }
        Ok(update)
    }

    /// Update that only renames
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// First field set in this update that the given variant does not have
    fn illegal_field_for(&self, kind: NodeKind) -> Option<&'static str> {
        match kind {
            NodeKind::Folder => [
                (keys::URL, self.url.is_some()),
                (keys::ICON, self.icon.is_some()),
                (keys::KEYWORDS, self.keywords.is_some()),
            ]
            .into_iter()
            .find_map(|(key, set)| set.then_some(key)),
            NodeKind::Url => self.date_modified.is_some().then_some(keys::DATE_MODIFIED),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_id_no(value: &str) -> Result<i64, TreeError> {
    value.trim().parse().map_err(|_| TreeError::InvalidValue {
        field: keys::ID_NO.to_string(),
        value: value.to_string(),
    })
}

/// Caller-facing copy of a folder, children given by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderView {
    pub guid: String,
    pub parent_guid: String,
    pub name: String,
    pub id_no: i64,
    pub date_added: String,
    pub children: Vec<String>,
    pub date_modified: String,
}

/// Caller-facing copy of a node as returned by `get_node`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeView {
    Folder(FolderView),
    Url(Url),
}

impl NodeView {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeView::Folder(_) => NodeKind::Folder,
            NodeView::Url(_) => NodeKind::Url,
        }
    }

    pub fn guid(&self) -> &str {
        match self {
            NodeView::Folder(f) => &f.guid,
            NodeView::Url(u) => &u.guid,
        }
    }

    pub fn parent_guid(&self) -> &str {
        match self {
            NodeView::Folder(f) => &f.parent_guid,
            NodeView::Url(u) => &u.parent_guid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeView::Folder(f) => &f.name,
            NodeView::Url(u) => &u.name,
        }
    }

    pub fn date_added(&self) -> &str {
        match self {
            NodeView::Folder(f) => &f.date_added,
            NodeView::Url(u) => &u.date_added,
        }
    }

    /// Child names, `None` for a url
    pub fn children(&self) -> Option<&[String]> {
        match self {
            NodeView::Folder(f) => Some(&f.children),
            NodeView::Url(_) => None,
        }
    }

    /// The node as a field mapping
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
