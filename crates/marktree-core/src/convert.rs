//! Import of foreign bookmark exports
//!
//! A Chrome `Bookmarks` file looks like
//!
//! ```json
//! {
//!   "checksum": "...",
//!   "roots": {
//!     "bookmark_bar": { "type": "folder", "name": "Bookmarks bar", "children": [...] },
//!     "other": { ... },
//!     "synced": { ... }
//!   },
//!   "version": 1
//! }
//! ```
//!
//! Every entry under `roots` becomes a folder directly below the tree root,
//! and its descendants are replayed depth-first as `add_node` calls. Names
//! that collide with existing ones get a ` (n)` suffix.
//!
//! The source document is only borrowed. The conversion works on a copy of
//! the tree which replaces the caller's tree once every node is in, so a
//! failed conversion leaves the tree as it was.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NodeDraft, NodeUpdate, ROOT_NAME};
use crate::timestamp::{stamp_to_string, EpochKind, TimeError};
use crate::tree::{BookmarkTree, TreeError};

/// Top-level keys every Chrome export carries
const CHROME_TOP_LEVEL_KEYS: [&str; 3] = ["checksum", "roots", "version"];

/// Errors from a conversion
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{path}' is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed source format: {0}")]
    MalformedSourceFormat(String),

    #[error("Invalid node <{name}>: {reason}")]
    InvalidNode { name: String, reason: String },

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Conversion from {0} format is not implemented yet")]
    NotImplemented(SourceFormat),
}

/// Browser export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Chrome,
    Mozilla,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Chrome => "Chrome",
            SourceFormat::Mozilla => "Mozilla",
        }
    }

    /// Convert `source` into `tree` using this format's converter
    pub fn convert(
        self,
        tree: &mut BookmarkTree,
        source: &Value,
    ) -> Result<ConversionReport, ConvertError> {
        match self {
            SourceFormat::Chrome => convert_chrome(tree, source),
            SourceFormat::Mozilla => convert_mozilla(tree, source),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(SourceFormat::Chrome),
            "mozilla" | "firefox" => Ok(SourceFormat::Mozilla),
            _ => Err(format!("Unknown source format: {}", s)),
        }
    }
}

/// What a successful conversion added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub folders: usize,
    pub urls: usize,
    /// `(source name, name given in the tree)` for every collision
    pub renamed: Vec<(String, String)>,
}

impl ConversionReport {
    pub fn total(&self) -> usize {
        self.folders + self.urls
    }
}

/// Read and parse a JSON export from disk
pub fn read_source(path: &Path) -> Result<Value, ConvertError> {
    let text = fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replay a Chrome bookmark export into `tree`
pub fn convert_chrome(
    tree: &mut BookmarkTree,
    source: &Value,
) -> Result<ConversionReport, ConvertError> {
    let document = source.as_object().ok_or_else(|| {
        ConvertError::MalformedSourceFormat("expected a JSON object at the top level".to_string())
    })?;
    if let Some(missing) = CHROME_TOP_LEVEL_KEYS
        .iter()
        .find(|key| !document.contains_key(**key))
    {
        return Err(ConvertError::MalformedSourceFormat(format!(
            "missing top-level key '{}'",
            missing
        )));
    }
    let roots = document["roots"].as_object().ok_or_else(|| {
        ConvertError::MalformedSourceFormat("'roots' is not an object".to_string())
    })?;

    let mut staged = tree.clone();
    let mut report = ConversionReport::default();
    for (key, node) in roots {
        match node.as_object() {
            Some(node) => replay_chrome_node(&mut staged, ROOT_NAME, node, &mut report)?,
            None => tracing::warn!(key = %key, "skipping non-folder entry under roots"),
        }
    }

    *tree = staged;
    tracing::info!(
        folders = report.folders,
        urls = report.urls,
        renamed = report.renamed.len(),
        "converted Chrome bookmarks"
    );
    Ok(report)
}

/// Mozilla exports are not supported; the tree is never touched
pub fn convert_mozilla(
    _tree: &mut BookmarkTree,
    _source: &Value,
) -> Result<ConversionReport, ConvertError> {
    Err(ConvertError::NotImplemented(SourceFormat::Mozilla))
}

fn replay_chrome_node(
    tree: &mut BookmarkTree,
    parent_name: &str,
    node: &Map<String, Value>,
    report: &mut ConversionReport,
) -> Result<(), ConvertError> {
    let guid = node
        .get("guid")
        .and_then(Value::as_str)
        .filter(|guid| Uuid::parse_str(guid).is_ok() && !tree.contains_guid(guid))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let source_name = match node.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => guid.clone(),
    };
    let name = tree.duplicate_name(&source_name);
    if name != source_name {
        tracing::warn!(from = %source_name, to = %name, "renamed colliding bookmark");
        report.renamed.push((source_name, name.clone()));
    }

    let id_no = match node.get("id") {
        Some(id) => chrome_int(id).ok_or_else(|| invalid(&name, "id", id))?,
        None => 0,
    };
    let is_folder = node.get("type").and_then(Value::as_str) == Some("folder");

    let mut draft = if is_folder {
        NodeDraft::folder(parent_name, &name)
    } else {
        let url = node.get("url").and_then(Value::as_str).unwrap_or_default();
        NodeDraft::url(parent_name, &name, url)
    }
    .with_guid(guid)
    .with_id_no(id_no);

    if let Some(date_added) = chrome_date(tree, &name, node, "date_added")? {
        draft = draft.with_date_added(date_added);
    }
    let date_modified = if is_folder {
        chrome_date(tree, &name, node, "date_modified")?
    } else {
        None
    };
    if let Some(date_modified) = &date_modified {
        draft = draft.with_date_modified(date_modified.clone());
    }

    tree.add_node(draft)?;

    if !is_folder {
        report.urls += 1;
        return Ok(());
    }
    report.folders += 1;

    let children = match node.get("children") {
        Some(Value::Array(children)) => children.as_slice(),
        Some(other) => return Err(invalid(&name, "children", other)),
        None => &[],
    };
    for child in children {
        let child = child
            .as_object()
            .ok_or_else(|| invalid(&name, "children", child))?;
        replay_chrome_node(tree, &name, child, report)?;
    }

    // Attaching children refreshed the folder's date
    if let Some(date_modified) = date_modified {
        let restore = NodeUpdate {
            date_modified: Some(date_modified),
            ..NodeUpdate::default()
        };
        tree.update_node(&name, &restore)?;
    }
    Ok(())
}

/// Chrome writes integers either as JSON numbers or as decimal strings
fn chrome_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A Google-epoch date field rendered in the tree's offset, `None` when absent
fn chrome_date(
    tree: &BookmarkTree,
    name: &str,
    node: &Map<String, Value>,
    field: &str,
) -> Result<Option<String>, ConvertError> {
    let Some(value) = node.get(field) else {
        return Ok(None);
    };
    let stamp = chrome_int(value).ok_or_else(|| invalid(name, field, value))?;
    Ok(Some(stamp_to_string(stamp, EpochKind::Google, tree.offset())?))
}

fn invalid(name: &str, field: &str, value: &Value) -> ConvertError {
    ConvertError::InvalidNode {
        name: name.to_string(),
        reason: format!("bad '{}' value {}", field, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeKind, NodeView};
    use crate::timestamp::offset_from_minutes;
    use serde_json::json;
    use tempfile::TempDir;

    const STAMP: &str = "13097921382951728";

    fn minimal_source() -> Value {
        json!({
            "checksum": "",
            "version": 1,
            "roots": {
                "bookmark_bar": {
                    "type": "folder",
                    "id": "1",
                    "name": "root1",
                    "date_added": STAMP,
                    "date_modified": STAMP,
                    "children": [
                        {"type": "url", "id": "2", "name": "u1", "date_added": STAMP, "url": "http://x"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_convert_minimal_source() {
        let mut tree = BookmarkTree::with_offset(offset_from_minutes(180));

        let report = convert_chrome(&mut tree, &minimal_source()).unwrap();

        assert_eq!(report.folders, 1);
        assert_eq!(report.urls, 1);
        assert!(report.renamed.is_empty());
        assert_eq!(tree.get_children("root1").unwrap(), (true, vec!["u1".to_string()]));
        assert_eq!(tree.get_children(ROOT_NAME).unwrap().1, vec!["root1".to_string()]);

        let NodeView::Url(url) = tree.get_node("u1").unwrap() else {
            panic!("expected a url");
        };
        assert_eq!(url.date_added, "2016-01-22T10:29:42");
        assert_eq!(url.url, "http://x");
        assert_eq!(url.id_no, 2);

        let NodeView::Folder(folder) = tree.get_node("root1").unwrap() else {
            panic!("expected a folder");
        };
        assert_eq!(folder.id_no, 1);
        assert_eq!(folder.date_added, "2016-01-22T10:29:42");
        assert_eq!(folder.guid.len(), 36);
    }

    #[test]
    fn test_folder_date_modified_survives_children() {
        let mut source = minimal_source();
        source["roots"]["other"] = json!({
            "type": "folder", "name": "empty", "date_modified": STAMP, "children": [
                {"type": "folder", "name": "nested", "date_modified": STAMP, "children": [
                    {"type": "url", "name": "deep", "url": "http://deep"}
                ]}
            ]
        });
        let mut tree = BookmarkTree::new();

        convert_chrome(&mut tree, &source).unwrap();

        for name in ["root1", "empty", "nested"] {
            let NodeView::Folder(folder) = tree.get_node(name).unwrap() else {
                panic!("expected a folder");
            };
            assert_eq!(folder.date_modified, "2016-01-22T07:29:42", "folder {}", name);
        }
    }

    #[test]
    fn test_convert_in_utc() {
        let mut tree = BookmarkTree::new();
        convert_chrome(&mut tree, &minimal_source()).unwrap();
        assert_eq!(tree.get_node("u1").unwrap().date_added(), "2016-01-22T07:29:42");
    }

    #[test]
    fn test_source_is_not_modified() {
        let source = minimal_source();
        let before = source.clone();
        let mut tree = BookmarkTree::new();

        convert_chrome(&mut tree, &source).unwrap();

        assert_eq!(source, before);
    }

    #[test]
    fn test_missing_top_level_keys() {
        for key in ["roots", "checksum", "version"] {
            let mut source = minimal_source();
            source.as_object_mut().unwrap().remove(key);
            let mut tree = BookmarkTree::new();

            let err = convert_chrome(&mut tree, &source).unwrap_err();

            assert!(matches!(err, ConvertError::MalformedSourceFormat(ref msg) if msg.contains(key)));
            assert!(tree.is_empty());
        }
    }

    #[test]
    fn test_not_an_object() {
        let mut tree = BookmarkTree::new();
        let err = convert_chrome(&mut tree, &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedSourceFormat(_)));
    }

    #[test]
    fn test_bad_timestamp_leaves_tree_untouched() {
        let mut source = minimal_source();
        source["roots"]["bookmark_bar"]["children"][0]["date_added"] = json!("yesterday");
        let mut tree = BookmarkTree::new();

        let err = convert_chrome(&mut tree, &source).unwrap_err();

        assert!(matches!(err, ConvertError::InvalidNode { ref name, .. } if name == "u1"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_name_collisions_are_suffixed() {
        let source = json!({
            "checksum": "abc",
            "version": 1,
            "roots": {
                "bookmark_bar": {"type": "folder", "name": "Bar", "children": [
                    {"type": "url", "name": "dup", "url": "http://1"},
                    {"type": "url", "name": "dup", "url": "http://2"},
                    {"type": "folder", "name": "dup", "children": [
                        {"type": "url", "name": "inner", "url": "http://3"}
                    ]}
                ]},
                "other": {"type": "folder", "name": "Bar", "children": []}
            }
        });
        let mut tree = BookmarkTree::new();

        let report = convert_chrome(&mut tree, &source).unwrap();

        assert_eq!(
            tree.get_children("Bar").unwrap().1,
            vec!["dup".to_string(), "dup (1)".to_string(), "dup (2)".to_string()]
        );
        assert_eq!(tree.get_children("dup (2)").unwrap().1, vec!["inner".to_string()]);
        assert_eq!(tree.get_children(ROOT_NAME).unwrap().1, vec!["Bar".to_string(), "Bar (1)".to_string()]);
        assert_eq!(report.renamed.len(), 3);
        assert_eq!(report.renamed[0], ("dup".to_string(), "dup (1)".to_string()));
        assert_eq!(report.total(), 6);
    }

    #[test]
    fn test_collision_with_existing_tree() {
        let mut tree = BookmarkTree::new();
        tree.add_node(NodeDraft::folder(ROOT_NAME, "root1")).unwrap();

        convert_chrome(&mut tree, &minimal_source()).unwrap();

        assert!(tree.contains("root1 (1)"));
        assert_eq!(tree.get_children("root1 (1)").unwrap().1, vec!["u1".to_string()]);
    }

    #[test]
    fn test_chrome_guid_is_kept_when_valid() {
        let guid = "00000000-0000-4000-a000-000000000001";
        let mut source = minimal_source();
        source["roots"]["bookmark_bar"]["guid"] = json!(guid);
        source["roots"]["bookmark_bar"]["children"][0]["guid"] = json!("not-a-uuid");
        let mut tree = BookmarkTree::new();

        convert_chrome(&mut tree, &source).unwrap();

        assert_eq!(tree.get_node("root1").unwrap().guid(), guid);
        let url_guid = tree.get_node("u1").unwrap().guid().to_string();
        assert_ne!(url_guid, "not-a-uuid");
        assert_eq!(url_guid.len(), 36);

        // Converting the same file again must not reuse the guid
        convert_chrome(&mut tree, &source).unwrap();
        assert_ne!(tree.get_node("root1 (1)").unwrap().guid(), guid);
    }

    #[test]
    fn test_numeric_fields_and_extras() {
        let source = json!({
            "checksum": "", "version": 1,
            "roots": {
                "bookmark_bar": {
                    "type": "folder", "id": 7, "name": "bar",
                    "date_added": 13097921382951728_i64,
                    "meta_info": {"last_visited": "1"},
                    "children": []
                },
                "sync_transaction_version": "1"
            }
        });
        let mut tree = BookmarkTree::new();

        let report = convert_chrome(&mut tree, &source).unwrap();

        assert_eq!(report.folders, 1);
        let NodeView::Folder(folder) = tree.get_node("bar").unwrap() else {
            panic!("expected a folder");
        };
        assert_eq!(folder.id_no, 7);
        assert_eq!(folder.date_added, "2016-01-22T07:29:42");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_untyped_node_is_a_url() {
        let source = json!({
            "checksum": "", "version": 1,
            "roots": {"other": {"type": "folder", "name": "other", "children": [
                {"name": "plain", "url": "http://plain"}
            ]}}
        });
        let mut tree = BookmarkTree::new();
        convert_chrome(&mut tree, &source).unwrap();
        assert_eq!(tree.get_node("plain").unwrap().kind(), NodeKind::Url);
    }

    #[test]
    fn test_convert_mozilla_not_implemented() {
        let mut tree = BookmarkTree::new();
        let err = convert_mozilla(&mut tree, &json!({})).unwrap_err();
        assert!(matches!(err, ConvertError::NotImplemented(SourceFormat::Mozilla)));
        assert!(err.to_string().contains("not implemented"));
        assert!(tree.is_empty());

        let err = SourceFormat::Mozilla.convert(&mut tree, &minimal_source()).unwrap_err();
        assert!(matches!(err, ConvertError::NotImplemented(_)));
    }

    #[test]
    fn test_source_format_parse() {
        assert_eq!("Chrome".parse::<SourceFormat>().unwrap(), SourceFormat::Chrome);
        assert_eq!("mozilla".parse::<SourceFormat>().unwrap(), SourceFormat::Mozilla);
        assert!("opera".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn test_read_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        fs::write(&path, minimal_source().to_string()).unwrap();

        let source = read_source(&path).unwrap();
        assert_eq!(source, minimal_source());

        fs::write(&path, "not json").unwrap();
        assert!(matches!(read_source(&path).unwrap_err(), ConvertError::Parse { .. }));

        let missing = temp_dir.path().join("missing");
        assert!(matches!(read_source(&missing).unwrap_err(), ConvertError::Read { .. }));
    }
}
