//! Bookmark command handlers

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use marktree_core::{NodeDraft, NodeKind, NodeUpdate, NodeView, Store};

use crate::editor::{confirm, edit_text, validate_name};
use crate::output::Output;

/// Fields a user may change on a folder
const FOLDER_FIELDS: &[&str] = &["name"];

/// Fields a user may change on a url
const URL_FIELDS: &[&str] = &["name", "url", "icon", "keywords"];

fn editable_fields(kind: NodeKind) -> &'static [&'static str] {
    match kind {
        NodeKind::Folder => FOLDER_FIELDS,
        NodeKind::Url => URL_FIELDS,
    }
}

/// Print the whole tree
pub fn tree(store: &Store, output: &Output) -> Result<()> {
    output.print_outline(&store.outline());
    Ok(())
}

/// List the children of a folder
pub fn list(store: &Store, folder: &str, output: &Output) -> Result<()> {
    let (is_folder, children) = store.get_children(folder)?;
    output.print_children(folder, is_folder, &children);
    Ok(())
}

/// Show all fields of a bookmark
pub fn show(store: &Store, name: &str, output: &Output) -> Result<()> {
    let node = store.get_node(name)?;
    output.print_node(&node);
    Ok(())
}

/// Add a folder
pub fn add_folder(store: &mut Store, name: &str, parent: &str, output: &Output) -> Result<()> {
    let name = validate_name(name)?;
    store.add_node(NodeDraft::folder(parent, name))?;
    output.success(&format!("Folder <{}> has been added to <{}>", name, parent));
    Ok(())
}

/// Add a url
pub fn add_url(
    store: &mut Store,
    name: &str,
    parent: &str,
    url: String,
    icon: String,
    keywords: String,
    output: &Output,
) -> Result<()> {
    let name = validate_name(name)?;
    let draft = NodeDraft::url(parent, name, url)
        .with_icon(icon)
        .with_keywords(keywords);
    store.add_node(draft)?;
    output.success(&format!("Url <{}> has been added to <{}>", name, parent));
    Ok(())
}

/// Edit a bookmark from `KEY=VALUE` assignments, or in $EDITOR when there are none
pub fn edit(store: &mut Store, name: &str, assignments: &[String], output: &Output) -> Result<()> {
    let node = store.get_node(name)?;
    let allowed = editable_fields(node.kind());

    let changes = if assignments.is_empty() {
        edit_in_editor(&node, allowed)?
    } else {
        parse_assignments(assignments)?
    };

    if let Some((key, _)) = changes.iter().find(|(key, _)| !allowed.contains(&key.as_str())) {
        bail!(
            "Field '{}' can not be edited on a {}. Editable fields: {}",
            key,
            node.kind(),
            allowed.join(", ")
        );
    }
    if changes.is_empty() {
        output.message("No changes.");
        return Ok(());
    }

    let mut update = NodeUpdate::from_fields(changes)?;
    if let Some(new_name) = update.name.take() {
        update.name = Some(validate_name(&new_name)?.to_string());
    }

    store.update_node(name, &update)?;

    let shown = update.name.as_deref().unwrap_or(name);
    output.success(&format!("Bookmark <{}> has been updated", shown));
    Ok(())
}

/// Delete a url or an empty folder
pub fn remove(store: &mut Store, name: &str, yes: bool, output: &Output) -> Result<()> {
    let node = store.get_node(name)?;

    // Confirm deletion
    if output.should_prompt() && !yes {
        println!("Delete {} <{}>", node.kind(), name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_node(name)?;

    output.success(&format!("Bookmark <{}> has been deleted", name));
    Ok(())
}

fn parse_assignments(assignments: &[String]) -> Result<Vec<(String, String)>> {
    assignments
        .iter()
        .map(|assignment| {
            let (key, value) = assignment
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Let the user edit the editable fields as a JSON object; returns the changed ones
fn edit_in_editor(node: &NodeView, allowed: &[&str]) -> Result<Vec<(String, String)>> {
    let fields = node.fields();
    let editable: Map<String, Value> = allowed
        .iter()
        .filter_map(|key| fields.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect();

    let original = serde_json::to_string_pretty(&editable)?;
    let edited = edit_text(&original)?;
    let edited: Map<String, Value> =
        serde_json::from_str(&edited).context("Edited content is not a JSON object")?;

    Ok(edited
        .into_iter()
        .filter(|(key, value)| editable.get(key) != Some(value))
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}
