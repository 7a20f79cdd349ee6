//! Database command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use marktree_core::{Config, NodeKind, StorageError, Store};

use crate::editor::{confirm, validate_name};
use crate::output::{Output, OutputFormat};

/// Create a database and return a store bound to it
///
/// An existing file is only replaced with `--force` or after an
/// interactive confirmation.
pub fn create_store(config: Config, name: &str, force: bool, output: &Output) -> Result<Store> {
    let name = validate_name(name)?;
    let path = config.database_path(name);
    let mut store = Store::new(config);

    if let Err(e) = store.create_database(name) {
        let exists = matches!(
            e.downcast_ref::<StorageError>(),
            Some(StorageError::AlreadyExists { .. })
        );
        if !exists {
            return Err(e);
        }

        let overwrite = force
            || (output.should_prompt()
                && confirm(&format!("Database <{}> already exists. Overwrite?", name))?);
        if !overwrite {
            return Err(e);
        }

        tracing::info!(path = %path.display(), "overwriting database");
        store.delete_database(name)?;
        store.create_database(name)?;
    }

    output.success(&format!("Database <{}> created at {}", name, path.display()));
    Ok(store)
}

/// Delete a database file
pub fn delete(config: Config, name: &str, yes: bool, output: &Output) -> Result<()> {
    let path = config.database_path(name);

    // Confirm deletion
    if output.should_prompt() && !yes {
        println!("Delete database <{}> ({})", name, path.display());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    Store::new(config).delete_database(name)?;

    output.success(&format!("Database <{}> has been deleted", name));
    Ok(())
}

/// Make a database the default for later commands
pub fn use_database(
    config: Config,
    config_path: Option<&PathBuf>,
    name: &str,
    output: &Output,
) -> Result<()> {
    // Refuse to point the default at something that does not open
    Store::open(config.clone(), name)?;

    let mut config = config;
    config.set("default_database", name)?;
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Using database <{}>", name));
    Ok(())
}

/// Show which database is open and what it holds
pub fn info(store: &Store, output: &Output) -> Result<()> {
    let outline = store.outline();
    let folders = outline
        .iter()
        .skip(1)
        .filter(|entry| entry.kind == NodeKind::Folder)
        .count();
    let urls = outline.iter().filter(|entry| entry.kind == NodeKind::Url).count();
    let path = store
        .database_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({"path": path, "folders": folders, "urls": urls})
            );
        }
        OutputFormat::Quiet => println!("{}", path),
        OutputFormat::Human => {
            println!("Database: {}", path);
            println!("Folders:  {}", folders);
            println!("Urls:     {}", urls);
        }
    }
    Ok(())
}
