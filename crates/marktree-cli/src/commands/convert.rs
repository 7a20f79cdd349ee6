//! Convert command handler

use std::path::Path;

use anyhow::{Context, Result};

use marktree_core::{SourceFormat, Store};

use crate::output::Output;

/// Import a browser export into the store's database
pub fn run(mut store: Store, format: SourceFormat, source: &Path, output: &Output) -> Result<()> {
    let report = store
        .convert(format, source)
        .with_context(|| format!("Failed to convert {} bookmarks from {:?}", format, source))?;

    output.print_report(&source.display().to_string(), &report);
    Ok(())
}
