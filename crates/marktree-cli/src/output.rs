//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use marktree_core::{ConversionReport, NodeKind, NodeView, OutlineEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print every field of a node
    pub fn print_node(&self, node: &NodeView) {
        match self.format {
            OutputFormat::Human => {
                for (key, value) in node.fields() {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Array(items) => items
                            .iter()
                            .filter_map(|item| item.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                        other => other.to_string(),
                    };
                    println!("{:<14} {}", format!("{}:", key), value);
                }
            }
            OutputFormat::Json => {
                println!("{}", to_pretty_json(node));
            }
            OutputFormat::Quiet => {
                println!("{}", node.guid());
            }
        }
    }

    /// Print the children of a node
    pub fn print_children(&self, name: &str, is_folder: bool, children: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if !is_folder {
                    println!("<{}> is a url and has no children.", name);
                    return;
                }
                if children.is_empty() {
                    println!("Folder <{}> is empty.", name);
                    return;
                }
                for child in children {
                    println!("{}", child);
                }
                println!("\n{} bookmark(s)", children.len());
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"name": name, "is_folder": is_folder, "children": children})
                );
            }
            OutputFormat::Quiet => {
                for child in children {
                    println!("{}", child);
                }
            }
        }
    }

    /// Print the tree as an indented outline
    pub fn print_outline(&self, entries: &[OutlineEntry]) {
        match self.format {
            OutputFormat::Human => {
                for entry in entries {
                    let marker = match entry.kind {
                        NodeKind::Folder => "+",
                        NodeKind::Url => "-",
                    };
                    println!("{}{} {}", "    ".repeat(entry.depth), marker, entry.name);
                }
            }
            OutputFormat::Json => {
                let json_entries: Vec<_> = entries
                    .iter()
                    .map(|e| serde_json::json!({"depth": e.depth, "name": e.name, "kind": e.kind}))
                    .collect();
                println!("{}", to_pretty_json(&json_entries));
            }
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.name);
                }
            }
        }
    }

    /// Print the outcome of a conversion
    pub fn print_report(&self, source: &str, report: &ConversionReport) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "✓ Converted {}: {} folder(s), {} url(s)",
                    source, report.folders, report.urls
                );
                for (from, to) in &report.renamed {
                    println!("  renamed <{}> to <{}>", truncate(from, 40), to);
                }
            }
            OutputFormat::Json => {
                println!("{}", to_pretty_json(report));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
