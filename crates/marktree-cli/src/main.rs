//! marktree CLI
//!
//! Command-line interface for marktree - a bookmark tree of folders and URLs.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use marktree_core::{Config, SourceFormat, Store, ROOT_NAME};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "marktree")]
#[command(about = "marktree - a bookmark tree of folders and URLs")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Database to use (a name in data_dir, or a path)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Use an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, delete or select databases
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Print the whole tree
    Tree,
    /// List the children of a folder
    #[command(alias = "list")]
    Ls {
        /// Folder name (defaults to the root)
        #[arg(default_value = ROOT_NAME)]
        folder: String,
    },
    /// Show all fields of a bookmark
    Show {
        /// Bookmark name
        name: String,
    },
    /// Add a folder or a url
    Add {
        #[command(subcommand)]
        command: AddCommands,
    },
    /// Edit a bookmark (opens $EDITOR unless --set is given)
    Edit {
        /// Bookmark name
        name: String,
        /// Field to change, repeatable
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Delete a url or an empty folder
    #[command(alias = "delete")]
    Rm {
        /// Bookmark name
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import a browser bookmark export
    Convert {
        /// Source format (chrome, mozilla)
        format: SourceFormat,
        /// Export file to read
        source: PathBuf,
        /// Create this database and convert into it (default: the current database)
        #[arg(long)]
        into: Option<String>,
        /// Overwrite the --into database if it exists
        #[arg(long, requires = "into")]
        force: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Create a new, empty database
    Create {
        /// Database name or path
        name: String,
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },
    /// Delete a database file
    #[command(alias = "rm")]
    Delete {
        /// Database name or path
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Make a database the default
    Use {
        /// Database name or path
        name: String,
    },
    /// Show the current database
    Info,
}

#[derive(Subcommand)]
enum AddCommands {
    /// Add a folder
    Folder {
        /// Name of the new folder
        name: String,
        /// Parent folder
        #[arg(short, long, default_value = ROOT_NAME)]
        parent: String,
    },
    /// Add a url
    Url {
        /// Name of the new bookmark
        name: String,
        /// The URL itself
        #[arg(short, long)]
        url: String,
        /// Parent folder
        #[arg(short, long, default_value = ROOT_NAME)]
        parent: String,
        /// Icon
        #[arg(long, default_value = "")]
        icon: String,
        /// Keywords
        #[arg(short, long, default_value = "")]
        keywords: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, default_database, utc_offset_minutes, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even with a broken config file
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Db { command } => handle_db_command(command, config, config_path, cli.db, &output),
        Commands::Convert {
            format,
            source,
            into,
            force,
        } => {
            let store = match into {
                Some(name) => commands::database::create_store(config, &name, force, &output)?,
                None => open_store(config, cli.db.as_deref())?,
            };
            commands::convert::run(store, format, &source, &output)
        }
        command => {
            let mut store = open_store(config, cli.db.as_deref())?;
            handle_node_command(command, &mut store, &output)
        }
    }
}

fn handle_node_command(command: Commands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        Commands::Tree => commands::node::tree(store, output),
        Commands::Ls { folder } => commands::node::list(store, &folder, output),
        Commands::Show { name } => commands::node::show(store, &name, output),
        Commands::Add { command } => match command {
            AddCommands::Folder { name, parent } => {
                commands::node::add_folder(store, &name, &parent, output)
            }
            AddCommands::Url {
                name,
                url,
                parent,
                icon,
                keywords,
            } => commands::node::add_url(store, &name, &parent, url, icon, keywords, output),
        },
        Commands::Edit { name, set } => commands::node::edit(store, &name, &set, output),
        Commands::Rm { name, yes } => commands::node::remove(store, &name, yes, output),
        Commands::Db { .. } | Commands::Convert { .. } | Commands::Config { .. } => {
            unreachable!() // Handled in main
        }
    }
}

fn handle_db_command(
    command: DbCommands,
    config: Config,
    config_path: Option<&PathBuf>,
    db: Option<String>,
    output: &Output,
) -> Result<()> {
    match command {
        DbCommands::Create { name, force } => {
            commands::database::create_store(config, &name, force, output).map(|_| ())
        }
        DbCommands::Delete { name, yes } => commands::database::delete(config, &name, yes, output),
        DbCommands::Use { name } => commands::database::use_database(config, config_path, &name, output),
        DbCommands::Info => {
            let store = open_store(config, db.as_deref())?;
            commands::database::info(&store, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Open the database named by `--db`, falling back to `default_database`
fn open_store(config: Config, db: Option<&str>) -> Result<Store> {
    let Some(name) = db
        .map(str::to_string)
        .or_else(|| config.default_database.clone())
    else {
        bail!(
            "No database selected.\n\
             Pass --db <name>, or pick a default with `marktree db use <name>`."
        );
    };

    Store::open(config, &name)
}

/// Initialize logging
///
/// Only initializes if MARKTREE_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("MARKTREE_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "marktree_core={},marktree_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore errors if a subscriber is already installed
    match &config.log_file {
        Some(log_path) => match File::create(log_path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_url() {
        let cli = Cli::parse_from([
            "marktree", "--db", "work", "add", "url", "docs", "--url", "https://docs.rs",
            "--parent", "rust",
        ]);

        assert_eq!(cli.db.as_deref(), Some("work"));
        let Commands::Add {
            command: AddCommands::Url { name, url, parent, icon, .. },
        } = cli.command
        else {
            panic!("expected add url");
        };
        assert_eq!(name, "docs");
        assert_eq!(url, "https://docs.rs");
        assert_eq!(parent, "rust");
        assert_eq!(icon, "");
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::parse_from(["marktree", "convert", "chrome", "Bookmarks", "--into", "imported"]);

        let Commands::Convert { format, into, force, .. } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(format, SourceFormat::Chrome);
        assert_eq!(into.as_deref(), Some("imported"));
        assert!(!force);

        assert!(Cli::try_parse_from(["marktree", "convert", "opera", "Bookmarks"]).is_err());
        assert!(Cli::try_parse_from(["marktree", "convert", "chrome", "B", "--force"]).is_err());
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::parse_from(["marktree", "ls"]);
        let Commands::Ls { folder } = cli.command else {
            panic!("expected ls");
        };
        assert_eq!(folder, ROOT_NAME);
    }

    #[test]
    fn test_open_store_requires_a_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let err = open_store(config, None).unwrap_err();
        assert!(err.to_string().contains("No database selected"));
    }
}
