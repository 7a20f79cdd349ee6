//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/marktree/config.toml)
//! 3. Environment variables (MARKTREE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::timestamp::offset_from_minutes;

/// Environment variable prefix
const ENV_PREFIX: &str = "MARKTREE";

/// Extension given to database names that have none
pub const DATABASE_EXTENSION: &str = "json";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &["data_dir", "default_database", "utc_offset_minutes", "log_file"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory where relative database names are resolved
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database used when none is named explicitly
    #[serde(default)]
    pub default_database: Option<String>,

    /// Offset from UTC, in minutes, used when rendering dates
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Log destination for the CLI (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_database: None,
            utc_offset_minutes: 0,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MARKTREE_DATA_DIR, MARKTREE_DATABASE, MARKTREE_UTC_OFFSET)
    /// 2. Config file (~/.config/marktree/config.toml or MARKTREE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from `--config` if given, otherwise from the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // MARKTREE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MARKTREE_DATABASE
        if let Ok(val) = std::env::var(format!("{}_DATABASE", ENV_PREFIX)) {
            self.default_database = if val.is_empty() { None } else { Some(val) };
        }

        // MARKTREE_UTC_OFFSET
        if let Ok(val) = std::env::var(format!("{}_UTC_OFFSET", ENV_PREFIX)) {
            match val.trim().parse() {
                Ok(minutes) => self.utc_offset_minutes = minutes,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid MARKTREE_UTC_OFFSET"),
            }
        }
    }

    /// Set a configuration value by key
    ///
    /// An empty value or `none` clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |value: &str| {
            if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            }
        };

        match key {
            "data_dir" => self.data_dir = value.into(),
            "default_database" => self.default_database = optional(value),
            "utc_offset_minutes" => {
                self.utc_offset_minutes = value.trim().parse().with_context(|| {
                    format!("Invalid value for utc_offset_minutes: '{}'", value)
                })?;
            }
            "log_file" => self.log_file = optional(value).map(PathBuf::from),
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MARKTREE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marktree")
            .join("config.toml")
    }

    /// Resolve a database name to a file path
    ///
    /// Absolute paths and names with a directory part pass through, bare
    /// names are placed in `data_dir`. A `.json` extension is added when
    /// the name has none.
    pub fn database_path(&self, name: &str) -> PathBuf {
        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension(DATABASE_EXTENSION);
        }

        let bare = path.parent().map_or(true, |p| p.as_os_str().is_empty());
        if path.is_absolute() || !bare {
            path
        } else {
            self.data_dir.join(path)
        }
    }

    /// Offset used for every rendered date
    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marktree")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "MARKTREE_DATA_DIR",
        "MARKTREE_DATABASE",
        "MARKTREE_UTC_OFFSET",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.default_database.is_none());
        assert_eq!(config.utc_offset_minutes, 0);
        assert!(config.data_dir.ends_with("marktree"));
    }

    #[test]
    fn test_database_path() {
        let config = Config {
            data_dir: PathBuf::from("/data/marktree"),
            ..Config::default()
        };

        assert_eq!(
            config.database_path("bookmarks"),
            PathBuf::from("/data/marktree/bookmarks.json")
        );
        assert_eq!(
            config.database_path("work.db"),
            PathBuf::from("/data/marktree/work.db")
        );
        assert_eq!(
            config.database_path("/tmp/other.json"),
            PathBuf::from("/tmp/other.json")
        );
        assert_eq!(
            config.database_path("sub/dir/tree"),
            PathBuf::from("sub/dir/tree.json")
        );
    }

    #[test]
    fn test_utc_offset() {
        let config = Config {
            utc_offset_minutes: 180,
            ..Config::default()
        };
        assert_eq!(config.utc_offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MARKTREE_DATA_DIR", "/tmp/marktree-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/marktree-test"));
    }

    #[test]
    fn test_env_override_database() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MARKTREE_DATABASE", "work");
        config.apply_env_overrides();
        assert_eq!(config.default_database.as_deref(), Some("work"));

        // Empty string clears it
        env::set_var("MARKTREE_DATABASE", "");
        config.apply_env_overrides();
        assert!(config.default_database.is_none());
    }

    #[test]
    fn test_env_override_utc_offset() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("MARKTREE_UTC_OFFSET", "-300");
        config.apply_env_overrides();
        assert_eq!(config.utc_offset_minutes, -300);

        env::set_var("MARKTREE_UTC_OFFSET", "soon");
        config.apply_env_overrides();
        assert_eq!(config.utc_offset_minutes, -300);
    }

    #[test]
    fn test_set() {
        let mut config = Config::default();

        config.set("default_database", "home").unwrap();
        config.set("utc_offset_minutes", "60").unwrap();
        config.set("log_file", "/tmp/marktree.log").unwrap();
        assert_eq!(config.default_database.as_deref(), Some("home"));
        assert_eq!(config.utc_offset_minutes, 60);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/marktree.log")));

        config.set("log_file", "none").unwrap();
        assert!(config.log_file.is_none());

        assert!(config.set("utc_offset_minutes", "east").is_err());
        let err = config.set("colour", "red").unwrap_err();
        assert!(err.to_string().contains("default_database"));
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/marktree"),
            default_database: Some("bookmarks".to_string()),
            utc_offset_minutes: 120,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("default_database"));
        assert!(toml_str.contains("utc_offset_minutes"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            default_database = "work"
            utc_offset_minutes = 180
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.default_database.as_deref(), Some("work"));
        assert_eq!(config.utc_offset_minutes, 180);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.default_database.is_none());
        assert_eq!(config.utc_offset_minutes, 0);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("default_database", "saved").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.default_database.as_deref(), Some("saved"));
    }
}
