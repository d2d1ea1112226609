//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/contactbook/config.toml)
//! 3. Environment variables (CONTACTBOOK_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::SyncPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "CONTACTBOOK";

/// Default time a highlighted contact stays marked
pub const DEFAULT_HIGHLIGHT_MS: u64 = 2000;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Exported device address book used by `sync`
    #[serde(default)]
    pub device_contacts_path: Option<PathBuf>,

    /// Conflict policy when a synced contact shares a phone with a local one
    #[serde(default)]
    pub sync_policy: SyncPolicy,

    /// How long a contact stays highlighted after add/edit
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,

    /// Log file path (defaults to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            device_contacts_path: None,
            sync_policy: SyncPolicy::default(),
            highlight_ms: DEFAULT_HIGHLIGHT_MS,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CONTACTBOOK_DATA_DIR, CONTACTBOOK_DEVICE_CONTACTS,
    ///    CONTACTBOOK_SYNC_POLICY)
    /// 2. Config file (~/.config/contactbook/config.toml or CONTACTBOOK_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
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
        config.ensure_data_dir()?;
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
        // CONTACTBOOK_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // CONTACTBOOK_DEVICE_CONTACTS
        if let Ok(val) = std::env::var(format!("{}_DEVICE_CONTACTS", ENV_PREFIX)) {
            self.device_contacts_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // CONTACTBOOK_SYNC_POLICY
        if let Ok(val) = std::env::var(format!("{}_SYNC_POLICY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.sync_policy = policy,
                Err(e) => tracing::warn!("Ignoring {}_SYNC_POLICY: {}", ENV_PREFIX, e),
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
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
    /// Can be overridden with CONTACTBOOK_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("contactbook")
            .join("config.toml")
    }

    /// Directory holding the key-value entries
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }

    /// Highlight duration as a `Duration`
    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contactbook")
}

fn default_highlight_ms() -> u64 {
    DEFAULT_HIGHLIGHT_MS
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
        "CONTACTBOOK_DATA_DIR",
        "CONTACTBOOK_DEVICE_CONTACTS",
        "CONTACTBOOK_SYNC_POLICY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.device_contacts_path.is_none());
        assert_eq!(config.sync_policy, SyncPolicy::OverwriteWithDevice);
        assert_eq!(config.highlight_ms, 2000);
        assert_eq!(config.highlight_duration(), Duration::from_secs(2));
        assert!(config.data_dir.ends_with("contactbook"));
    }

    #[test]
    fn test_storage_dir() {
        let config = Config::default();
        assert!(config.storage_dir().ends_with("storage"));
        assert!(config.storage_dir().starts_with(&config.data_dir));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONTACTBOOK_DATA_DIR", "/tmp/contactbook-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/contactbook-test"));
    }

    #[test]
    fn test_env_override_device_contacts() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONTACTBOOK_DEVICE_CONTACTS", "/tmp/export.json");
        config.apply_env_overrides();
        assert_eq!(
            config.device_contacts_path,
            Some(PathBuf::from("/tmp/export.json"))
        );

        // Empty string clears it
        env::set_var("CONTACTBOOK_DEVICE_CONTACTS", "");
        config.apply_env_overrides();
        assert!(config.device_contacts_path.is_none());
    }

    #[test]
    fn test_env_override_sync_policy() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CONTACTBOOK_SYNC_POLICY", "keep-local");
        config.apply_env_overrides();
        assert_eq!(config.sync_policy, SyncPolicy::KeepLocal);

        // Unknown values leave the current policy alone
        env::set_var("CONTACTBOOK_SYNC_POLICY", "sideways");
        config.apply_env_overrides();
        assert_eq!(config.sync_policy, SyncPolicy::KeepLocal);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/contactbook"),
            device_contacts_path: Some(PathBuf::from("/data/export.json")),
            sync_policy: SyncPolicy::KeepLocal,
            highlight_ms: 500,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("sync_policy = \"keep-local\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.device_contacts_path, config.device_contacts_path);
        assert_eq!(parsed.sync_policy, config.sync_policy);
        assert_eq!(parsed.highlight_ms, 500);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            device_contacts_path = "/custom/export.json"
            sync_policy = "overwrite"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(
            config.device_contacts_path,
            Some(PathBuf::from("/custom/export.json"))
        );
        assert_eq!(config.sync_policy, SyncPolicy::OverwriteWithDevice);
        assert_eq!(config.highlight_ms, DEFAULT_HIGHLIGHT_MS);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("CONTACTBOOK_DATA_DIR", temp_dir.path().join("data"));

        let path = temp_dir.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Defaults apply, data dir is created
        assert!(config.device_contacts_path.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            highlight_ms: 750,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.highlight_ms, 750);
    }
}
