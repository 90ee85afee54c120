//! Configuration management for metafetch.
//!
//! Configuration is stored in TOML format. Every field has a default, so an
//! absent file (or a partial one) is valid.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Defaults**: [`Config::default`]
//! 2. **Config file**: platform config directory `config.toml` (see [`Config::load`])
//! 3. **Environment variables**: `METAFETCH_*` overrides (see [`Config::apply_env`])
//!
//! ## Example Configuration File
//!
//! ```toml
//! user_agent = "Mozilla/5.0 ..."
//! timeout_secs = 30
//! max_redirects = 5
//! nico_url_type = "tree"
//!
//! [cache]
//! enabled = true
//! dir = "/home/user/.local/share/metafetch/cache"
//! capacity = 200
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser user agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0";

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `User-Agent` header sent with every upstream request.
    pub user_agent: String,

    /// Per-request timeout in seconds, enforced by the HTTP client.
    pub timeout_secs: u64,

    /// Maximum number of redirect hops followed for meta identifiers.
    pub max_redirects: usize,

    /// Which niconico URL form is used as the canonical `url`.
    pub nico_url_type: NicoUrlType,

    /// Metadata cache settings.
    pub cache: CacheConfig,
}

/// Canonical niconico URL form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicoUrlType {
    /// Site-specific watch/view page (`www.nicovideo.jp/watch/sm9`).
    #[default]
    Watch,
    /// Content tree page on niconico commons.
    Tree,
}

/// Metadata cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When disabled every lookup goes to the network.
    pub enabled: bool,

    /// Directory holding persisted cache entries.
    pub dir: PathBuf,

    /// Number of entries kept in the in-memory window.
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_redirects: 5,
            nico_url_type: NicoUrlType::Watch,
            cache: CacheConfig::default(),
        }
    }
}

/// `cache` under the platform data directory.
fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "metafetch", "metafetch")
        .map_or_else(|| PathBuf::from("__cache__"), |dirs| dirs.data_dir().join("cache"))
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            capacity: 200,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save the configuration to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Apply `METAFETCH_*` environment overrides.
    ///
    /// - `METAFETCH_CACHE_DIR`: cache directory
    /// - `METAFETCH_USER_AGENT`: user agent
    /// - `METAFETCH_NO_CACHE`: any value other than `0`/`false` disables the cache
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var("METAFETCH_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            self.cache.dir = PathBuf::from(dir.trim());
        }
        if let Some(ua) = var("METAFETCH_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.user_agent = ua;
        }
        if let Some(flag) = var("METAFETCH_NO_CACHE") {
            let flag = flag.trim();
            if !(flag.is_empty() || flag == "0" || flag.eq_ignore_ascii_case("false")) {
                self.cache.enabled = false;
            }
        }
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Path of the default configuration file, if the platform has one.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "metafetch", "metafetch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.nico_url_type, NicoUrlType::Watch);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 200);
        assert!(!config.cache.dir.as_os_str().is_empty());
    }

    #[test]
    fn test_default_cache_dir_is_under_data_dir() {
        let dir = default_cache_dir();

        match directories::ProjectDirs::from("dev", "metafetch", "metafetch") {
            Some(dirs) => {
                assert!(dir.starts_with(dirs.data_dir()));
                assert!(dir.ends_with("cache"));
            },
            None => assert_eq!(dir, PathBuf::from("__cache__")),
        }
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        // Given: A config file that only sets a couple of keys
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "nico_url_type = \"tree\"\n[cache]\ncapacity = 3\n")?;

        // When: Loading it
        let config = Config::load_from(&path)?;

        // Then: Set keys apply, everything else is default
        assert_eq!(config.nico_url_type, NicoUrlType::Tree);
        assert_eq!(config.cache.capacity, 3);
        assert!(config.cache.enabled);
        assert_eq!(config.max_redirects, 5);
        Ok(())
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut original = Config::default();
        original.max_redirects = 2;
        original.cache.dir = PathBuf::from("/tmp/metafetch-test");

        original.save_to(&path)?;
        let loaded = Config::load_from(&path)?;

        assert_eq!(loaded.max_redirects, 2);
        assert_eq!(loaded.cache.dir, PathBuf::from("/tmp/metafetch-test"));
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        match Config::load_from(&path) {
            Err(Error::Config(msg)) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load_from(Path::new("/definitely/does/not/exist/config.toml"));
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Failed to read config")));
    }

    #[test]
    fn test_env_overrides() {
        // Given: A fake environment
        let env: HashMap<&str, &str> = HashMap::from([
            ("METAFETCH_CACHE_DIR", " /var/cache/mf "),
            ("METAFETCH_USER_AGENT", "test-agent"),
            ("METAFETCH_NO_CACHE", "1"),
        ]);

        // When: Applying overrides
        let config = Config::default().apply_overrides(|k| env.get(k).map(ToString::to_string));

        // Then: Each override takes effect
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/mf"));
        assert_eq!(config.user_agent, "test-agent");
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_no_cache_false_values_keep_cache() {
        for value in ["0", "false", "FALSE", ""] {
            let config = Config::default().apply_overrides(|k| {
                (k == "METAFETCH_NO_CACHE").then(|| value.to_string())
            });
            assert!(config.cache.enabled, "value {value:?} should keep the cache");
        }
    }
}
