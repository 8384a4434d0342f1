//! Configuration loading for Laurel.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.laurel/config.toml`)
//! 3. User config (`~/.laurel/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LaurelError, Result};

/// Main configuration struct for Laurel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Award engine behavior.
    pub engine: EngineConfig,
    /// Storage backend behavior.
    pub storage: StorageConfig,
}

/// Award engine behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Grant every passed-but-unclaimed milestone instead of only the
    /// highest per kind. Off by default; the product has not committed to
    /// either answer, so this stays a runtime toggle.
    pub allow_catchup: bool,
    /// XP per derived level.
    pub xp_per_level: u32,
    /// Log the computed award plan before committing.
    pub debug_awards: bool,
}

/// Minimum valid xp_per_level (a zero divisor would break level math).
pub const MIN_XP_PER_LEVEL: u32 = 1;

impl EngineConfig {
    /// Check if an xp_per_level value is valid (must be >= 1).
    pub fn is_valid_xp_per_level(value: u32) -> bool {
        value >= MIN_XP_PER_LEVEL
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_catchup: false,
            xp_per_level: 100,
            debug_awards: false,
        }
    }
}

/// Storage backend behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Optimistic transaction retry budget for the in-memory backend.
    pub tx_retries: u32,
}

/// Minimum valid tx_retries (zero would make every transaction fail).
pub const MIN_TX_RETRIES: u32 = 1;

impl StorageConfig {
    /// Check if a tx_retries value is valid (must be >= 1).
    pub fn is_valid_tx_retries(value: u32) -> bool {
        value >= MIN_TX_RETRIES
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { tx_retries: 5 }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.laurel/config.toml` in cwd)
    /// 3. User config (`~/.laurel/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.laurel/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = laurel_home()?;
        let config_path = home.join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load project config from `.laurel/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = cwd.join(".laurel").join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| LaurelError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| LaurelError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LAUREL_ALLOW_CATCHUP
        if let Ok(val) = env::var("LAUREL_ALLOW_CATCHUP") {
            self.engine.allow_catchup = val == "true" || val == "1";
        }

        // LAUREL_DEBUG_AWARDS
        if let Ok(val) = env::var("LAUREL_DEBUG_AWARDS") {
            self.engine.debug_awards = val == "true" || val == "1";
        }

        // LAUREL_XP_PER_LEVEL
        if let Ok(val) = env::var("LAUREL_XP_PER_LEVEL") {
            match val.parse::<u32>() {
                Ok(n) => {
                    if EngineConfig::is_valid_xp_per_level(n) {
                        self.engine.xp_per_level = n;
                    } else {
                        eprintln!(
                            "Warning: Invalid LAUREL_XP_PER_LEVEL value '{}'. \
                            Must be >= {}. Using default '{}'.",
                            n, MIN_XP_PER_LEVEL, self.engine.xp_per_level
                        );
                    }
                }
                Err(_) => eprintln!(
                    "Warning: Invalid LAUREL_XP_PER_LEVEL value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.engine.xp_per_level
                ),
            }
        }

        // LAUREL_TX_RETRIES
        if let Ok(val) = env::var("LAUREL_TX_RETRIES") {
            match val.parse::<u32>() {
                Ok(n) => {
                    if StorageConfig::is_valid_tx_retries(n) {
                        self.storage.tx_retries = n;
                    } else {
                        eprintln!(
                            "Warning: Invalid LAUREL_TX_RETRIES value '{}'. \
                            Must be >= {}. Using default '{}'.",
                            n, MIN_TX_RETRIES, self.storage.tx_retries
                        );
                    }
                }
                Err(_) => eprintln!(
                    "Warning: Invalid LAUREL_TX_RETRIES value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.storage.tx_retries
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence: each of its non-default fields
    /// is applied to `self`. Field-by-field merging keeps the layering
    /// additive; a layer cannot explicitly set a value back to the default
    /// over a lower layer's customization.
    fn merge(mut self, other: Config) -> Self {
        let default_engine = EngineConfig::default();
        if other.engine.allow_catchup != default_engine.allow_catchup {
            self.engine.allow_catchup = other.engine.allow_catchup;
        }
        if other.engine.xp_per_level != default_engine.xp_per_level {
            self.engine.xp_per_level = other.engine.xp_per_level;
        }
        if other.engine.debug_awards != default_engine.debug_awards {
            self.engine.debug_awards = other.engine.debug_awards;
        }

        let default_storage = StorageConfig::default();
        if other.storage.tx_retries != default_storage.tx_retries {
            self.storage.tx_retries = other.storage.tx_retries;
        }

        self
    }
}

/// Get the Laurel home directory.
///
/// Checks the `LAUREL_HOME` environment variable first, then falls back to
/// `~/.laurel`.
pub fn laurel_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LAUREL_HOME") {
        if home.is_empty() {
            tracing::warn!("LAUREL_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("LAUREL_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".laurel"));
    }

    None
}

/// Get the users directory holding one record file per user.
///
/// Returns `<laurel_home>/users/`.
pub fn users_dir() -> Option<PathBuf> {
    laurel_home().map(|h| h.join("users"))
}

/// Get the catalogs directory holding `tasks.json` and `badges.json`.
///
/// Returns `<laurel_home>/catalogs/`.
pub fn catalogs_dir() -> Option<PathBuf> {
    laurel_home().map(|h| h.join("catalogs"))
}

/// Get the persisted identity session path.
///
/// Returns `<laurel_home>/session.json`.
pub fn session_path() -> Option<PathBuf> {
    laurel_home().map(|h| h.join("session.json"))
}
