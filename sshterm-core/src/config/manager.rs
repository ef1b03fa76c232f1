//! Configuration manager for TOML file operations
//!
//! This module provides the `ConfigManager` which handles loading and saving
//! application settings and the saved transcript list.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::models::TranscriptRecord;

use super::settings::AppSettings;

/// File names for configuration files
const CONFIG_FILE: &str = "config.toml";
const TRANSCRIPTS_FILE: &str = "transcripts.toml";

/// Wrapper for serializing a list of transcripts
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct TranscriptsFile {
    #[serde(default)]
    transcripts: Vec<TranscriptRecord>,
}

/// Configuration manager for `sshterm`
///
/// Handles loading and saving configuration files in TOML format.
/// Configuration is stored in `~/.config/sshterm/` by default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Base directory for configuration files
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory
    ///
    /// The default directory is `~/.config/sshterm/`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined.
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config")))?
            .join("sshterm");
        Ok(Self { config_dir })
    }

    /// Creates a new `ConfigManager` with a custom configuration directory
    ///
    /// `~` at the start of the path is expanded.
    #[must_use]
    pub fn with_config_dir(config_dir: impl AsRef<Path>) -> Self {
        let expanded = shellexpand::tilde(&config_dir.as_ref().to_string_lossy()).into_owned();
        Self {
            config_dir: PathBuf::from(expanded),
        }
    }

    /// Returns the configuration directory path
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of `config.toml`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Ensures the configuration directory exists
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::Write(format!(
                    "Failed to create config directory {}: {}",
                    self.config_dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    // ========== Settings ==========

    /// Loads application settings from the configuration file
    ///
    /// Returns default settings if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or holds
    /// invalid values.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let settings: AppSettings = Self::load_toml_file(&self.settings_path())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Saves application settings to the configuration file
    ///
    /// Creates the configuration directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the file cannot be
    /// written.
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        settings.validate()?;
        self.ensure_config_dir()?;
        Self::save_toml_file(&self.settings_path(), settings)
    }

    // ========== Transcripts ==========

    /// Loads saved transcripts in file order
    ///
    /// Returns an empty vector if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_transcripts(&self) -> ConfigResult<Vec<TranscriptRecord>> {
        let path = self.config_dir.join(TRANSCRIPTS_FILE);
        Self::load_toml_file::<TranscriptsFile>(&path).map(|f| f.transcripts)
    }

    /// Replaces the saved transcript list
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_transcripts(&self, transcripts: &[TranscriptRecord]) -> ConfigResult<()> {
        self.ensure_config_dir()?;
        let path = self.config_dir.join(TRANSCRIPTS_FILE);
        let file = TranscriptsFile {
            transcripts: transcripts.to_vec(),
        };
        Self::save_toml_file(&path, &file)
    }

    // ========== Generic TOML Operations ==========

    /// Loads and parses a TOML file
    ///
    /// Returns the default value if the file doesn't exist.
    fn load_toml_file<T>(path: &Path) -> ConfigResult<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if !path.exists() {
            return Ok(T::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Saves data to a TOML file
    fn save_toml_file<T>(path: &Path, data: &T) -> ConfigResult<()>
    where
        T: serde::Serialize,
    {
        let content = toml::to_string_pretty(data)
            .map_err(|e| ConfigError::Serialize(format!("Failed to serialize: {e}")))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::Write(format!("Failed to write {}: {}", path.display(), e)))
    }
}
