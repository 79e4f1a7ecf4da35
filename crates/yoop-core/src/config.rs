//! Tool configuration management.
//!
//! Handles loading, saving, and overriding the settings that control how
//! external tools are invoked: program paths for `yt-dlp`, `ffmpeg` and
//! `ffprobe`, and the strictness switches for listings and audio checks.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable overriding the media-fetching program.
pub const ENV_YT_DLP: &str = "YOOP_YT_DLP";
/// Environment variable overriding the transcoding program.
pub const ENV_FFMPEG: &str = "YOOP_FFMPEG";
/// Environment variable overriding the probing program.
pub const ENV_FFPROBE: &str = "YOOP_FFPROBE";

fn default_yt_dlp() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

/// Settings for external tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Media-fetching program (searched in `PATH` when relative).
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp_path: PathBuf,
    /// Transcoding program.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,
    /// Probing program.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: PathBuf,
    /// Fail listings on `NA` entries instead of dropping them.
    #[serde(default)]
    pub strict_listing: bool,
    /// Verify every fetched audio buffer with a decode pass.
    #[serde(default)]
    pub verify_audio: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            strict_listing: false,
            verify_audio: false,
        }
    }
}

impl ToolConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            debug!("Config file not found, using defaults");
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {e}"),
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| Error::FileSystem {
                path: parent.to_path_buf(),
                message: format!("Failed to create config directory: {e}"),
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to write config file: {e}"),
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Apply `YOOP_*` environment overrides for program paths.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        if let Some(path) = lookup(ENV_YT_DLP) {
            debug!("{} override: {}", ENV_YT_DLP, path.display());
            self.yt_dlp_path = path;
        }
        if let Some(path) = lookup(ENV_FFMPEG) {
            debug!("{} override: {}", ENV_FFMPEG, path.display());
            self.ffmpeg_path = path;
        }
        if let Some(path) = lookup(ENV_FFPROBE) {
            debug!("{} override: {}", ENV_FFPROBE, path.display());
            self.ffprobe_path = path;
        }
        self
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("yoop")
        .join("config.json")
}

/// Configuration manager that keeps the loaded config and its file location.
pub struct ConfigManager {
    path: PathBuf,
    config: ToolConfig,
}

impl ConfigManager {
    /// Create a manager backed by the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: config_file_path(),
            config: ToolConfig::load()?,
        })
    }

    /// Create a manager backed by a specific config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let config = if path.exists() {
            ToolConfig::load_from(&path)?
        } else {
            ToolConfig::default()
        };
        Ok(Self { path, config })
    }

    /// Get a reference to the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Replace the configuration and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved.
    pub fn update(&mut self, config: ToolConfig) -> Result<()> {
        self.config = config;
        self.config.save_to(&self.path)
    }

    /// Reset to default configuration and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved.
    pub fn reset(&mut self) -> Result<()> {
        self.update(ToolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert_eq!(config.yt_dlp_path, PathBuf::from("yt-dlp"));
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert!(!config.strict_listing);
        assert!(!config.verify_audio);
    }

    #[test]
    fn test_config_deserialization_fills_defaults() {
        let json = r#"{"ffmpeg_path":"/opt/ffmpeg/bin/ffmpeg","strict_listing":true}"#;
        let config: ToolConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.yt_dlp_path, PathBuf::from("yt-dlp"));
        assert!(config.strict_listing);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("nested").join("config.json");
        let config = ToolConfig {
            yt_dlp_path: PathBuf::from("/usr/local/bin/yt-dlp"),
            verify_audio: true,
            ..Default::default()
        };

        config.save_to(&path).expect("Should save");
        let loaded = ToolConfig::load_from(&path).expect("Should load");
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").expect("Should write");

        let result = ToolConfig::load_from(&path);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ToolConfig::load_from(Path::new("/nonexistent/yoop/config.json"));
        assert!(matches!(result, Err(Error::FileSystem { .. })));
    }

    #[test]
    fn test_overrides_replace_program_paths() {
        let config = ToolConfig::default().with_overrides(|key| match key {
            ENV_FFMPEG => Some(PathBuf::from("/custom/ffmpeg")),
            _ => None,
        });
        assert_eq!(config.ffmpeg_path, PathBuf::from("/custom/ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_config_file_path_uses_correct_name() {
        let path = ToolConfig::config_file_path();
        assert!(path.to_string_lossy().ends_with("config.json"));
        assert!(path.to_string_lossy().contains("yoop"));
    }

    #[test]
    fn test_config_manager_update_persists() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let path = temp_dir.path().join("config.json");
        let mut manager = ConfigManager::with_path(path.clone()).expect("Should create");
        assert_eq!(manager.config(), &ToolConfig::default());

        let config = ToolConfig {
            strict_listing: true,
            ..Default::default()
        };
        manager.update(config.clone()).expect("Should update");
        assert_eq!(ToolConfig::load_from(&path).expect("Should load"), config);

        manager.reset().expect("Should reset");
        assert_eq!(manager.config(), &ToolConfig::default());
    }
}
