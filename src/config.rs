//! Configuration management.
//!
//! Defaults for colors, export size and format, and the live-preview debounce
//! delay are read from a TOML file in the platform config directory. Every
//! section and field is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;
use crate::style::{Color, MAX_SIZE, PREVIEW_SIZE};

/// Default delay between the last edit and the preview regeneration.
pub const DEFAULT_DEBOUNCE_MS: u64 = 350;

/// Colors and size of exported codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub foreground: Color,
    pub background: Color,
    /// Export size in pixels
    pub size: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self { foreground: Color::BLACK, background: Color::WHITE, size: PREVIEW_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Directory downloads are written to
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { format: ExportFormat::Png, output_dir: PathBuf::from(".") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub debounce_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { debounce_ms: DEFAULT_DEBOUNCE_MS }
    }
}

impl LiveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/justqr/config.toml`
/// - macOS: `~/Library/Application Support/justqr/config.toml`
/// - Windows: `%APPDATA%\justqr\config.toml`
///
/// # Example
///
/// ```toml
/// [style]
/// foreground = "#1a1a2e"
/// background = "#ffffff"
/// size = 512
///
/// [export]
/// format = "svg"
/// output_dir = "qr"
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub style: StyleConfig,
    pub export: ExportConfig,
    pub live: LiveConfig,
}

impl Config {
    /// Gets the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("justqr");

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from `path`, or defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .context(format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.style.size == 0 || self.style.size > MAX_SIZE {
            anyhow::bail!("style.size must be between 1 and {MAX_SIZE}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.style.size, 256);
        assert_eq!(config.export.format, ExportFormat::Png);
        assert_eq!(config.live.debounce(), Duration::from_millis(350));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[style]\nforeground = \"#f00\"\n\n[export]\nformat = \"jpeg\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.style.foreground, Color::rgb(255, 0, 0));
        assert_eq!(config.style.background, Color::WHITE);
        assert_eq!(config.export.format, ExportFormat::Jpg);
        assert_eq!(config.live.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.style.background = Color::rgba(255, 255, 255, 0);
        config.style.size = 1024;
        config.export.format = ExportFormat::Webp;
        config.export.output_dir = PathBuf::from("out");
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[style]\nsize = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "[style]\nsize = 60000\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "[style]\nbackground = \"white\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
