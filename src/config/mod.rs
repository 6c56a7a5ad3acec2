//! Application Configuration
//!
//! User settings stored in TOML format. Every section falls back to defaults,
//! so a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan loop settings
    pub scan: ScanSettings,
    /// Frame source settings
    pub capture: CaptureSettings,
    /// Recognition engine settings
    pub recognizer: RecognizerConfig,
    /// Visit service settings
    pub submission: SubmissionConfig,
    /// Match feedback settings
    pub feedback: FeedbackConfig,
}

/// Scan loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Language hint passed to the recognizer
    pub language: String,
    /// Digit run length that turns the interim status to "close"
    pub close_digit_run: usize,
}

impl ScanSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            language: crate::vision::DEFAULT_LANGUAGE.to_string(),
            close_digit_run: 15,
        }
    }
}

/// Frame source settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Image file kept up to date by an external camera tool
    pub snapshot_path: Option<PathBuf>,
}

/// Recognition engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Path or name of the tesseract binary
    pub tesseract_path: PathBuf,
    /// Tesseract page segmentation mode (`--psm`)
    pub page_segmentation_mode: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            page_segmentation_mode: 3,
        }
    }
}

/// Visit service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// URL the record is POSTed to
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Match feedback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Play a tone when a card is matched
    pub sound_enabled: bool,
    /// Tone frequency in Hz
    pub tone_hz: f32,
    /// Tone length in milliseconds
    pub tone_ms: u64,
    /// Volume (0.0 - 1.0)
    pub volume: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            tone_hz: 880.0,
            tone_ms: 150,
            volume: 0.3,
        }
    }
}

/// Default configuration file location
pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("id", "ktpscanner", "KtpScanner")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file, creating parent directories
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.scan.tick_interval_ms, 500);
        assert_eq!(config.scan.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.scan.language, "ind");
        assert_eq!(config.scan.close_digit_run, 15);

        assert!(config.capture.snapshot_path.is_none());

        assert_eq!(config.recognizer.tesseract_path, PathBuf::from("tesseract"));
        assert_eq!(config.recognizer.page_segmentation_mode, 3);

        assert_eq!(config.submission.endpoint, "http://127.0.0.1:8787");
        assert_eq!(config.submission.timeout_secs, 15);

        assert!(config.feedback.sound_enabled);
        assert!((config.feedback.tone_hz - 880.0).abs() < 0.01);
        assert_eq!(config.feedback.tone_ms, 150);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.capture.snapshot_path = Some(PathBuf::from("/tmp/snap.jpg"));
        config.scan.tick_interval_ms = 250;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.capture.snapshot_path, Some(PathBuf::from("/tmp/snap.jpg")));
        assert_eq!(parsed.scan.tick_interval_ms, 250);
        assert_eq!(parsed.submission.endpoint, config.submission.endpoint);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [submission]
            endpoint = "https://visits.example.org/api"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.submission.endpoint, "https://visits.example.org/api");
        assert_eq!(parsed.submission.timeout_secs, 15);
        assert_eq!(parsed.scan.tick_interval_ms, 500);
    }

    #[test]
    fn test_zero_tick_interval_is_clamped() {
        let settings = ScanSettings {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.feedback.sound_enabled = false;

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert!(!loaded.feedback.sound_enabled);
        assert_eq!(loaded.scan.language, config.scan.language);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
