//! Configuration for the MoodSense engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Length of a focus session
    #[serde(with = "duration_serde")]
    pub session_duration: Duration,

    /// Which signal sources to listen to
    pub sources: SourceConfig,

    /// Capacity of the audio vector-averaging window, in model time steps
    pub audio_window_steps: usize,

    /// Cadence analysis runs on every Nth text-change event
    pub analysis_stride: usize,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Capture channel count
    pub channels: u16,

    /// Path for exported WAV captures
    pub export_path: PathBuf,

    /// Path for storing verdict stats and the feature log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moodsense");

        Self {
            session_duration: Duration::from_secs(25 * 60),
            sources: SourceConfig::default(),
            audio_window_steps: 400,
            analysis_stride: 10,
            sample_rate: 16_000,
            channels: 1,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moodsense")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration for which signal sources to listen to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub face: bool,
    pub audio: bool,
    pub typing: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            face: true,
            audio: true,
            typing: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            face: sources.iter().any(|s| s == "face" || s == "all"),
            audio: sources.iter().any(|s| s == "audio" || s == "all"),
            typing: sources.iter().any(|s| s == "typing" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.face || self.audio || self.typing
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("face,audio");
        assert!(config.face);
        assert!(config.audio);
        assert!(!config.typing);

        let config = SourceConfig::from_csv("typing");
        assert!(config.typing);
        assert!(!config.face);

        let config = SourceConfig::from_csv("all");
        assert!(config.face);
        assert!(config.audio);
        assert!(config.typing);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session_duration, Duration::from_secs(25 * 60));
        assert_eq!(config.audio_window_steps, 400);
        assert_eq!(config.analysis_stride, 10);
        assert!(config.sources.any_enabled());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_duration, config.session_duration);
        assert_eq!(parsed.sample_rate, config.sample_rate);
    }
}
