use anyhow::{ Context, Result };
use serde::{ Deserialize, Serialize };
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ invalid_config, ConfigError };

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub replay: ReplaySettings,

    #[serde(default)]
    pub colors: ColorConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplaySettings {
    /// Wall-clock length of one pass over the whole dataset
    #[serde(default = "default_animation_duration_ms")]
    pub animation_duration_ms: u64,

    /// Look-back from the simulated time that decides what is visible
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// Trail length cap per aircraft
    #[serde(default = "default_max_trail_points")]
    pub max_trail_points: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColorConfig {
    /// Colors assigned to aircraft by hashing their id (hex)
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// File path or http(s) URL of the state vector dataset
    #[serde(default = "default_source")]
    pub source: String,

    /// Timeout for remote datasets
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving positions.geojson and trails.geojson
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Ticks per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Seconds between status log lines (0 disables)
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

// Default value functions
fn default_animation_duration_ms() -> u64 {
    60_000
}
fn default_window_seconds() -> f64 {
    600.0
}
fn default_max_trail_points() -> usize {
    30
}

fn default_palette() -> Vec<String> {
    [
        "#E6194B", "#3CB44B", "#FFE119", "#4363D8", "#F58231", "#911EB4", "#46F0F0", "#F032E6",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_source() -> String {
    "data/states.json".to_string()
}
fn default_request_timeout() -> u64 {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}
fn default_frame_rate() -> u32 {
    10
}
fn default_status_interval() -> u64 {
    5
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            animation_duration_ms: default_animation_duration_ms(),
            window_seconds: default_window_seconds(),
            max_trail_points: default_max_trail_points(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self { palette: default_palette() }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            frame_rate: default_frame_rate(),
            status_interval_secs: default_status_interval(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            replay: ReplaySettings::default(),
            colors: ColorConfig::default(),
            data: DataConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ReplaySettings {
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }
}

impl OutputConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

impl ReplayConfig {
    /// Reject values the replay loop cannot work with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let replay = &self.replay;

        if replay.animation_duration_ms == 0 {
            return Err(invalid_config!("replay.animation_duration_ms", "must be greater than 0"));
        }
        if !replay.window_seconds.is_finite() || replay.window_seconds < 0.0 {
            return Err(
                invalid_config!("replay.window_seconds", "must be a non-negative number, got {}", replay.window_seconds)
            );
        }
        if replay.max_trail_points == 0 {
            return Err(invalid_config!("replay.max_trail_points", "must be greater than 0"));
        }
        if self.colors.palette.is_empty() {
            return Err(invalid_config!("colors.palette", "needs at least one color"));
        }
        if self.output.frame_rate == 0 {
            return Err(invalid_config!("output.frame_rate", "must be greater than 0"));
        }

        Ok(())
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// Load configuration from file or create default
pub fn load_config() -> Result<ReplayConfig> {
    let path = config_path();

    let config = if path.exists() {
        let contents = std::fs::read_to_string(&path).context("Failed to read config.toml")?;

        toml::from_str(&contents).context("Failed to parse config.toml")?
    } else {
        tracing::warn!("config.toml not found, creating default configuration");
        let config = ReplayConfig::default();
        save_config(&config)?;
        config
    };

    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ReplayConfig) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(config_path(), contents).context("Failed to write config.toml")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ReplayConfig = toml::from_str(
            r#"
            [replay]
            window_seconds = 300.0

            [data]
            source = "https://example.org/states.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.replay.window_seconds, 300.0);
        assert_eq!(config.replay.animation_duration_ms, 60_000);
        assert_eq!(config.replay.max_trail_points, 30);
        assert_eq!(config.colors.palette.len(), 8);
        assert_eq!(config.data.source, "https://example.org/states.json");
        assert_eq!(config.output.frame_rate, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let text = toml::to_string_pretty(&ReplayConfig::default()).unwrap();
        let config: ReplayConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.colors.palette, default_palette());
        assert_eq!(config.output.directory, PathBuf::from("out"));
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = ReplayConfig::default();
        config.replay.animation_duration_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "replay.animation_duration_ms", .. })
        ));

        let mut config = ReplayConfig::default();
        config.replay.max_trail_points = 0;
        assert!(config.validate().is_err());

        let mut config = ReplayConfig::default();
        config.replay.window_seconds = -1.0;
        assert!(config.validate().is_err());

        let mut config = ReplayConfig::default();
        config.colors.palette.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn frame_interval_follows_frame_rate() {
        let mut output = OutputConfig::default();
        output.frame_rate = 4;
        assert_eq!(output.frame_interval(), Duration::from_millis(250));
    }
}
