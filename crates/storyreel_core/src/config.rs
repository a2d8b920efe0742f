//! Configuration for the Storyreel pipeline.
//!
//! Configuration is layered:
//! - Bundled defaults (include_str! from storyreel.toml)
//! - User overrides (~/.config/storyreel/storyreel.toml, then ./storyreel.toml)
//!
//! Later sources take precedence. Secrets (webhook URLs, API keys) are
//! expected from the environment, loaded by the binary via dotenvy.

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storyreel_error::{ConfigError, StoryreelError, StoryreelResult};
use tracing::debug;

/// Generation worker pool settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Image generation collaborator endpoint
    pub image_endpoint: String,
    /// Audio generation collaborator endpoint
    pub audio_endpoint: String,
    /// Concurrency ceiling for image requests
    pub image_concurrency: usize,
    /// Concurrency ceiling for audio requests
    pub audio_concurrency: usize,
    /// Maximum attempts per (scene, kind) including the first
    pub max_attempts: u32,
    /// Initial backoff between retries, milliseconds
    pub initial_backoff_ms: u64,
    /// Backoff ceiling, seconds
    pub max_backoff_secs: u64,
    /// Hard timeout per attempt, seconds
    pub attempt_timeout_secs: u64,
}

impl GenerationConfig {
    /// Hard per-attempt timeout as a `Duration`.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Run-level policy settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of failed scenes that may be skipped before the run fails.
    /// Zero means every scene must reach `Ready`.
    pub max_skipped_scenes: usize,
    /// Directory holding per-run manifests and outputs
    pub runs_dir: String,
}

/// Timing resolution settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Minimum on-screen duration per scene, seconds
    pub scene_floor_secs: f64,
    /// Trailing pad appended after each narration clip, seconds
    pub trailing_pad_secs: f64,
}

impl TimingConfig {
    /// Scene floor as a `Duration`.
    pub fn scene_floor(&self) -> Duration {
        Duration::from_secs_f64(self.scene_floor_secs)
    }

    /// Trailing pad as a `Duration`.
    pub fn trailing_pad(&self) -> Duration {
        Duration::from_secs_f64(self.trailing_pad_secs)
    }
}

/// Media assembly settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssemblyConfig {
    /// Output frame rate
    pub fps: u32,
    /// Output resolution, "WIDTHxHEIGHT"
    pub resolution: String,
    /// x264 constant rate factor
    pub crf: u32,
    /// AAC audio bitrate, e.g. "192k"
    pub audio_bitrate: String,
    /// Maximum tolerated drift between cue sheet total and encoded output, seconds
    pub drift_tolerance_secs: f64,
    /// Encode step timeout, seconds (CPU/IO-bound, longer than attempt timeouts)
    pub encode_timeout_secs: u64,
    /// Whether a failed encode is retried once at the degraded resolution
    pub degraded_mode: bool,
    /// Resolution used for the degraded retry
    pub degraded_resolution: String,
}

impl AssemblyConfig {
    /// Drift tolerance as a `Duration`.
    pub fn drift_tolerance(&self) -> Duration {
        Duration::from_secs_f64(self.drift_tolerance_secs)
    }

    /// Encode timeout as a `Duration`.
    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }

    /// Parse `resolution` into `(width, height)`.
    pub fn parse_resolution(resolution: &str) -> StoryreelResult<(u32, u32)> {
        let parse = |part: Option<&str>| -> Option<u32> { part?.parse().ok() };
        let mut split = resolution.split('x');
        match (parse(split.next()), parse(split.next()), split.next()) {
            (Some(w), Some(h), None) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(StoryreelError::from(ConfigError::new(format!(
                "Invalid resolution '{}', expected WIDTHxHEIGHT",
                resolution
            )))),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct NotifyConfig {
    /// Webhook URL for terminal run notifications. Unset disables notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Top-level Storyreel configuration.
///
/// # Examples
///
/// ```no_run
/// use storyreel_core::StoryreelConfig;
///
/// let config = StoryreelConfig::load().unwrap();
/// assert!(config.generation.image_concurrency > 0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoryreelConfig {
    /// Generation worker pool settings
    pub generation: GenerationConfig,
    /// Run-level policy
    pub run: RunConfig,
    /// Timing resolution settings
    pub timing: TimingConfig,
    /// Assembly settings
    pub assembly: AssemblyConfig,
    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl StoryreelConfig {
    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    pub fn load() -> StoryreelResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../storyreel.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/storyreel/storyreel.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional, highest precedence)
        builder = builder.add_source(File::with_name("storyreel").required(false));

        builder
            .build()
            .map_err(|e| {
                StoryreelError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StoryreelError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration from a single explicit file, with no layering.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> StoryreelResult<Self> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                StoryreelError::from(ConfigError::new(format!(
                    "Failed to read configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StoryreelError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_parse() {
        const DEFAULT_CONFIG: &str = include_str!("../../../storyreel.toml");
        let config: StoryreelConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.generation.image_concurrency > 0);
        assert!(config.generation.audio_concurrency > 0);
        assert!(config.generation.max_attempts >= 1);
        assert_eq!(config.run.max_skipped_scenes, 0);
        assert!(config.assembly.drift_tolerance_secs > 0.0);
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!(
            AssemblyConfig::parse_resolution("1920x1080").unwrap(),
            (1920, 1080)
        );
        assert!(AssemblyConfig::parse_resolution("1920").is_err());
        assert!(AssemblyConfig::parse_resolution("ax1080").is_err());
        assert!(AssemblyConfig::parse_resolution("1920x1080x3").is_err());
        assert!(AssemblyConfig::parse_resolution("0x1080").is_err());
    }

    #[test]
    fn timing_durations() {
        let timing = TimingConfig {
            scene_floor_secs: 3.0,
            trailing_pad_secs: 0.35,
        };
        assert_eq!(timing.scene_floor(), Duration::from_secs_f64(3.0));
        assert_eq!(timing.trailing_pad(), Duration::from_secs_f64(0.35));
    }
}
