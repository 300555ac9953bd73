//! Configuration loading and management
//!
//! Bootstrap configuration resolves in priority order: command-line
//! argument, environment variable, TOML config file, compiled default.
//! All tunables from the deployment surface are enumerated here; nothing
//! else in the service reads the environment.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default HTTP port for automix-mx
fn default_port() -> u16 {
    5741
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_target_bpm() -> f64 {
    120.0
}

fn default_concurrency() -> usize {
    4
}

fn default_bitrate() -> String {
    "192k".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_decode_timeout() -> u64 {
    60
}

fn default_render_timeout() -> u64 {
    600
}

fn default_stem_engines() -> Vec<String> {
    vec!["remote".to_string(), "band_filter".to_string()]
}

fn default_quota_seconds() -> u64 {
    4 * 3600
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a compiled default so a missing config file is fine.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub store_root: Option<PathBuf>,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub analysis_sample_rate: Option<u32>,
    pub planner_target_bpm_default: Option<f64>,
    pub queue_concurrency: Option<usize>,
    pub output_bitrate: Option<String>,
    pub output_format: Option<String>,
    pub stem_engines: Option<Vec<String>>,
    pub stem_service_url: Option<String>,
    pub decode_timeout_seconds: Option<u64>,
    pub render_timeout_seconds: Option<u64>,
    pub monthly_quota_seconds: Option<u64>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite catalog path
    pub database_path: PathBuf,

    /// HTTP server port
    pub port: u16,

    /// Root folder for the filesystem object-store driver
    pub store_root: PathBuf,

    /// External transcoder binary (set once at startup)
    pub ffmpeg_path: String,

    /// Container prober binary (duration metadata)
    pub ffprobe_path: String,

    /// PCM target rate for analysis
    pub analysis_sample_rate: u32,

    /// Fallback target BPM when no input track has one
    pub planner_target_bpm_default: f64,

    /// Job queue worker count
    pub queue_concurrency: usize,

    /// Final MP3 bitrate
    pub output_bitrate: String,

    /// Final container format (fixed to mp3)
    pub output_format: String,

    /// Ordered stem engine identifiers, highest quality first
    pub stem_engines: Vec<String>,

    /// Base URL of the remote stem separator, if deployed
    pub stem_service_url: Option<String>,

    /// Per-decode deadline
    pub decode_timeout_seconds: u64,

    /// Per-render deadline
    pub render_timeout_seconds: u64,

    /// Monthly rendered-seconds cap per user (quota check-gate)
    pub monthly_quota_seconds: u64,
}

/// Command-line overrides accepted by `Config::load`
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub port: Option<u16>,
    pub store_root: Option<PathBuf>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

impl Config {
    /// Load configuration with CLI > env > TOML > default resolution
    pub fn load(config_path: &PathBuf, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match std::fs::read_to_string(config_path) {
            Ok(text) => toml::from_str::<TomlConfig>(&text)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", config_path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => TomlConfig::default(),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    config_path.display(),
                    e
                )))
            }
        };

        let stem_engines = env_var("STEM_ENGINES")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .or(toml_config.stem_engines)
            .unwrap_or_else(default_stem_engines);

        let config = Config {
            database_path: overrides
                .database
                .or_else(|| env_var("AUTOMIX_DB").map(PathBuf::from))
                .or(toml_config.database_path)
                .unwrap_or_else(|| PathBuf::from("automix.db")),
            port: overrides
                .port
                .or_else(|| env_parse("AUTOMIX_PORT"))
                .or(toml_config.port)
                .unwrap_or_else(default_port),
            store_root: overrides
                .store_root
                .or_else(|| env_var("AUTOMIX_STORE_ROOT").map(PathBuf::from))
                .or(toml_config.store_root)
                .unwrap_or_else(|| PathBuf::from("automix-store")),
            ffmpeg_path: env_var("FFMPEG_PATH")
                .or(toml_config.ffmpeg_path)
                .unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: env_var("FFPROBE_PATH")
                .or(toml_config.ffprobe_path)
                .unwrap_or_else(|| "ffprobe".to_string()),
            analysis_sample_rate: env_parse("ANALYSIS_SAMPLE_RATE")
                .or(toml_config.analysis_sample_rate)
                .unwrap_or_else(default_sample_rate),
            planner_target_bpm_default: env_parse("PLANNER_TARGET_BPM_DEFAULT")
                .or(toml_config.planner_target_bpm_default)
                .unwrap_or_else(default_target_bpm),
            queue_concurrency: env_parse("QUEUE_CONCURRENCY")
                .or(toml_config.queue_concurrency)
                .unwrap_or_else(default_concurrency),
            output_bitrate: env_var("OUTPUT_BITRATE")
                .or(toml_config.output_bitrate)
                .unwrap_or_else(default_bitrate),
            output_format: env_var("OUTPUT_FORMAT")
                .or(toml_config.output_format)
                .unwrap_or_else(default_format),
            stem_engines,
            stem_service_url: env_var("STEM_SERVICE_URL").or(toml_config.stem_service_url),
            decode_timeout_seconds: env_parse("DECODE_TIMEOUT_SECONDS")
                .or(toml_config.decode_timeout_seconds)
                .unwrap_or_else(default_decode_timeout),
            render_timeout_seconds: env_parse("RENDER_TIMEOUT_SECONDS")
                .or(toml_config.render_timeout_seconds)
                .unwrap_or_else(default_render_timeout),
            monthly_quota_seconds: env_parse("MONTHLY_QUOTA_SECONDS")
                .or(toml_config.monthly_quota_seconds)
                .unwrap_or_else(default_quota_seconds),
        };

        if config.output_format != "mp3" {
            return Err(Error::Config(format!(
                "output_format is fixed to mp3, got {:?}",
                config.output_format
            )));
        }
        if config.queue_concurrency == 0 {
            return Err(Error::Config("queue_concurrency must be at least 1".into()));
        }

        Ok(config)
    }

    /// Configuration for tests: temp paths, defaults everywhere else
    pub fn for_tests(database_path: PathBuf, store_root: PathBuf) -> Self {
        Config {
            database_path,
            port: 0,
            store_root,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            analysis_sample_rate: default_sample_rate(),
            planner_target_bpm_default: default_target_bpm(),
            queue_concurrency: default_concurrency(),
            output_bitrate: default_bitrate(),
            output_format: default_format(),
            stem_engines: default_stem_engines(),
            stem_service_url: None,
            decode_timeout_seconds: default_decode_timeout(),
            render_timeout_seconds: default_render_timeout(),
            monthly_quota_seconds: default_quota_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_missing_config_file_uses_defaults() {
        let config =
            Config::load(&PathBuf::from("/nonexistent/automix.toml"), ConfigOverrides::default())
                .unwrap();
        assert_eq!(config.port, 5741);
        assert_eq!(config.queue_concurrency, 4);
        assert_eq!(config.output_bitrate, "192k");
        assert_eq!(config.output_format, "mp3");
        assert_eq!(config.decode_timeout_seconds, 60);
        assert_eq!(config.render_timeout_seconds, 600);
        assert_eq!(config.stem_engines, vec!["remote", "band_filter"]);
    }

    #[test]
    #[serial]
    fn test_cli_override_wins() {
        let overrides = ConfigOverrides {
            port: Some(9000),
            ..Default::default()
        };
        let config = Config::load(&PathBuf::from("/nonexistent/automix.toml"), overrides).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    #[serial]
    fn test_toml_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automix.toml");
        std::fs::write(
            &path,
            "port = 6000\nqueue_concurrency = 2\nstem_engines = [\"band_filter\"]\n",
        )
        .unwrap();
        let config = Config::load(&path, ConfigOverrides::default()).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.queue_concurrency, 2);
        assert_eq!(config.stem_engines, vec!["band_filter"]);
    }

    #[test]
    #[serial]
    fn test_zero_concurrency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automix.toml");
        std::fs::write(&path, "queue_concurrency = 0\n").unwrap();
        assert!(Config::load(&path, ConfigOverrides::default()).is_err());
    }
}
