use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "neurotest.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub results_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub window_title: String,
    pub participant: ParticipantConfig,
}

/// Behaviour of the simulated participant in headless runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticipantConfig {
    pub latency_ms: u64,
    /// Probability of a wrong answer on each trial.
    pub error_rate: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            font_path: None,
            shuffle: true,
            seed: None,
            window_title: "neurotest".to_string(),
            participant: ParticipantConfig::default(),
        }
    }
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            latency_ms: 350,
            error_rate: 0.0,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or [`DEFAULT_CONFIG_FILE`] when it exists, or falls back
    /// to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.participant.error_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Invalid(format!(
                "participant.error_rate must be within 0..=1, got {rate}"
            )));
        }
        if self.window_title.trim().is_empty() {
            return Err(ConfigError::Invalid("window_title is empty".into()));
        }
        Ok(())
    }
}
