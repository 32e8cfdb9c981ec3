use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Thresholds, DEFAULT_CUTOFF, DEFAULT_ESCALATE_THRESHOLD};
use crate::error::{FaqError, Result};

pub const CONFIG_FILE: &str = "config.toml";

/// File layout and matching thresholds, read from `config.toml`.
/// Relative store paths resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub corpus: PathBuf,
    pub counters: PathBuf,
    pub escalations: PathBuf,
    pub cutoff: f64,
    pub escalate_threshold: f64,
    pub completion: Option<CompletionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            corpus: PathBuf::from("faq.json"),
            counters: PathBuf::from("top_counts.json"),
            escalations: PathBuf::from("escalations.json"),
            cutoff: DEFAULT_CUTOFF,
            escalate_threshold: DEFAULT_ESCALATE_THRESHOLD,
            completion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Command line that reads a prompt on stdin and prints an answer.
    pub command: String,
    /// Humantime duration, e.g. `"30s"` or `"1m 30s"`.
    pub timeout: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            command: "ollama run mistral".into(),
            timeout: "30s".into(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Result<Duration> {
        let timeout = humantime::parse_duration(&self.timeout)
            .map_err(|err| FaqError::Config(format!("completion.timeout: {err}")))?;
        if timeout.is_zero() {
            return Err(FaqError::Config("completion.timeout must be > 0".to_string()));
        }
        Ok(timeout)
    }
}

impl Config {
    /// `<config dir>/faqdesk/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("faqdesk").join(CONFIG_FILE))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(FaqError::Config(format!("read {}: {err}", path.display())));
            }
        };

        let config = Self::from_toml(&contents)
            .map_err(|err| FaqError::Config(format!("{}: {err}", path.display())))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|err| FaqError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cutoff", self.cutoff),
            ("escalate_threshold", self.escalate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FaqError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.escalate_threshold > self.cutoff {
            return Err(FaqError::Config(format!(
                "escalate_threshold ({}) must not exceed cutoff ({})",
                self.escalate_threshold, self.cutoff
            )));
        }
        if let Some(completion) = &self.completion {
            completion.timeout()?;
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cutoff: self.cutoff,
            escalate_threshold: self.escalate_threshold,
        }
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join(&self.corpus)
    }

    pub fn counters_path(&self) -> PathBuf {
        self.data_dir.join(&self.counters)
    }

    pub fn escalations_path(&self) -> PathBuf {
        self.data_dir.join(&self.escalations)
    }
}
