/*!
    Input configuration.
*/

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ffmpeg_types::{SourceConfig, SourceKind};

const DEFAULT_BACKOFF_MS: u64 = 500;
const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;

/**
    Errors from loading an input configuration.
*/
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/**
    Delay between failed open attempts.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Always wait the same amount of time.
    Fixed { delay_ms: u64 },
    /// Start at `initial_ms` and double after every failure, up to `max_ms`.
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl BackoffPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::Exponential {
            initial_ms: initial.as_millis() as u64,
            max_ms: max.as_millis() as u64,
        }
    }

    /**
        Delay before the retry that follows the `attempt`-th consecutive
        failure (1-based).
    */
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { initial_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(31);
                let delay = initial_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(delay.min(max_ms))
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Fixed { delay_ms: 0 } => {
                Err(ConfigError::Invalid("backoff delay must be non-zero".into()))
            }
            Self::Exponential { initial_ms: 0, .. } => Err(ConfigError::Invalid(
                "initial backoff delay must be non-zero".into(),
            )),
            Self::Exponential { initial_ms, max_ms } if max_ms < initial_ms => Err(
                ConfigError::Invalid("max backoff delay is below the initial delay".into()),
            ),
            _ => Ok(()),
        }
    }
}

/**
    The three sources plus the retry and shutdown parameters.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    pub main: SourceConfig,
    pub backup: SourceConfig,
    pub filler: SourceConfig,
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// How long shutdown waits for each worker before detaching it.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

impl InputConfig {
    pub fn new(main: SourceConfig, backup: SourceConfig, filler: SourceConfig) -> Self {
        Self {
            main,
            backup,
            filler,
            backoff: BackoffPolicy::default(),
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn source(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Main => &self.main,
            SourceKind::Backup => &self.backup,
            SourceKind::Filler => &self.filler,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /**
        Parse and validate a YAML document.
    */
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /**
        Load and validate a YAML file.
    */
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in SourceKind::ALL {
            if self.source(kind).location.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{kind} location is empty")));
            }
        }
        if self.stop_timeout_ms == 0 {
            return Err(ConfigError::Invalid("stop timeout must be non-zero".into()));
        }
        self.backoff.validate()
    }
}
