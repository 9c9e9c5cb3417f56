use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading a [`TrackerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// What to do when the current state refuses a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Report the transition and push anyway.
    #[default]
    Warn,
    /// Refuse the push with `InvalidTransition`.
    Strict,
}

/// Tunables for a cause tracker. Every field has a default, so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frame count (sentinel included) above which pushes and pops report a
    /// possible runaway phase.
    pub runaway_depth_threshold: usize,
    pub transition_policy: TransitionPolicy,
    /// Attach a forced backtrace to runaway and transition reports.
    pub capture_backtraces: bool,
    /// Log every block change replayed during unwind at debug level.
    pub log_block_actions: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            runaway_depth_threshold: 6,
            transition_policy: TransitionPolicy::Warn,
            capture_backtraces: false,
            log_block_actions: true,
        }
    }
}

impl TrackerConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runaway_depth_threshold == 0 {
            return Err(ConfigError::Invalid(
                "runaway_depth_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
