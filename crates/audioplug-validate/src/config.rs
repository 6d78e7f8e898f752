use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use audioplug_sdk::MAX_EVENTS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    General,
    Lifecycle,
    Processing,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::General, Suite::Lifecycle, Suite::Processing];

    pub fn name(self) -> &'static str {
        match self {
            Suite::General => "general",
            Suite::Lifecycle => "lifecycle",
            Suite::Processing => "processing",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::ALL
            .into_iter()
            .find(|suite| suite.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::Invalid(format!("unknown suite `{s}`")))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Run parameters for a conformance run. Missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub sample_rates: Vec<f64>,
    pub block_size: usize,
    /// Blocks rendered by each processing test.
    pub blocks: usize,
    pub max_events: usize,
    /// Run the 64-bit tests when the component supports them.
    pub double_precision: bool,
    pub suites: Vec<Suite>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sample_rates: vec![44_100.0, 48_000.0, 96_000.0],
            block_size: 512,
            blocks: 16,
            max_events: MAX_EVENTS,
            double_precision: true,
            suites: Suite::ALL.to_vec(),
        }
    }
}

impl ValidatorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rates.is_empty() {
            return Err(ConfigError::Invalid("no sample rates configured".into()));
        }
        if let Some(rate) = self
            .sample_rates
            .iter()
            .find(|rate| !rate.is_finite() || **rate <= 0.0)
        {
            return Err(ConfigError::Invalid(format!("sample rate {rate} is not positive")));
        }
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block size must be at least 1".into()));
        }
        if self.blocks == 0 {
            return Err(ConfigError::Invalid("block count must be at least 1".into()));
        }
        if self.max_events == 0 {
            return Err(ConfigError::Invalid("max_events must be at least 1".into()));
        }
        if self.suites.is_empty() {
            return Err(ConfigError::Invalid("no suites enabled".into()));
        }
        Ok(())
    }

    pub fn runs(&self, suite: Suite) -> bool {
        self.suites.contains(&suite)
    }

    /// The first configured sample rate, used by tests that need only one.
    pub fn primary_sample_rate(&self) -> f64 {
        self.sample_rates.first().copied().unwrap_or(44_100.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config = ValidatorConfig::from_json(r#"{ "block_size": 128, "suites": ["lifecycle"] }"#)
            .unwrap();
        assert_eq!(config.block_size, 128);
        assert_eq!(config.suites, vec![Suite::Lifecycle]);
        assert_eq!(config.max_events, 2048);
        assert_eq!(config.sample_rates.len(), 3);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            ValidatorConfig::from_json(r#"{ "block_size": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ValidatorConfig::from_json(r#"{ "sample_rates": [-1.0] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ValidatorConfig::from_json(r#"{ "blok_size": 64 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn suite_names_parse() {
        assert_eq!("Processing".parse::<Suite>().unwrap(), Suite::Processing);
        assert!("nope".parse::<Suite>().is_err());
    }
}
