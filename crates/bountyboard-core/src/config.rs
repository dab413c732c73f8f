//! Bountyboard configuration.
//!
//! [`BountyConfig`] is an immutable value built once at startup (from a TOML
//! file, environment overrides, or defaults) and handed to the components
//! that need it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Severity;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reward amount paid for a fix at each severity before decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub info: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            info: 0.0,
            low: 1000.0,
            medium: 2500.0,
            high: 5000.0,
            critical: 10000.0,
        }
    }
}

impl SeverityWeights {
    pub fn get(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Info => self.info,
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

/// Parameters of the reward curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub severity_weights: SeverityWeights,
    /// Days after opening at which the reward reaches zero.
    pub max_days_to_fix: f64,
    /// How much each reopen steepens the decay.
    pub reopen_multiplier: u32,
    /// Label printed next to reward amounts.
    pub currency: String,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            severity_weights: SeverityWeights::default(),
            max_days_to_fix: 40.0,
            reopen_multiplier: 2,
            currency: "USD".to_string(),
        }
    }
}

/// Settings for the status comments the bot manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    /// Login the bot posts as. Only its comments are ever touched.
    pub bot_login: String,
    /// Version written into the comment header.
    pub schema_version: String,
    /// Also recognise comments posted before headers were introduced.
    pub legacy_markers: bool,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            bot_login: "bountyboard[bot]".to_string(),
            schema_version: "1".to_string(),
            legacy_markers: true,
        }
    }
}

/// Concurrency limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum in-flight per-issue tasks during a repository pass.
    pub max_concurrency: usize,
    /// Give up waiting for an issue's admission queue after this long.
    /// Unset waits forever.
    pub admission_timeout_secs: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            admission_timeout_secs: None,
        }
    }
}

/// Complete Bountyboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BountyConfig {
    pub reward: RewardConfig,
    pub comments: CommentConfig,
    pub runtime: RuntimeConfig,
}

impl BountyConfig {
    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: BountyConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Defaults with `BOUNTY_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `BOUNTY_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BOUNTY_BOT_LOGIN") {
            self.comments.bot_login = v;
        }
        if let Some(v) = lookup("BOUNTY_CURRENCY") {
            self.reward.currency = v;
        }
        if let Some(v) = lookup("BOUNTY_LEGACY_MARKERS") {
            self.comments.legacy_markers = parse_override("BOUNTY_LEGACY_MARKERS", &v)?;
        }
        if let Some(v) = lookup("BOUNTY_MAX_DAYS_TO_FIX") {
            self.reward.max_days_to_fix = parse_override("BOUNTY_MAX_DAYS_TO_FIX", &v)?;
        }
        if let Some(v) = lookup("BOUNTY_REOPEN_MULTIPLIER") {
            self.reward.reopen_multiplier = parse_override("BOUNTY_REOPEN_MULTIPLIER", &v)?;
        }
        if let Some(v) = lookup("BOUNTY_MAX_CONCURRENCY") {
            self.runtime.max_concurrency = parse_override("BOUNTY_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("BOUNTY_ADMISSION_TIMEOUT_SECS") {
            self.runtime.admission_timeout_secs =
                Some(parse_override("BOUNTY_ADMISSION_TIMEOUT_SECS", &v)?);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.reward.max_days_to_fix.is_finite() && self.reward.max_days_to_fix > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "reward.max_days_to_fix must be positive, got {}",
                self.reward.max_days_to_fix
            )));
        }
        for severity in Severity::ALL {
            let weight = self.reward.severity_weights.get(severity);
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "reward.severity_weights.{severity} must be a non-negative number, got {weight}"
                )));
            }
        }
        if self.comments.bot_login.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "comments.bot_login must not be empty".to_string(),
            ));
        }
        if self.runtime.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "runtime.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = BountyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reward.max_days_to_fix, 40.0);
        assert_eq!(config.reward.reopen_multiplier, 2);
        assert_eq!(config.reward.severity_weights.get(Severity::Low), 1000.0);
        assert!(config.runtime.admission_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BountyConfig::from_toml_str(
            r#"
            [reward]
            max_days_to_fix = 30.0
            currency = "EUR"

            [comments]
            bot_login = "bounty-bot"
            "#,
        )
        .unwrap();
        assert_eq!(config.reward.max_days_to_fix, 30.0);
        assert_eq!(config.reward.currency, "EUR");
        assert_eq!(config.reward.reopen_multiplier, 2);
        assert_eq!(config.comments.bot_login, "bounty-bot");
        assert!(config.comments.legacy_markers);
        assert_eq!(config.runtime.max_concurrency, 8);
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[runtime]\nmax_concurrency = 3\nadmission_timeout_secs = 30"
        )
        .unwrap();
        let config = BountyConfig::load(file.path()).unwrap();
        assert_eq!(config.runtime.max_concurrency, 3);
        assert_eq!(config.runtime.admission_timeout_secs, Some(30));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = BountyConfig::load(Path::new("/nonexistent/bounty.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("bounty.toml"));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let env: HashMap<&str, &str> = [
            ("BOUNTY_BOT_LOGIN", "sec-bot"),
            ("BOUNTY_REOPEN_MULTIPLIER", "3"),
            ("BOUNTY_ADMISSION_TIMEOUT_SECS", "45"),
        ]
        .into_iter()
        .collect();
        let config = BountyConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.comments.bot_login, "sec-bot");
        assert_eq!(config.reward.reopen_multiplier, 3);
        assert_eq!(config.runtime.admission_timeout_secs, Some(45));
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = BountyConfig::default()
            .with_overrides(|k| (k == "BOUNTY_MAX_DAYS_TO_FIX").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn test_validation_rejects_zero_window_and_negative_weight() {
        let mut config = BountyConfig::default();
        config.reward.max_days_to_fix = 0.0;
        assert!(config.validate().is_err());

        let mut config = BountyConfig::default();
        config.reward.severity_weights.high = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("high"));

        let mut config = BountyConfig::default();
        config.runtime.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
