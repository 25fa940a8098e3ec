//! Engine configuration

use moodscan_classifiers::{KeywordModelConfig, RuleBasedConfig, SentimentModelConfig};
use moodscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// Top-level configuration, usually read from `moodscan.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Sentiment model used on the model-backed path
    #[serde(default)]
    pub model: SentimentModelConfig,

    /// Embedding model for keywords; `null` uses simplified keywords
    #[serde(default = "default_keywords")]
    pub keywords: Option<KeywordModelConfig>,

    #[serde(default)]
    pub rule_based: RuleBasedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            environment: EnvironmentConfig::default(),
            model: SentimentModelConfig::default(),
            keywords: default_keywords(),
            rule_based: RuleBasedConfig::default(),
        }
    }
}

fn default_keywords() -> Option<KeywordModelConfig> {
    Some(KeywordModelConfig::default())
}

/// Batch processing limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Texts classified between progress signals
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Larger batches are rejected wholesale
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Buffer size of the progress channel
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_batch_size: default_max_batch_size(),
            progress_capacity: default_progress_capacity(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_progress_capacity() -> usize {
    64
}

/// Which classifier path is the default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Decide from the detected environment
    #[default]
    Auto,
    /// Always prefer the model-backed path
    Model,
    /// Always use the rule-based path
    RuleBased,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub mode: ClassifierMode,

    /// Batches with more texts than this use the rule-based path even on an
    /// unconstrained host
    #[serde(default)]
    pub fallback_batch_threshold: Option<usize>,
}

impl EngineConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load from file, or use defaults when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.chunk_size == 0 {
            return Err(Error::InvalidChunkSize(0));
        }
        if self.batch.max_batch_size == 0 {
            return Err(Error::config("batch.max_batch_size must be at least 1"));
        }
        if self.batch.progress_capacity == 0 {
            return Err(Error::config("batch.progress_capacity must be at least 1"));
        }
        if self.model.max_length == 0 {
            return Err(Error::config("model.max_length must be at least 1"));
        }
        Ok(())
    }
}
