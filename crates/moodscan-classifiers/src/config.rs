//! Configuration for classifiers and model loading

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where to load a model from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Directory containing `config.json`, `tokenizer.json` and
    /// `model.safetensors`
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl ModelSource {
    pub fn huggingface(repo: impl Into<String>) -> Self {
        Self::HuggingFace {
            repo: repo.into(),
            revision: default_revision(),
        }
    }

    /// Short identifier used in logs
    pub fn describe(&self) -> String {
        match self {
            Self::Local { path } => path.display().to_string(),
            Self::HuggingFace { repo, revision } => format!("{repo}@{revision}"),
        }
    }
}

fn default_revision() -> String {
    "main".to_string()
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

/// Sentiment scoring model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentModelConfig {
    #[serde(default = "default_sentiment_source")]
    pub source: ModelSource,

    #[serde(default)]
    pub device: DeviceSpec,

    /// Maximum number of tokens fed to the model
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Output labels in ascending sentiment order. Read from the model's
    /// `id2label` when absent.
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

impl Default for SentimentModelConfig {
    fn default() -> Self {
        Self {
            source: default_sentiment_source(),
            device: DeviceSpec::default(),
            max_length: default_max_length(),
            labels: None,
        }
    }
}

fn default_sentiment_source() -> ModelSource {
    ModelSource::huggingface("nlptown/bert-base-multilingual-uncased-sentiment")
}

fn default_max_length() -> usize {
    512
}

/// Embedding model used for keyword extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordModelConfig {
    #[serde(default = "default_keyword_source")]
    pub source: ModelSource,

    /// Number of keywords reported per text
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Upper bound on candidate phrases embedded per text
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for KeywordModelConfig {
    fn default() -> Self {
        Self {
            source: default_keyword_source(),
            top_n: default_top_n(),
            max_candidates: default_max_candidates(),
            max_length: default_max_length(),
        }
    }
}

fn default_keyword_source() -> ModelSource {
    ModelSource::huggingface("sentence-transformers/all-MiniLM-L6-v2")
}

fn default_top_n() -> usize {
    5
}

fn default_max_candidates() -> usize {
    64
}

/// Lexicon classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBasedConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Number of tokens after a negator whose polarity is flipped
    #[serde(default = "default_negation_window")]
    pub negation_window: usize,
}

impl Default for RuleBasedConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            negation_window: default_negation_window(),
        }
    }
}

fn default_negation_window() -> usize {
    3
}
