//! Core result types for moodscan

use crate::error::ValidationError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// One of the five ordered sentiment classes.
///
/// The derived ordering is the sentiment ordering:
/// `VeryNegative < Negative < Neutral < Positive < VeryPositive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    /// All labels in ascending order
    pub const ALL: [SentimentLabel; 5] = [
        Self::VeryNegative,
        Self::Negative,
        Self::Neutral,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Zero-based position on the scale
    pub fn index(&self) -> usize {
        match self {
            Self::VeryNegative => 0,
            Self::Negative => 1,
            Self::Neutral => 2,
            Self::Positive => 3,
            Self::VeryPositive => 4,
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::VeryNegative => "Very Negative",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Positive => "Positive",
            Self::VeryPositive => "Very Positive",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Self::VeryNegative | Self::Negative)
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive | Self::VeryPositive)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which classifier path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultSource {
    /// External pretrained transformer classifier
    ModelBacked,
    /// Lexicon/heuristic fallback
    RuleBased,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelBacked => "model_backed",
            Self::RuleBased => "rule_based",
        }
    }
}

/// Qualitative band for a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reliability {
    Low,
    Moderate,
    Good,
    VeryHigh,
}

impl Reliability {
    pub const VERY_HIGH_THRESHOLD: f32 = 0.75;
    pub const GOOD_THRESHOLD: f32 = 0.55;
    pub const MODERATE_THRESHOLD: f32 = 0.40;

    /// Band a confidence value. Informational only; the confidence itself is
    /// reported unchanged.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= Self::VERY_HIGH_THRESHOLD {
            Self::VeryHigh
        } else if confidence >= Self::GOOD_THRESHOLD {
            Self::Good
        } else if confidence >= Self::MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Why a text has no classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    /// Rejected by the validator
    Rejected(ValidationError),
    /// The classifier path could not serve this text
    ClassifierUnavailable(String),
    /// Inference failed for this text only
    Inference(String),
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::ClassifierUnavailable(msg) => write!(f, "classifier unavailable: {msg}"),
            Self::Inference(msg) => write!(f, "inference failed: {msg}"),
        }
    }
}

impl Serialize for ResultError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A valid classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: SentimentLabel,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Salient keywords, most relevant first
    pub keywords: Vec<String>,
}

/// Either a classification or the reason there is none
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Classified(Classification),
    Failed(ResultError),
}

/// Result for a single submitted text.
///
/// Exactly one of classification or error holds. The original text is kept
/// unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    text: String,
    source: ResultSource,
    degraded: bool,
    outcome: Outcome,
    latency_us: u64,
}

impl SentimentResult {
    /// Create a classified result
    pub fn classified(
        text: impl Into<String>,
        source: ResultSource,
        classification: Classification,
    ) -> Self {
        Self {
            text: text.into(),
            source,
            degraded: false,
            outcome: Outcome::Classified(classification),
            latency_us: 0,
        }
    }

    /// Create a failed result
    pub fn failed(text: impl Into<String>, source: ResultSource, error: ResultError) -> Self {
        Self {
            text: text.into(),
            source,
            degraded: false,
            outcome: Outcome::Failed(error),
            latency_us: 0,
        }
    }

    /// Create a result for a text the validator rejected
    pub fn rejected(text: impl Into<String>, source: ResultSource, reason: ValidationError) -> Self {
        Self::failed(text, source, ResultError::Rejected(reason))
    }

    /// Mark as produced by the fallback path after the model path failed mid-batch
    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub fn with_latency(mut self, latency_us: u64) -> Self {
        self.latency_us = latency_us;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> ResultSource {
        self.source
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn classification(&self) -> Option<&Classification> {
        match &self.outcome {
            Outcome::Classified(c) => Some(c),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ResultError> {
        match &self.outcome {
            Outcome::Classified(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    pub fn label(&self) -> Option<SentimentLabel> {
        self.classification().map(|c| c.label)
    }

    pub fn confidence(&self) -> Option<f32> {
        self.classification().map(|c| c.confidence)
    }

    /// Keywords; empty for failed results
    pub fn keywords(&self) -> &[String] {
        self.classification()
            .map(|c| c.keywords.as_slice())
            .unwrap_or(&[])
    }

    pub fn reliability(&self) -> Option<Reliability> {
        self.confidence().map(Reliability::from_confidence)
    }

    /// Classification latency in microseconds
    pub fn latency_us(&self) -> u64 {
        self.latency_us
    }
}

/// Flat wire form of a result
#[derive(Serialize)]
struct ResultRecord<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<SentimentLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    keywords: &'a [String],
    source: ResultSource,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reliability: Option<Reliability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ResultError>,
}

impl Serialize for SentimentResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ResultRecord {
            text: &self.text,
            label: self.label(),
            confidence: self.confidence(),
            keywords: self.keywords(),
            source: self.source,
            degraded: self.degraded,
            reliability: self.reliability(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}
