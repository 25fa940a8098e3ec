//! Collaborators behind the model-backed classifier
//!
//! Scoring and keyword extraction are delegated to external models. They are
//! reached only through these traits so the classifier can be exercised with
//! scripted backends.

use std::fmt;

/// Category of a collaborator failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    OutOfMemory,
    LoadFailure,
    Timeout,
    /// Failure confined to a single input
    Inference,
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "out of memory",
            Self::LoadFailure => "load failure",
            Self::Timeout => "timeout",
            Self::Inference => "inference",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a model collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::OutOfMemory, message)
    }

    pub fn load_failure(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::LoadFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Inference, message)
    }

    /// Whether the failure makes the model path unusable for the rest of the
    /// process, as opposed to affecting one text
    pub fn is_systemic(&self) -> bool {
        !matches!(self.kind, BackendErrorKind::Inference)
    }
}

impl From<BackendError> for moodscan_core::Error {
    fn from(err: BackendError) -> Self {
        if err.is_systemic() {
            moodscan_core::Error::unavailable(err.to_string())
        } else {
            moodscan_core::Error::classifier(err.to_string())
        }
    }
}

/// Class probabilities over an ordered label scale, most negative first
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleScores {
    labels: Vec<String>,
    probabilities: Vec<f32>,
}

impl ScaleScores {
    pub fn new(
        labels: Vec<String>,
        probabilities: Vec<f32>,
    ) -> std::result::Result<Self, BackendError> {
        if probabilities.is_empty() {
            return Err(BackendError::inference("model returned no class scores"));
        }
        if labels.len() != probabilities.len() {
            return Err(BackendError::inference(format!(
                "model returned {} scores for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        Ok(Self {
            labels,
            probabilities,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Expected position on the scale, normalized to [0, 1].
    ///
    /// Works the same for 5-star, 3-class and binary heads. A single-class
    /// head is read as the probability of its one label.
    pub fn positivity(&self) -> f32 {
        let n = self.probabilities.len();
        if n == 1 {
            return self.probabilities[0].clamp(0.0, 1.0);
        }

        let total: f32 = self.probabilities.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return 0.5;
        }

        let step = 1.0 / (n - 1) as f32;
        let expected: f32 = self
            .probabilities
            .iter()
            .enumerate()
            .map(|(idx, p)| p * idx as f32 * step)
            .sum();

        (expected / total).clamp(0.0, 1.0)
    }
}

/// Pretrained sentiment model
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> std::result::Result<ScaleScores, BackendError>;

    fn name(&self) -> &str;
}

/// Embedding-based keyword extractor
pub trait KeywordExtractor: Send + Sync {
    /// Up to `top_n` keyphrases, most relevant first
    fn extract(&self, text: &str, top_n: usize) -> std::result::Result<Vec<String>, BackendError>;
}

/// Collaborators produced by a single load
pub struct LoadedBackends {
    pub scorer: Box<dyn SentimentScorer>,

    /// `None` when no embedding model is available; keywords are then
    /// simplified
    pub keywords: Option<Box<dyn KeywordExtractor>>,
}

impl fmt::Debug for LoadedBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedBackends")
            .field("scorer", &self.scorer.name())
            .field("keywords", &self.keywords.is_some())
            .finish()
    }
}

/// Creates the collaborators. Called at most once per model handle, on a
/// blocking thread.
pub trait BackendLoader: Send + Sync + 'static {
    fn load(&self) -> std::result::Result<LoadedBackends, BackendError>;

    /// Short description used in logs
    fn describe(&self) -> String;
}
