//! Classifier trait and common types

use async_trait::async_trait;
use moodscan_core::{Error, ResultSource, SentimentResult};

/// Capability shared by every classifier path.
///
/// Inputs are expected to have passed validation already. `classify` never
/// fails: problems with an individual text are recorded on the returned
/// result.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single text
    async fn classify(&self, text: &str) -> SentimentResult;

    /// Classify a chunk of texts in order.
    ///
    /// Implementations that can become unavailable mid-run stop at the first
    /// systemic failure and return the results computed so far together with
    /// the failure.
    async fn classify_chunk(&self, texts: &[String]) -> ChunkOutput {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await);
        }
        ChunkOutput::complete(results)
    }

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Which path this classifier represents
    fn source(&self) -> ResultSource;
}

/// Output of [`Classifier::classify_chunk`].
///
/// `results` covers a prefix of the submitted texts; it covers all of them
/// when `failure` is `None`.
#[derive(Debug)]
pub struct ChunkOutput {
    pub results: Vec<SentimentResult>,
    pub failure: Option<Error>,
}

impl ChunkOutput {
    /// A chunk where every text got a result
    pub fn complete(results: Vec<SentimentResult>) -> Self {
        Self {
            results,
            failure: None,
        }
    }

    /// A chunk interrupted by a systemic failure
    pub fn interrupted(results: Vec<SentimentResult>, failure: Error) -> Self {
        Self {
            results,
            failure: Some(failure),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}
