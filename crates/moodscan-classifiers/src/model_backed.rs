//! Classifier backed by a pretrained transformer model

use crate::backend::{BackendError, KeywordExtractor, LoadedBackends};
use crate::classifier::{ChunkOutput, Classifier};
use crate::model_handle::ModelHandle;
use crate::rule_based::RuleBasedClassifier;
use async_trait::async_trait;
use moodscan_core::{
    map_to_five_class, Classification, Result, ResultError, ResultSource, SentimentResult,
};
use std::sync::Arc;
use std::time::Instant;

/// Upstream label passed to the mapper; model scores are already collapsed
/// onto the positivity axis
const POSITIVITY: &str = "positivity";

/// Delegates scoring and keyword extraction to the collaborators in a
/// [`ModelHandle`].
///
/// Systemic collaborator failures surface as `ClassifierUnavailable` results
/// from [`Classifier::classify`] and interrupt [`Classifier::classify_chunk`].
pub struct ModelBackedClassifier {
    name: String,
    handle: ModelHandle,
    top_n: usize,
    simplified_keywords: Arc<dyn KeywordExtractor>,
}

impl ModelBackedClassifier {
    pub fn new(handle: ModelHandle, top_n: usize) -> Result<Self> {
        Ok(Self {
            name: "model-backed".to_string(),
            handle,
            top_n,
            simplified_keywords: Arc::new(RuleBasedClassifier::new()?),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keyword extractor used when the handle has no embedding model
    pub fn with_simplified_keywords(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.simplified_keywords = extractor;
        self
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Make sure the model is loaded
    pub async fn warm_up(&self) -> Result<()> {
        self.handle.acquire().await?;
        Ok(())
    }

    /// Classify one text; `Err` only for systemic failures
    async fn try_classify(&self, text: &str) -> std::result::Result<SentimentResult, BackendError> {
        let backends = self.handle.acquire().await?;
        let start = Instant::now();

        let scores = match backends.scorer.score(text) {
            Ok(scores) => scores,
            Err(e) if e.is_systemic() => return Err(e),
            Err(e) => {
                tracing::debug!("Inference failed for one text: {}", e);
                return Ok(SentimentResult::failed(
                    text,
                    ResultSource::ModelBacked,
                    ResultError::Inference(e.message),
                )
                .with_latency(start.elapsed().as_micros() as u64));
            }
        };

        let (label, confidence) = map_to_five_class(POSITIVITY, scores.positivity());
        let keywords = self.extract_keywords(&backends, text)?;

        Ok(SentimentResult::classified(
            text,
            ResultSource::ModelBacked,
            Classification {
                label,
                confidence,
                keywords,
            },
        )
        .with_latency(start.elapsed().as_micros() as u64))
    }

    fn extract_keywords(
        &self,
        backends: &LoadedBackends,
        text: &str,
    ) -> std::result::Result<Vec<String>, BackendError> {
        let extractor: &dyn KeywordExtractor = match &backends.keywords {
            Some(extractor) => extractor.as_ref(),
            None => self.simplified_keywords.as_ref(),
        };

        match extractor.extract(text, self.top_n) {
            Ok(keywords) => Ok(keywords),
            Err(e) if e.is_systemic() => Err(e),
            Err(e) => {
                tracing::warn!("Keyword extraction failed, reporting none: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl Classifier for ModelBackedClassifier {
    async fn classify(&self, text: &str) -> SentimentResult {
        match self.try_classify(text).await {
            Ok(result) => result,
            Err(e) => SentimentResult::failed(
                text,
                ResultSource::ModelBacked,
                ResultError::ClassifierUnavailable(e.to_string()),
            ),
        }
    }

    async fn classify_chunk(&self, texts: &[String]) -> ChunkOutput {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            match self.try_classify(text).await {
                Ok(result) => results.push(result),
                Err(e) => return ChunkOutput::interrupted(results, e.into()),
            }
        }
        ChunkOutput::complete(results)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> ResultSource {
        ResultSource::ModelBacked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendLoader, ScaleScores, SentimentScorer};
    use moodscan_core::SentimentLabel;

    struct StarScorer;

    impl SentimentScorer for StarScorer {
        fn score(&self, text: &str) -> std::result::Result<ScaleScores, BackendError> {
            let labels = (1..=5).map(|i| format!("{i} stars")).collect();
            let probabilities = if text.contains("boom") {
                return Err(BackendError::out_of_memory("allocation failed"));
            } else if text.contains("glitch") {
                return Err(BackendError::inference("tokenizer rejected input"));
            } else if text.contains("love") {
                vec![0.0, 0.0, 0.0, 0.1, 0.9]
            } else {
                vec![0.0, 0.0, 1.0, 0.0, 0.0]
            };
            ScaleScores::new(labels, probabilities)
        }

        fn name(&self) -> &str {
            "stars"
        }
    }

    struct StarLoader {
        fail: bool,
    }

    impl BackendLoader for StarLoader {
        fn load(&self) -> std::result::Result<LoadedBackends, BackendError> {
            if self.fail {
                return Err(BackendError::load_failure("no weights"));
            }
            Ok(LoadedBackends {
                scorer: Box::new(StarScorer),
                keywords: None,
            })
        }

        fn describe(&self) -> String {
            "stars".to_string()
        }
    }

    fn classifier(fail: bool) -> ModelBackedClassifier {
        let handle = ModelHandle::new(Arc::new(StarLoader { fail }));
        ModelBackedClassifier::new(handle, 5).unwrap()
    }

    #[tokio::test]
    async fn test_classify_maps_expected_star() {
        let result = classifier(false).classify("I love this pizza").await;

        assert_eq!(result.source(), ResultSource::ModelBacked);
        assert_eq!(result.label(), Some(SentimentLabel::VeryPositive));
        assert!((result.confidence().unwrap() - 0.975).abs() < 1e-5);
        // Simplified keywords when no embedding model is loaded
        assert_eq!(result.keywords()[0], "love");
    }

    #[tokio::test]
    async fn test_per_text_inference_error() {
        let result = classifier(false).classify("a glitch in the text").await;
        assert_eq!(
            result.error(),
            Some(&ResultError::Inference("tokenizer rejected input".to_string()))
        );
    }

    #[tokio::test]
    async fn test_load_failure_becomes_result_error() {
        let result = classifier(true).classify("anything at all").await;
        assert!(matches!(
            result.error(),
            Some(ResultError::ClassifierUnavailable(_))
        ));
        assert_eq!(result.text(), "anything at all");
    }

    #[tokio::test]
    async fn test_chunk_stops_at_systemic_failure() {
        let texts: Vec<String> = ["fine day", "a glitch here", "boom goes memory", "never reached"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let output = classifier(false).classify_chunk(&texts).await;

        assert!(!output.is_complete());
        assert_eq!(output.results.len(), 2);
        assert!(output.results[1].is_error());
        assert!(matches!(
            output.failure,
            Some(moodscan_core::Error::ClassifierUnavailable(_))
        ));
    }
}
