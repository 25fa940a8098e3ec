//! Mock model backends for testing
//!
//! Scripted scorers and keyword extractors that exercise the model-backed
//! classifier's failure handling without real weights.

use moodscan_classifiers::{
    BackendError, BackendLoader, Classifier, KeywordExtractor, LoadedBackends, ModelBackedClassifier,
    ModelHandle, RuleBasedClassifier, ScaleScores, SentimentScorer,
};
use moodscan_core::{ResultError, ResultSource, SentimentLabel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Route classifier logs to the test harness so failures show them
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("moodscan_classifiers=debug")
        .with_test_writer()
        .try_init();
}

/// Scorer returning fixed probabilities; fails systemically after a number
/// of calls when configured to
pub struct MockScorer {
    labels: Vec<String>,
    probabilities: Vec<f32>,
    fail_after: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl MockScorer {
    pub fn stars(probabilities: [f32; 5]) -> Self {
        Self {
            labels: (1..=5).map(|i| format!("{i} stars")).collect(),
            probabilities: probabilities.to_vec(),
            fail_after: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_head(labels: &[&str], probabilities: &[f32]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            probabilities: probabilities.to_vec(),
            fail_after: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SentimentScorer for MockScorer {
    fn score(&self, _text: &str) -> Result<ScaleScores, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(BackendError::out_of_memory("mock allocation failure"));
        }
        ScaleScores::new(self.labels.clone(), self.probabilities.clone())
    }

    fn name(&self) -> &str {
        "mock-scorer"
    }
}

/// Keyword extractor that always fails with the given error
pub struct FailingExtractor {
    error: BackendError,
}

impl KeywordExtractor for FailingExtractor {
    fn extract(&self, _text: &str, _top_n: usize) -> Result<Vec<String>, BackendError> {
        Err(self.error.clone())
    }
}

/// Extractor returning the text's words in reverse order
pub struct ReversingExtractor;

impl KeywordExtractor for ReversingExtractor {
    fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, BackendError> {
        Ok(text
            .split_whitespace()
            .rev()
            .take(top_n)
            .map(str::to_string)
            .collect())
    }
}

/// Loader handing out a prepared set of backends once
pub struct MockLoader {
    backends: std::sync::Mutex<Option<LoadedBackends>>,
    loads: Arc<AtomicUsize>,
}

impl MockLoader {
    pub fn new(scorer: MockScorer, keywords: Option<Box<dyn KeywordExtractor>>) -> Self {
        Self {
            backends: std::sync::Mutex::new(Some(LoadedBackends {
                scorer: Box::new(scorer),
                keywords,
            })),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BackendLoader for MockLoader {
    fn load(&self) -> Result<LoadedBackends, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.backends
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| BackendError::load_failure("mock backends already taken"))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

fn model_backed(scorer: MockScorer, keywords: Option<Box<dyn KeywordExtractor>>) -> ModelBackedClassifier {
    let handle = ModelHandle::new(Arc::new(MockLoader::new(scorer, keywords)));
    ModelBackedClassifier::new(handle, 5).unwrap()
}

fn texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("review number {i}")).collect()
}

#[tokio::test]
async fn test_five_star_head() {
    let classifier = model_backed(MockScorer::stars([0.0, 0.0, 0.0, 0.2, 0.8]), None);
    let result = classifier.classify("Best pizza in town").await;

    assert_eq!(result.source(), ResultSource::ModelBacked);
    assert_eq!(result.label(), Some(SentimentLabel::VeryPositive));
    assert!((result.confidence().unwrap() - 0.95).abs() < 1e-5);
}

#[tokio::test]
async fn test_three_class_head() {
    let scorer = MockScorer::with_head(&["negative", "neutral", "positive"], &[0.1, 0.8, 0.1]);
    let result = model_backed(scorer, None).classify("It was a meal").await;

    assert_eq!(result.label(), Some(SentimentLabel::Neutral));
    assert!((result.confidence().unwrap() - 0.5).abs() < 1e-5);
}

#[tokio::test]
async fn test_binary_head() {
    let scorer = MockScorer::with_head(&["NEGATIVE", "POSITIVE"], &[0.7, 0.3]);
    let result = model_backed(scorer, None).classify("Not my favourite").await;

    assert_eq!(result.label(), Some(SentimentLabel::Negative));
    assert!((result.confidence().unwrap() - 0.3).abs() < 1e-5);
}

#[tokio::test]
async fn test_paths_agree_on_label_mapping() {
    // Both paths land on the same positivity value, so the same label
    let model = model_backed(MockScorer::stars([0.0, 0.0, 1.0, 0.0, 0.0]), None);
    let rules = RuleBasedClassifier::new().unwrap();

    let a = model.classify("The table is brown").await;
    let b = rules.classify("The table is brown").await;

    assert_eq!(a.label(), b.label());
    assert_eq!(a.confidence(), b.confidence());
}

#[tokio::test]
async fn test_embedding_keywords_used_when_loaded() {
    let classifier = model_backed(
        MockScorer::stars([0.0, 0.0, 1.0, 0.0, 0.0]),
        Some(Box::new(ReversingExtractor)),
    );
    let result = classifier.classify("crust sauce cheese").await;
    assert_eq!(result.keywords(), ["cheese", "sauce", "crust"]);
}

#[tokio::test]
async fn test_keyword_inference_failure_gives_empty_keywords() {
    init_test_logging();
    let classifier = model_backed(
        MockScorer::stars([0.0, 0.0, 0.0, 0.0, 1.0]),
        Some(Box::new(FailingExtractor {
            error: BackendError::inference("no candidates"),
        })),
    );
    let result = classifier.classify("Amazing crust").await;

    assert!(!result.is_error());
    assert!(result.keywords().is_empty());
}

#[tokio::test]
async fn test_keyword_systemic_failure_interrupts_chunk() {
    init_test_logging();
    let classifier = model_backed(
        MockScorer::stars([0.0, 0.0, 0.0, 0.0, 1.0]),
        Some(Box::new(FailingExtractor {
            error: BackendError::timeout("embedding model stalled"),
        })),
    );
    let output = classifier.classify_chunk(&texts(3)).await;

    assert!(output.results.is_empty());
    assert!(output.failure.is_some());
}

#[tokio::test]
async fn test_chunk_keeps_results_before_failure() {
    init_test_logging();
    let scorer = MockScorer::stars([0.0, 0.0, 0.0, 1.0, 0.0]).fail_after(3);
    let calls = scorer.calls();
    let classifier = model_backed(scorer, None);

    let output = classifier.classify_chunk(&texts(5)).await;

    assert_eq!(output.results.len(), 3);
    for (idx, result) in output.results.iter().enumerate() {
        assert_eq!(result.text(), format!("review number {idx}"));
        assert_eq!(result.label(), Some(SentimentLabel::Positive));
    }
    assert!(matches!(
        output.failure,
        Some(moodscan_core::Error::ClassifierUnavailable(_))
    ));
    // Stopped at the first failure
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_single_text_systemic_failure_is_result_error() {
    init_test_logging();
    let scorer = MockScorer::stars([0.0, 0.0, 0.0, 1.0, 0.0]).fail_after(0);
    let result = model_backed(scorer, None).classify("Great pasta").await;

    assert_eq!(result.text(), "Great pasta");
    assert!(matches!(
        result.error(),
        Some(ResultError::ClassifierUnavailable(_))
    ));
}

#[tokio::test]
async fn test_model_loaded_once_across_calls() {
    init_test_logging();
    let loader = Arc::new(MockLoader::new(MockScorer::stars([0.2; 5]), None));
    let loads = Arc::clone(&loader.loads);
    let classifier = ModelBackedClassifier::new(ModelHandle::new(loader), 5).unwrap();

    for text in texts(4) {
        assert!(!classifier.classify(&text).await.is_error());
    }
    classifier.warm_up().await.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_model_backed_is_deterministic() {
    let classifier = model_backed(MockScorer::stars([0.1, 0.1, 0.2, 0.3, 0.3]), None);
    let a = classifier.classify("Friendly staff, slow kitchen").await;
    let b = classifier.classify("Friendly staff, slow kitchen").await;

    assert_eq!(a.label(), b.label());
    assert_eq!(a.confidence(), b.confidence());
    assert_eq!(a.keywords(), b.keywords());
}
