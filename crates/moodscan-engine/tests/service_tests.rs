//! Path selection and single-text behaviour of the service

use moodscan_classifiers::{
    BackendError, BackendLoader, DetectionSignal, EnvironmentDetector, EnvironmentProfile,
    LoadedBackends, ModelBackedClassifier, ModelHandle, ScaleScores, SentimentScorer,
};
use moodscan_core::{Error, ResultError, ResultSource, SentimentLabel, ValidationError};
use moodscan_engine::{ClassifierMode, EngineConfig, SentimentService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct StarScorer([f32; 5]);

impl SentimentScorer for StarScorer {
    fn score(&self, _text: &str) -> Result<ScaleScores, BackendError> {
        ScaleScores::new((1..=5).map(|i| format!("{i} stars")).collect(), self.0.to_vec())
    }

    fn name(&self) -> &str {
        "stars"
    }
}

/// Loader yielding a fixed scorer, or failing when none is given
struct StubLoader {
    probabilities: Option<[f32; 5]>,
    loads: Arc<AtomicUsize>,
}

impl StubLoader {
    fn new(probabilities: Option<[f32; 5]>) -> Self {
        Self {
            probabilities,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BackendLoader for StubLoader {
    fn load(&self) -> Result<LoadedBackends, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.probabilities {
            Some(probabilities) => Ok(LoadedBackends {
                scorer: Box::new(StarScorer(probabilities)),
                keywords: None,
            }),
            None => Err(BackendError::load_failure("weights missing")),
        }
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

/// Always answers five stars; the counter tracks loader calls
fn counted_five_star_model() -> (ModelBackedClassifier, Arc<AtomicUsize>) {
    let loader = StubLoader::new(Some([0.0, 0.0, 0.0, 0.0, 1.0]));
    let loads = Arc::clone(&loader.loads);
    let model = ModelBackedClassifier::new(ModelHandle::new(Arc::new(loader)), 5).unwrap();
    (model, loads)
}

fn five_star_model() -> ModelBackedClassifier {
    counted_five_star_model().0
}

fn broken_model() -> ModelBackedClassifier {
    ModelBackedClassifier::new(ModelHandle::new(Arc::new(StubLoader::new(None))), 5).unwrap()
}

fn unconstrained() -> EnvironmentDetector {
    EnvironmentDetector::fixed(EnvironmentProfile::unconstrained())
}

fn constrained() -> EnvironmentDetector {
    EnvironmentDetector::fixed(EnvironmentProfile::constrained(vec![
        DetectionSignal::PlatformVariable,
    ]))
}

fn config_with_mode(mode: ClassifierMode) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.environment.mode = mode;
    config
}

#[tokio::test]
async fn test_auto_mode_uses_model_on_unconstrained_host() {
    let service =
        SentimentService::with_parts(EngineConfig::default(), unconstrained(), Some(five_star_model()))
            .unwrap();

    assert_eq!(service.active_path(), ResultSource::ModelBacked);

    // A sentence the lexicon scores as neutral; the model says five stars
    let result = service.analyze("The table is brown").await;
    assert_eq!(result.source(), ResultSource::ModelBacked);
    assert_eq!(result.label(), Some(SentimentLabel::VeryPositive));
}

#[tokio::test]
async fn test_auto_mode_uses_rules_on_constrained_host() {
    let service =
        SentimentService::with_parts(EngineConfig::default(), constrained(), Some(five_star_model()))
            .unwrap();

    assert_eq!(service.active_path(), ResultSource::RuleBased);
    assert!(service.profile().is_constrained);

    let result = service.analyze("The table is brown").await;
    assert_eq!(result.source(), ResultSource::RuleBased);
    assert_eq!(result.label(), Some(SentimentLabel::Neutral));
    assert!(!result.is_degraded());
}

#[tokio::test]
async fn test_explicit_modes_override_detection() {
    let forced_rules = SentimentService::with_parts(
        config_with_mode(ClassifierMode::RuleBased),
        unconstrained(),
        Some(five_star_model()),
    )
    .unwrap();
    assert_eq!(forced_rules.active_path(), ResultSource::RuleBased);

    let forced_model = SentimentService::with_parts(
        config_with_mode(ClassifierMode::Model),
        constrained(),
        Some(five_star_model()),
    )
    .unwrap();
    assert_eq!(forced_model.active_path(), ResultSource::ModelBacked);
}

#[test]
fn test_model_mode_without_model_is_config_error() {
    let err = SentimentService::with_parts(config_with_mode(ClassifierMode::Model), unconstrained(), None)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_no_model_means_rule_based() {
    let service = SentimentService::with_parts(EngineConfig::default(), unconstrained(), None).unwrap();
    assert_eq!(service.active_path(), ResultSource::RuleBased);
    assert!(service.warm_up().await.is_ok());
}

#[tokio::test]
async fn test_unavailable_model_falls_back_for_single_text() {
    let service =
        SentimentService::with_parts(EngineConfig::default(), unconstrained(), Some(broken_model()))
            .unwrap();

    assert!(matches!(
        service.warm_up().await,
        Err(Error::ClassifierUnavailable(_))
    ));

    let result = service.analyze("Wonderful dessert menu").await;
    assert!(!result.is_error());
    assert_eq!(result.source(), ResultSource::RuleBased);
    assert!(result.is_degraded());
}

#[tokio::test]
async fn test_unavailable_model_degrades_batch_from_start() {
    let service =
        SentimentService::with_parts(EngineConfig::default(), unconstrained(), Some(broken_model()))
            .unwrap();

    let inputs: Vec<String> = (0..5).map(|i| format!("dish number {i}")).collect();
    let job = service.run_batch(inputs, None).await.unwrap();

    assert_eq!(job.degraded_from(), Some(0));
    assert!(job
        .results()
        .iter()
        .all(|r| r.source() == ResultSource::RuleBased && r.is_degraded()));
}

#[tokio::test]
async fn test_rejected_single_text() {
    let service = SentimentService::with_parts(EngineConfig::default(), constrained(), None).unwrap();
    let result = service.analyze("  ").await;

    assert_eq!(result.text(), "  ");
    assert_eq!(
        result.error(),
        Some(&ResultError::Rejected(ValidationError::TooShort))
    );
}

#[tokio::test]
async fn test_large_batches_use_rules_above_threshold() {
    let mut config = EngineConfig::default();
    config.environment.fallback_batch_threshold = Some(3);
    let service = SentimentService::with_parts(config, unconstrained(), Some(five_star_model())).unwrap();

    assert_eq!(service.path_for_batch(3), ResultSource::ModelBacked);
    assert_eq!(service.path_for_batch(4), ResultSource::RuleBased);

    let inputs: Vec<String> = (0..4).map(|i| format!("plate number {i}")).collect();
    let job = service.run_batch(inputs, None).await.unwrap();
    assert!(job
        .results()
        .iter()
        .all(|r| r.source() == ResultSource::RuleBased && !r.is_degraded()));
}

#[tokio::test]
async fn test_warm_up_skips_model_for_rule_routed_batches() {
    let mut config = EngineConfig::default();
    config.environment.fallback_batch_threshold = Some(3);
    let (model, loads) = counted_five_star_model();
    let service = SentimentService::with_parts(config, unconstrained(), Some(model)).unwrap();

    service.warm_up_for(service.path_for_batch(4)).await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    let job = service
        .run_batch((0..4).map(|i| format!("table {i} was fine")).collect(), None)
        .await
        .unwrap();
    assert_eq!(job.results().len(), 4);
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    service.warm_up_for(service.path_for_batch(2)).await.unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_compare_bounds_and_extremes() {
    let service = SentimentService::with_parts(EngineConfig::default(), constrained(), None).unwrap();

    let one = vec!["Lovely".to_string()];
    assert!(matches!(
        service.compare(&one).await,
        Err(Error::InvalidComparison(_))
    ));

    let six: Vec<String> = (0..6).map(|i| format!("text {i}")).collect();
    assert!(service.compare(&six).await.is_err());

    let texts = vec![
        "Absolutely amazing food, wonderful staff!".to_string(),
        "The table is brown".to_string(),
        "Terrible, awful and disgusting".to_string(),
    ];
    let comparison = service.compare(&texts).await.unwrap();

    assert_eq!(comparison.results.len(), 3);
    assert_eq!(comparison.most_positive, Some(0));
    assert_eq!(comparison.most_negative, Some(2));
    assert!(comparison.confidence_range.unwrap() > 0.5);
}
