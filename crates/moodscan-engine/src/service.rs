//! Long-lived service context
//!
//! Owns the configuration, the environment profile and both classifier
//! paths. The model handle inside the model-backed classifier is the only
//! state shared between requests, and it is read-only once loaded.

use crate::compare::{check_comparison_size, compare_results, Comparison};
use crate::config::{ClassifierMode, EngineConfig};
use crate::orchestrator::{BatchJob, BatchOrchestrator};
use crate::progress::Progress;
use moodscan_classifiers::{
    Classifier, EnvironmentDetector, EnvironmentProfile, ModelBackedClassifier, RuleBasedClassifier,
};
use moodscan_core::{validate, Error, Result, ResultError, ResultSource, SentimentResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct SentimentService {
    config: EngineConfig,
    detector: EnvironmentDetector,
    rule_based: Arc<RuleBasedClassifier>,
    model_backed: Option<Arc<ModelBackedClassifier>>,
}

impl SentimentService {
    /// Build from configuration with the system environment detector.
    ///
    /// The model is not loaded here; see [`SentimentService::warm_up`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        let model_backed = default_model_backed(&config)?;
        Self::with_parts(config, EnvironmentDetector::system(), model_backed)
    }

    /// Build from explicit parts
    pub fn with_parts(
        config: EngineConfig,
        detector: EnvironmentDetector,
        model_backed: Option<ModelBackedClassifier>,
    ) -> Result<Self> {
        config.validate()?;

        if config.environment.mode == ClassifierMode::Model && model_backed.is_none() {
            return Err(Error::config(
                "environment.mode is `model` but no model-backed classifier is available",
            ));
        }

        let rule_based = Arc::new(RuleBasedClassifier::with_config(config.rule_based.clone())?);

        Ok(Self {
            config,
            detector,
            rule_based,
            model_backed: model_backed.map(Arc::new),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Environment profile, detected on first use
    pub fn profile(&self) -> &EnvironmentProfile {
        self.detector.detect()
    }

    pub fn has_model(&self) -> bool {
        self.model_backed.is_some()
    }

    /// Default path for single texts and ordinary batches
    pub fn active_path(&self) -> ResultSource {
        match (self.config.environment.mode, &self.model_backed) {
            (ClassifierMode::RuleBased, _) | (_, None) => ResultSource::RuleBased,
            (ClassifierMode::Model, Some(_)) => ResultSource::ModelBacked,
            (ClassifierMode::Auto, Some(_)) => {
                if self.profile().is_constrained {
                    ResultSource::RuleBased
                } else {
                    ResultSource::ModelBacked
                }
            }
        }
    }

    /// Path for a batch of `size` texts.
    ///
    /// In auto mode batches above the configured threshold use the
    /// rule-based path.
    pub fn path_for_batch(&self, size: usize) -> ResultSource {
        let path = self.active_path();
        let over_threshold = self
            .config
            .environment
            .fallback_batch_threshold
            .is_some_and(|threshold| size > threshold);

        if path == ResultSource::ModelBacked
            && self.config.environment.mode == ClassifierMode::Auto
            && over_threshold
        {
            info!("Batch of {} texts exceeds the fallback threshold, using rule-based path", size);
            ResultSource::RuleBased
        } else {
            path
        }
    }

    fn classifier_for(&self, path: ResultSource) -> Arc<dyn Classifier> {
        match (path, &self.model_backed) {
            (ResultSource::ModelBacked, Some(model)) => Arc::clone(model) as Arc<dyn Classifier>,
            _ => Arc::clone(&self.rule_based) as Arc<dyn Classifier>,
        }
    }

    /// Load the model now when the model path is active
    pub async fn warm_up(&self) -> Result<()> {
        self.warm_up_for(self.active_path()).await
    }

    /// Load the model only if `path` will use it
    pub async fn warm_up_for(&self, path: ResultSource) -> Result<()> {
        match (&self.model_backed, path) {
            (Some(model), ResultSource::ModelBacked) => model.warm_up().await,
            _ => Ok(()),
        }
    }

    /// Orchestrator on the default path
    pub fn orchestrator(&self) -> BatchOrchestrator {
        self.orchestrator_on(self.active_path())
    }

    fn orchestrator_on(&self, path: ResultSource) -> BatchOrchestrator {
        BatchOrchestrator::from_config(
            self.classifier_for(path),
            Arc::clone(&self.rule_based) as Arc<dyn Classifier>,
            &self.config.batch,
        )
    }

    /// Validate and classify one text on the default path.
    ///
    /// An unavailable model falls back to the rule-based classifier and the
    /// result is marked degraded.
    pub async fn analyze(&self, text: &str) -> SentimentResult {
        let path = self.active_path();
        if let Err(reason) = validate(text) {
            return SentimentResult::rejected(text, path, reason);
        }

        let result = self.classifier_for(path).classify(text).await;

        match result.error() {
            Some(ResultError::ClassifierUnavailable(reason)) if path == ResultSource::ModelBacked => {
                warn!("Model-backed classifier unavailable, using rule-based: {}", reason);
                self.rule_based.classify(text).await.into_degraded()
            }
            _ => result,
        }
    }

    /// Run a whole batch on the path chosen for its size
    pub async fn run_batch(
        &self,
        inputs: Vec<String>,
        progress: Option<&mpsc::Sender<Progress>>,
    ) -> Result<BatchJob> {
        self.orchestrator_on(self.path_for_batch(inputs.len()))
            .run(inputs, progress)
            .await
    }

    /// Classify 2 to 5 texts side by side
    pub async fn compare(&self, texts: &[String]) -> Result<Comparison> {
        check_comparison_size(texts.len())?;

        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.analyze(text).await);
        }
        Ok(compare_results(results))
    }
}

impl std::fmt::Debug for SentimentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentService")
            .field("mode", &self.config.environment.mode)
            .field("detector", &self.detector)
            .field("model_backed", &self.model_backed.as_ref().map(|m| m.handle().describe()))
            .finish()
    }
}

#[cfg(feature = "ml-models")]
fn default_model_backed(config: &EngineConfig) -> Result<Option<ModelBackedClassifier>> {
    use moodscan_classifiers::{CandleLoader, ModelHandle};

    let loader = CandleLoader::new(config.model.clone(), config.keywords.clone());
    let top_n = config
        .keywords
        .as_ref()
        .map_or(config.rule_based.top_n, |keywords| keywords.top_n);

    Ok(Some(ModelBackedClassifier::new(
        ModelHandle::new(Arc::new(loader)),
        top_n,
    )?))
}

#[cfg(not(feature = "ml-models"))]
fn default_model_backed(_config: &EngineConfig) -> Result<Option<ModelBackedClassifier>> {
    Ok(None)
}
