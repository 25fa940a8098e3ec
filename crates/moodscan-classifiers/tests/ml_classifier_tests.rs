//! ML Classifier Integration Tests
//!
//! Tests for the model-backed classifier using real models from HuggingFace.
//! These tests require the `ml-models` feature flag and network access, so
//! they are ignored by default. Run with `cargo test -- --ignored`.

#![cfg(feature = "ml-models")]

use moodscan_classifiers::{
    CandleLoader, Classifier, KeywordModelConfig, ModelBackedClassifier, ModelHandle,
    SentimentModelConfig,
};
use moodscan_core::ResultSource;
use std::sync::Arc;

fn classifier(with_keywords: bool) -> ModelBackedClassifier {
    let keywords = with_keywords.then(KeywordModelConfig::default);
    let loader = CandleLoader::new(SentimentModelConfig::default(), keywords);
    ModelBackedClassifier::new(ModelHandle::new(Arc::new(loader)), 5).unwrap()
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_load_sentiment_model() {
    let classifier = classifier(false);
    let result = classifier.warm_up().await;
    assert!(result.is_ok(), "Failed to load sentiment model: {:?}", result.err());
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_sentiment_positive() {
    let result = classifier(false)
        .classify("I love this movie, it's absolutely fantastic!")
        .await;

    assert_eq!(result.source(), ResultSource::ModelBacked);
    assert!(
        result.label().unwrap().is_positive(),
        "Expected positive label, got {:?}",
        result.label()
    );
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_sentiment_negative() {
    let result = classifier(false)
        .classify("This was the worst experience of my life. Terrible!")
        .await;

    assert!(
        result.label().unwrap().is_negative(),
        "Expected negative label, got {:?}",
        result.label()
    );
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_inference_is_deterministic() {
    let classifier = classifier(false);
    let text = "The service was fine but the food arrived cold.";

    let a = classifier.classify(text).await;
    let b = classifier.classify(text).await;

    assert_eq!(a.label(), b.label());
    assert_eq!(a.confidence(), b.confidence());
}

#[tokio::test]
#[ignore = "downloads model weights"]
async fn test_embedding_keywords() {
    let result = classifier(true)
        .classify("The pizza crust was crispy and the tomato sauce was delicious")
        .await;

    assert!(!result.is_error(), "{:?}", result.error());
    let keywords = result.keywords();
    assert!(!keywords.is_empty());
    assert!(keywords.len() <= 5);
    assert!(keywords.iter().all(|k| !k.contains("the ")));
}
