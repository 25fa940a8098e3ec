//! moodscan Classifiers
//!
//! Five-class sentiment classifiers sharing one output contract:
//! - Rule-based: lexicon scoring, deterministic and sub-millisecond
//! - Model-backed: pretrained transformer scoring with embedding keywords
//!
//! The environment detector decides which of the two is the default path.

pub mod backend;
#[cfg(feature = "ml-models")]
pub mod candle_backend;
pub mod classifier;
pub mod config;
pub mod environment;
pub mod lexicon;
pub mod model_backed;
pub mod model_handle;
pub mod rule_based;

pub use backend::{
    BackendError, BackendErrorKind, BackendLoader, KeywordExtractor, LoadedBackends, ScaleScores,
    SentimentScorer,
};
#[cfg(feature = "ml-models")]
pub use candle_backend::CandleLoader;
pub use classifier::{ChunkOutput, Classifier};
pub use config::{DeviceSpec, KeywordModelConfig, ModelSource, RuleBasedConfig, SentimentModelConfig};
pub use environment::{
    DetectionSignal, EnvironmentDetector, EnvironmentProfile, HostProbe, SystemProbe,
};
pub use lexicon::Lexicon;
pub use model_backed::ModelBackedClassifier;
pub use model_handle::ModelHandle;
pub use rule_based::RuleBasedClassifier;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ChunkOutput, Classifier};
    pub use crate::environment::{EnvironmentDetector, EnvironmentProfile};
    pub use crate::model_backed::ModelBackedClassifier;
    pub use crate::model_handle::ModelHandle;
    pub use crate::rule_based::RuleBasedClassifier;
}
