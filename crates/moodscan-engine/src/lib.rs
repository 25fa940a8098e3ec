//! moodscan Engine
//!
//! Batch orchestration and reporting on top of the classifier paths:
//! - Chunked batches with progress signals and mid-batch degradation
//! - Aggregate statistics and side-by-side comparison
//! - The `SentimentService` context object and its configuration

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod orchestrator;
pub mod progress;
pub mod service;

pub use aggregate::{summarize, AggregateStats};
pub use compare::{Comparison, MAX_COMPARE_TEXTS, MIN_COMPARE_TEXTS};
pub use config::{BatchConfig, ClassifierMode, EngineConfig, EnvironmentConfig};
pub use orchestrator::{BatchJob, BatchOrchestrator, BatchRun};
pub use progress::{progress_channel, Progress};
pub use service::SentimentService;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregate::{summarize, AggregateStats};
    pub use crate::config::EngineConfig;
    pub use crate::orchestrator::{BatchJob, BatchOrchestrator};
    pub use crate::progress::Progress;
    pub use crate::service::SentimentService;
}
