//! Chunked batch orchestration
//!
//! A batch is validated and classified chunk by chunk on the active path.
//! The first systemic failure of the active path degrades the run: every
//! text not yet classified goes through the fallback path for the rest of
//! the run, and those results are marked degraded.

use crate::aggregate::{summarize, AggregateStats};
use crate::config::{BatchConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BATCH_SIZE};
use crate::progress::Progress;
use chrono::{DateTime, Utc};
use moodscan_classifiers::Classifier;
use moodscan_core::{
    validate, Error, Result, ResultError, ResultSource, SentimentResult, ValidationError,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs batches against an active classifier with a fallback
#[derive(Clone)]
pub struct BatchOrchestrator {
    primary: Arc<dyn Classifier>,
    fallback: Arc<dyn Classifier>,
    chunk_size: usize,
    max_batch_size: usize,
}

impl BatchOrchestrator {
    pub fn new(primary: Arc<dyn Classifier>, fallback: Arc<dyn Classifier>) -> Self {
        Self {
            primary,
            fallback,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn from_config(
        primary: Arc<dyn Classifier>,
        fallback: Arc<dyn Classifier>,
        config: &BatchConfig,
    ) -> Self {
        Self::new(primary, fallback)
            .with_chunk_size(config.chunk_size)
            .with_max_batch_size(config.max_batch_size)
    }

    /// Checked when a batch starts; zero makes every batch fail
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Source recorded on results from the active path
    pub fn primary_source(&self) -> ResultSource {
        self.primary.source()
    }

    /// Begin a batch without classifying anything yet.
    ///
    /// Fails with `InvalidChunkSize` or `BatchTooLarge` before any text is
    /// looked at.
    pub fn start(&self, inputs: Vec<String>) -> Result<BatchRun> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidChunkSize(self.chunk_size));
        }
        if inputs.len() > self.max_batch_size {
            return Err(Error::BatchTooLarge {
                size: inputs.len(),
                limit: self.max_batch_size,
            });
        }

        let job = BatchJob::new(inputs, self.chunk_size);
        info!(
            "Starting batch {} with {} texts on {} ({} per chunk)",
            job.id,
            job.total(),
            self.primary.name(),
            self.chunk_size
        );

        Ok(BatchRun {
            primary: Arc::clone(&self.primary),
            fallback: Arc::clone(&self.fallback),
            job,
            cursor: 0,
            chunk_index: 0,
            degraded: false,
        })
    }

    /// Run a batch to completion, pushing progress after every chunk
    pub async fn run(
        &self,
        inputs: Vec<String>,
        progress: Option<&mpsc::Sender<Progress>>,
    ) -> Result<BatchJob> {
        let mut run = self.start(inputs)?;

        while let Some(update) = run.next_chunk().await {
            if let Some(tx) = progress {
                if tx.send(update).await.is_err() {
                    debug!("Progress receiver dropped for batch {}", run.job.id);
                }
            }
        }

        Ok(run.into_job())
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("chunk_size", &self.chunk_size)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

/// A batch in progress.
///
/// Advanced one chunk at a time. Dropping it between chunks abandons the
/// rest of the batch; [`BatchRun::into_job`] keeps the chunks already done.
pub struct BatchRun {
    primary: Arc<dyn Classifier>,
    fallback: Arc<dyn Classifier>,
    job: BatchJob,
    cursor: usize,
    chunk_index: usize,
    degraded: bool,
}

/// Per-position state while a chunk is assembled
enum Slot {
    Rejected(ValidationError),
    Pending,
}

impl BatchRun {
    /// Classify the next chunk; `None` once every text has a result
    pub async fn next_chunk(&mut self) -> Option<Progress> {
        let total = self.job.total();
        if self.cursor >= total {
            self.finish();
            return None;
        }

        let started = Instant::now();
        let chunk_start = self.cursor;
        let chunk_end = (chunk_start + self.job.chunk_size).min(total);
        let chunk: Vec<String> = self.job.inputs[chunk_start..chunk_end].to_vec();
        let was_degraded = self.degraded;

        let mut slots = Vec::with_capacity(chunk.len());
        let mut offsets = Vec::new();
        let mut pending = Vec::new();
        for (offset, text) in chunk.iter().enumerate() {
            match validate(text) {
                Ok(()) => {
                    slots.push(Slot::Pending);
                    offsets.push(offset);
                    pending.push(text.clone());
                }
                Err(reason) => {
                    metrics::counter!("moodscan_rejected_total", "reason" => reason.as_str())
                        .increment(1);
                    slots.push(Slot::Rejected(reason));
                }
            }
        }

        let (classified, fallback_from) = self.classify_pending(&pending).await;

        // Offset within the chunk from which results belong to the fallback path
        let degraded_at = if was_degraded {
            Some(0)
        } else {
            fallback_from.map(|k| offsets.get(k).copied().unwrap_or(chunk.len()))
        };
        if let (false, Some(offset)) = (was_degraded, degraded_at) {
            self.job.degraded_from = Some(chunk_start + offset);
        }

        let mut classified = classified.into_iter();
        for (offset, (slot, text)) in slots.into_iter().zip(chunk).enumerate() {
            let result = match slot {
                Slot::Rejected(reason) => {
                    if degraded_at.is_some_and(|at| offset >= at) {
                        SentimentResult::rejected(text, self.fallback.source(), reason)
                            .into_degraded()
                    } else {
                        SentimentResult::rejected(text, self.primary.source(), reason)
                    }
                }
                Slot::Pending => match classified.next() {
                    Some(result) => {
                        metrics::counter!("moodscan_texts_total", "source" => result.source().as_str())
                            .increment(1);
                        result
                    }
                    None => SentimentResult::failed(
                        text,
                        self.fallback.source(),
                        ResultError::ClassifierUnavailable("no result produced".to_string()),
                    )
                    .into_degraded(),
                },
            };
            self.job.results.push(result);
        }

        self.cursor = chunk_end;
        let elapsed = started.elapsed();
        metrics::histogram!("moodscan_chunk_latency_us").record(elapsed.as_micros() as f64);

        let update = Progress {
            processed: self.job.results.len(),
            total,
            chunk_index: self.chunk_index,
            degraded: self.degraded,
        };
        debug!(
            "Batch {} chunk {} done in {:?}: {}",
            self.job.id, self.chunk_index, elapsed, update
        );
        self.chunk_index += 1;

        if self.cursor >= total {
            self.finish();
        }

        Some(update)
    }

    /// Classify validated texts in order.
    ///
    /// Also returns the index into `texts` from which the fallback path took
    /// over when this call degraded the run.
    async fn classify_pending(&mut self, texts: &[String]) -> (Vec<SentimentResult>, Option<usize>) {
        let mut results = Vec::with_capacity(texts.len());
        let mut fallback_from = None;

        if !self.degraded {
            let output = self.primary.classify_chunk(texts).await;
            results.extend(output.results.into_iter().take(texts.len()));

            match output.failure {
                None => return (results, None),
                Some(error) => {
                    self.degrade(&error);
                    fallback_from = Some(results.len());
                }
            }
        }

        let rest = &texts[results.len()..];
        if rest.is_empty() {
            return (results, fallback_from);
        }

        let output = self.fallback.classify_chunk(rest).await;
        results.extend(
            output
                .results
                .into_iter()
                .take(rest.len())
                .map(SentimentResult::into_degraded),
        );

        if let Some(error) = output.failure {
            warn!(
                "Fallback classifier {} failed in batch {}: {}",
                self.fallback.name(),
                self.job.id,
                error
            );
            let source = self.fallback.source();
            let message = error.to_string();
            let remaining: Vec<SentimentResult> = texts[results.len()..]
                .iter()
                .map(|text| {
                    SentimentResult::failed(
                        text.as_str(),
                        source,
                        ResultError::ClassifierUnavailable(message.clone()),
                    )
                    .into_degraded()
                })
                .collect();
            results.extend(remaining);
        }

        (results, fallback_from)
    }

    fn degrade(&mut self, error: &Error) {
        self.degraded = true;
        metrics::counter!("moodscan_degraded_batches_total").increment(1);
        warn!(
            "Classifier {} unavailable in batch {}, continuing with {}: {}",
            self.primary.name(),
            self.job.id,
            self.fallback.name(),
            error
        );
    }

    fn finish(&mut self) {
        if self.job.finished_at.is_some() {
            return;
        }
        self.job.finished_at = Some(Utc::now());
        info!(
            "Finished batch {}: {} texts{}",
            self.job.id,
            self.job.total(),
            if self.degraded { ", degraded" } else { "" }
        );
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The job as it stands
    pub fn job(&self) -> &BatchJob {
        &self.job
    }

    /// Stop here and keep the completed chunks
    pub fn into_job(self) -> BatchJob {
        self.job
    }
}

/// A batch and its results.
///
/// `results[i]` belongs to `inputs[i]` for every completed position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    id: Uuid,
    #[serde(skip)]
    inputs: Vec<String>,
    total: usize,
    chunk_size: usize,
    results: Vec<SentimentResult>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    degraded_from: Option<usize>,
}

impl BatchJob {
    fn new(inputs: Vec<String>, chunk_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            total: inputs.len(),
            results: Vec::with_capacity(inputs.len()),
            inputs,
            chunk_size,
            started_at: Utc::now(),
            finished_at: None,
            degraded_from: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn results(&self) -> &[SentimentResult] {
        &self.results
    }

    pub fn processed_count(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.results.len() == self.total
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Position of the first result produced after degradation
    pub fn degraded_from(&self) -> Option<usize> {
        self.degraded_from
    }

    pub fn summary(&self) -> AggregateStats {
        summarize(&self.results)
    }

    pub fn into_results(self) -> Vec<SentimentResult> {
        self.results
    }
}
