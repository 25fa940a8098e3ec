//! Lazily loaded, shared model handle

use crate::backend::{BackendError, BackendLoader, LoadedBackends};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;

type LoadOutcome = std::result::Result<Arc<LoadedBackends>, BackendError>;

/// Owns the loaded model collaborators.
///
/// The load runs at most once per handle on a blocking thread. Both the
/// success and the failure are kept, so a failed load fails fast afterwards
/// instead of being retried. Cloning shares the same underlying state.
///
/// A caller that stops waiting (for example under a timeout) leaves the load
/// running; the next caller joins that same load.
#[derive(Clone)]
pub struct ModelHandle {
    loader: Arc<dyn BackendLoader>,
    state: Arc<OnceCell<LoadOutcome>>,
    pending: Arc<Mutex<Option<JoinHandle<LoadOutcome>>>>,
}

impl ModelHandle {
    pub fn new(loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            loader,
            state: Arc::new(OnceCell::new()),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the loaded collaborators, loading them on first use.
    ///
    /// Concurrent callers wait on the same load.
    pub async fn acquire(&self) -> LoadOutcome {
        self.state.get_or_init(|| self.join_load()).await.clone()
    }

    /// Wait for the in-flight load, starting it if none is running
    async fn join_load(&self) -> LoadOutcome {
        let mut pending = self.pending.lock().await;
        let task = pending.get_or_insert_with(|| {
            let loader = Arc::clone(&self.loader);
            tokio::task::spawn_blocking(move || load_and_log(loader.as_ref()))
        });

        // The handle stays in place until it resolves, so a dropped waiter
        // does not lose the running load
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(BackendError::load_failure(format!(
                "model loader task failed: {e}"
            ))),
        };
        *pending = None;
        outcome
    }

    /// Whether a load has completed, successfully or not
    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    /// The stored load failure, if the load has run and failed
    pub fn load_error(&self) -> Option<BackendError> {
        match self.state.get() {
            Some(Err(e)) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        self.loader.describe()
    }
}

fn load_and_log(loader: &dyn BackendLoader) -> LoadOutcome {
    let description = loader.describe();
    tracing::info!("Loading sentiment model: {}", description);

    let outcome = loader.load().map(Arc::new);
    match &outcome {
        Ok(backends) => tracing::info!(
            "Sentiment model ready: {} (keywords: {})",
            backends.scorer.name(),
            if backends.keywords.is_some() { "embedding" } else { "simplified" }
        ),
        Err(e) => tracing::error!("Failed to load sentiment model {}: {}", description, e),
    }
    outcome
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("loader", &self.loader.describe())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
