//! moodscan CLI
//!
//! Classifies short texts into five sentiment classes and prints the results
//! as JSON on stdout. Logs go to stderr.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use moodscan_core::ResultSource;
use moodscan_engine::{
    progress_channel, AggregateStats, BatchJob, EngineConfig, SentimentService,
};
use moodscan_classifiers::EnvironmentProfile;
use serde::Serialize;
use tracing::{info, warn};

mod cli;
mod input;

use cli::{Cli, Command};
use input::InputFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReport<'a> {
    #[serde(flatten)]
    job: &'a BatchJob,
    summary: AggregateStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectReport<'a> {
    profile: &'a EnvironmentProfile,
    active_path: ResultSource,
    model_available: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let metrics_handle = if cli.metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    let mut config = EngineConfig::load(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let service = SentimentService::new(config)?;
    info!("Default classifier path: {}", service.active_path().as_str());

    run_command(&cli.command, &service).await?;

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    Ok(())
}

async fn run_command(command: &Command, service: &SentimentService) -> Result<()> {
    match command {
        Command::Analyze { text } => {
            warm_up_for(service, service.active_path()).await;
            let result = service.analyze(text).await;
            print_json(&result)
        }

        Command::Batch { input, format, .. } => {
            let format = format.unwrap_or_else(|| InputFormat::from_path(input));
            let texts = input::read_texts(input, format)?;
            info!("Read {} texts from {}", texts.len(), input.display());

            warm_up_for(service, service.path_for_batch(texts.len())).await;

            let (tx, mut rx) = progress_channel(service.config().batch.progress_capacity);
            let reporter = tokio::spawn(async move {
                while let Some(progress) = rx.recv().await {
                    info!("Progress {}", progress);
                }
            });

            let job = service.run_batch(texts, Some(&tx)).await;
            drop(tx);
            reporter.await?;

            let job = job?;
            print_json(&BatchReport {
                summary: job.summary(),
                job: &job,
            })
        }

        Command::Compare { texts } => {
            warm_up_for(service, service.active_path()).await;
            let comparison = service.compare(texts).await?;
            print_json(&comparison)
        }

        Command::Detect => print_json(&DetectReport {
            profile: service.profile(),
            active_path: service.active_path(),
            model_available: service.has_model(),
        }),
    }
}

/// Load the model up front when `path` needs it; a failure leaves the
/// rule-based path in charge
async fn warm_up_for(service: &SentimentService, path: ResultSource) {
    if let Err(e) = service.warm_up_for(path).await {
        warn!("Model unavailable, falling back to rule-based classification: {}", e);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("moodscan=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodscan=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "moodscan_texts_total",
        "Texts classified, by result source"
    );
    metrics::describe_counter!(
        "moodscan_rejected_total",
        "Texts rejected by validation, by reason"
    );
    metrics::describe_counter!(
        "moodscan_degraded_batches_total",
        "Batches that fell back to the rule-based path"
    );
    metrics::describe_histogram!(
        "moodscan_chunk_latency_us",
        metrics::Unit::Microseconds,
        "Chunk processing latency in microseconds"
    );

    info!("Metrics recorder initialized");
    Ok(handle)
}
