//! apa-tracker - submit a paper to the patent service and follow the task
//!
//! Streams step progress to the log, then downloads every finished artifact.

use anyhow::{bail, Context, Result};
use apa_common::config::{load_toml_config, resolve_api_base, resolve_config_path, TomlConfig};
use apa_common::events::{EventBus, SessionPhase, TrackerEvent};
use apa_tracker::{
    ApiClient, DocumentUpload, EventStreamClient, SessionSettings, SubmissionRequest, TaskSession,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "apa-tracker", version, about = "Generate a patent draft from a paper and track its progress")]
struct Args {
    /// Paper to convert (PDF)
    #[arg(long)]
    pdf: PathBuf,

    /// Style sample for the specification
    #[arg(long)]
    spec_sample: Option<PathBuf>,

    /// Style sample for the claims
    #[arg(long)]
    claims_sample: Option<PathBuf>,

    /// Style sample for the abstract
    #[arg(long)]
    abstract_sample: Option<PathBuf>,

    /// Model provider API key, passed to the service
    #[arg(long, env = "APA_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Service API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (default: ./output/<task_id>)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config);

    info!(
        "Starting apa-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let api_base = resolve_api_base(args.api_base.as_deref(), &config);
    info!("Service API: {}", api_base);

    let client = Arc::new(ApiClient::new(api_base.clone())?);
    client
        .configure_credential(&args.api_key)
        .await
        .context("Service did not accept the credential")?;

    let transport = Arc::new(client.event_transport()?);
    let stream_client = EventStreamClient::new(transport, &config.stream);
    let event_bus = EventBus::new(config.stream.channel_capacity);

    let mut session = TaskSession::new(
        SessionSettings::from_config(&config),
        client.clone(),
        client.clone(),
        stream_client,
        event_bus.clone(),
    );

    let request = build_request(&args).await?;
    let task_id = session.submit(&request).await.context("Submission failed")?;
    info!("Task {} submitted", task_id);

    let mut notifications = event_bus.subscribe();
    let mut last_step = None;
    while session.phase() == SessionPhase::Streaming {
        if !session.next().await? {
            break;
        }
        render_progress(&session, &mut notifications, &mut last_step);
    }

    match session.phase() {
        SessionPhase::Completed => {
            let out_dir = args
                .out
                .clone()
                .unwrap_or_else(|| Path::new("output").join(&task_id));
            let report = session.download_all(&out_dir).await?;
            info!(
                "Saved {} file(s) to {}",
                report.saved.len(),
                out_dir.display()
            );
            if !report.is_complete() {
                for (file, reason) in &report.failures {
                    error!("Could not download {}: {}", file, reason);
                }
                bail!("{} artifact(s) failed to download", report.failures.len());
            }
            Ok(())
        }
        SessionPhase::Failed => {
            let message = session.state().error().unwrap_or("task failed").to_string();
            bail!("Task {} failed: {}", task_id, message)
        }
        phase => bail!("Task {} stopped while {}", task_id, phase),
    }
}

fn init_tracing(config: &TomlConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let file = config.logging.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Cannot open log file {}: {}", path.display(), e))
            .ok()
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

async fn build_request(args: &Args) -> Result<SubmissionRequest> {
    let mut request = SubmissionRequest::new(
        DocumentUpload::from_path(&args.pdf)
            .await
            .with_context(|| format!("Cannot read {}", args.pdf.display()))?,
    );
    request.spec_sample = read_optional(args.spec_sample.as_deref()).await?;
    request.claims_sample = read_optional(args.claims_sample.as_deref()).await?;
    request.abstract_sample = read_optional(args.abstract_sample.as_deref()).await?;
    Ok(request)
}

async fn read_optional(path: Option<&Path>) -> Result<Option<DocumentUpload>> {
    match path {
        Some(path) => Ok(Some(
            DocumentUpload::from_path(path)
                .await
                .with_context(|| format!("Cannot read {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

/// Log step transitions and new service log lines
fn render_progress(
    session: &TaskSession,
    notifications: &mut broadcast::Receiver<TrackerEvent>,
    last_step: &mut Option<usize>,
) {
    let mut log_changed = false;
    loop {
        match notifications.try_recv() {
            Ok(TrackerEvent::EventApplied { event_type, .. }) if event_type == "Log" => {
                log_changed = true;
            }
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Progress display skipped {} notifications", skipped);
            }
            Err(_) => break,
        }
    }

    let state = session.state();

    if let Some(step) = state.processing_step() {
        if *last_step != Some(step.index) {
            *last_step = Some(step.index);
            let (done, total) = state.progress();
            info!(
                "[{}/{}] {}",
                done + 1,
                total,
                state.current_label().unwrap_or(&step.label)
            );
        }
    }

    if log_changed {
        if let Some(entry) = state.log().last() {
            info!("{}", entry.display_line());
        }
    }
}
