//! Task session state machine
//!
//! Owns one task from submission to its terminal outcome:
//!
//! ```text
//! Idle --submit--> Uploading --task id--> Streaming --done--> Completed
//!                      |                      |
//!                      +--failure--> Idle      +--error/transport--> Failed
//! ```
//!
//! `submit()` is also accepted from `Completed` or `Failed` and discards the
//! finished task first. `reset()` returns to `Idle` from any phase. All pipeline state changes go
//! through the reducer; the session only sequences phases, owns the stream
//! handle and announces changes on the [`EventBus`].

use crate::api::{ArtifactFetcher, SubmissionRequest, SubmissionService};
use crate::download::{self, DownloadPlan, DownloadReport};
use crate::error::{Result, TrackerError};
use crate::reducer::PipelineState;
use crate::stream::{EventStreamClient, StreamHandle};
use apa_common::config::TomlConfig;
use apa_common::events::{EventBus, PipelineEvent, SessionPhase, TrackerEvent};
use apa_common::time;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-session settings taken from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub step_labels: Vec<String>,
    pub max_log_entries: Option<usize>,
}

impl SessionSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            step_labels: config.steps.clone(),
            max_log_entries: config.max_log_entries,
        }
    }
}

pub struct TaskSession {
    settings: SessionSettings,
    submitter: Arc<dyn SubmissionService>,
    fetcher: Arc<dyn ArtifactFetcher>,
    stream_client: EventStreamClient,
    event_bus: EventBus,
    phase: SessionPhase,
    task_id: Option<String>,
    state: PipelineState,
    stream: Option<StreamHandle>,
}

impl TaskSession {
    pub fn new(
        settings: SessionSettings,
        submitter: Arc<dyn SubmissionService>,
        fetcher: Arc<dyn ArtifactFetcher>,
        stream_client: EventStreamClient,
        event_bus: EventBus,
    ) -> Self {
        let state = PipelineState::idle(&settings.step_labels, settings.max_log_entries);
        Self {
            settings,
            submitter,
            fetcher,
            stream_client,
            event_bus,
            phase: SessionPhase::Idle,
            task_id: None,
            state,
            stream: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Pipeline state; every step pending until a task starts streaming
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn current_label(&self) -> Option<&str> {
        self.state.current_label()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TrackerEvent> {
        self.event_bus.subscribe()
    }

    /// Submit documents and start streaming
    ///
    /// A finished task (`Completed` or `Failed`) is discarded once the
    /// request passes its checks. On failure the session returns to `Idle`
    /// with no task id and no stream.
    pub async fn submit(&mut self, request: &SubmissionRequest) -> Result<String> {
        if matches!(self.phase, SessionPhase::Uploading | SessionPhase::Streaming) {
            return Err(TrackerError::InvalidState(format!(
                "cannot submit while {}",
                self.phase
            )));
        }
        if request.primary.is_none() {
            return Err(TrackerError::Rejected(
                "primary document is required".to_string(),
            ));
        }
        if !self.submitter.credential_acknowledged() {
            return Err(TrackerError::Rejected(
                "credential has not been acknowledged".to_string(),
            ));
        }

        if self.phase.is_terminal() {
            debug!(task_id = ?self.task_id, phase = %self.phase, "Discarding finished task");
            self.discard_task();
        }

        self.set_phase(SessionPhase::Uploading);

        let task_id = match self.submitter.submit(request).await {
            Ok(task_id) => task_id,
            Err(e) => {
                warn!(error = %e, "Submission failed");
                self.set_phase(SessionPhase::Idle);
                return Err(e);
            }
        };

        let stream = match self.stream_client.open(&task_id) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Could not open event stream");
                self.set_phase(SessionPhase::Idle);
                return Err(e);
            }
        };

        self.task_id = Some(task_id.clone());
        self.state = PipelineState::new(&self.settings.step_labels, self.settings.max_log_entries);
        self.stream = Some(stream);
        self.set_phase(SessionPhase::Streaming);

        Ok(task_id)
    }

    /// Fold one event into the session state
    pub fn apply(&mut self, event: PipelineEvent) -> Result<SessionPhase> {
        let Some(task_id) = self.task_id.clone() else {
            return Err(self.no_active_task());
        };

        let state = std::mem::replace(&mut self.state, PipelineState::idle::<&str>(&[], None));
        self.state = state.apply(&event);
        let next_phase = self.state.phase();

        self.event_bus.emit_lossy(TrackerEvent::EventApplied {
            task_id,
            event_type: event.event_type().to_string(),
            timestamp: time::now(),
        });

        if next_phase != self.phase {
            self.set_phase(next_phase);
        }
        if next_phase.is_terminal() {
            self.close_stream();
        }

        Ok(self.phase)
    }

    /// Await and apply the next streamed event
    ///
    /// Returns `false` when there is no stream left to read.
    pub async fn next(&mut self) -> Result<bool> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };

        match stream.next_event().await {
            Some(event) => {
                self.apply(event)?;
                Ok(true)
            }
            None => {
                self.close_stream();
                if self.phase == SessionPhase::Streaming {
                    self.apply(PipelineEvent::local_failure(
                        "event stream closed unexpectedly",
                    ))?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// Drive the stream until the session reaches a terminal phase
    pub async fn run_to_completion(&mut self) -> Result<SessionPhase> {
        while self.phase == SessionPhase::Streaming {
            if !self.next().await? {
                break;
            }
        }
        Ok(self.phase)
    }

    /// Close any stream and discard all session state
    ///
    /// Steps go back to pending; buffer, log and artifacts are emptied.
    pub fn reset(&mut self) {
        self.discard_task();
        if self.phase != SessionPhase::Idle {
            self.set_phase(SessionPhase::Idle);
        }
    }

    /// Everything ready for download; only once `Completed`
    pub fn download_plan(&self) -> Result<DownloadPlan> {
        match (self.phase, &self.task_id) {
            (SessionPhase::Completed, Some(task_id)) => {
                Ok(DownloadPlan::from_state(task_id.clone(), &self.state))
            }
            _ => Err(TrackerError::InvalidState(format!(
                "downloads unavailable while {}",
                self.phase
            ))),
        }
    }

    /// Download every ready artifact into `out_dir`
    pub async fn download_all(&self, out_dir: &Path) -> Result<DownloadReport> {
        let plan = self.download_plan()?;
        download::download_all(self.fetcher.as_ref(), &plan, out_dir).await
    }

    /// Fetch one document, only once it is marked ready
    pub async fn fetch_document(&self, key: &str) -> Result<Vec<u8>> {
        let (task_id, state) = self.active()?;
        if !state.artifacts().is_ready(key) {
            return Err(TrackerError::NotReady(format!("document {}", key)));
        }
        self.fetcher.fetch_document(task_id, key).await
    }

    /// Fetch one figure, only if `index` is below the figure count
    pub async fn fetch_figure(&self, index: u32) -> Result<Vec<u8>> {
        let (task_id, state) = self.active()?;
        if !state.artifacts().is_figure_ready(index) {
            return Err(TrackerError::NotReady(format!("figure {}", index)));
        }
        self.fetcher.fetch_figure(task_id, index).await
    }

    fn active(&self) -> Result<(&str, &PipelineState)> {
        match &self.task_id {
            Some(task_id) => Ok((task_id, &self.state)),
            None => Err(self.no_active_task()),
        }
    }

    fn discard_task(&mut self) {
        self.close_stream();
        self.task_id = None;
        self.state = PipelineState::idle(&self.settings.step_labels, self.settings.max_log_entries);
    }

    fn no_active_task(&self) -> TrackerError {
        TrackerError::InvalidState(format!("no task is active (session is {})", self.phase))
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }

    fn set_phase(&mut self, new_phase: SessionPhase) {
        let old_phase = self.phase;
        self.phase = new_phase;

        match new_phase {
            SessionPhase::Failed => warn!(
                task_id = ?self.task_id,
                old_phase = %old_phase,
                error = ?self.state.error(),
                "Session failed"
            ),
            _ => info!(
                task_id = ?self.task_id,
                old_phase = %old_phase,
                new_phase = %new_phase,
                "Session phase changed"
            ),
        }

        self.event_bus.emit_lossy(TrackerEvent::PhaseChanged {
            task_id: self.task_id.clone(),
            old_phase,
            new_phase,
            timestamp: time::now(),
        });
        debug!(subscribers = self.event_bus.subscriber_count(), "Phase change broadcast");
    }
}
