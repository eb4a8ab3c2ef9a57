//! Pipeline state reducer
//!
//! All session state changes go through [`reduce`], a pure function from
//! `(state, event)` to the next state. No transport is involved, so every rule
//! below can be exercised with explicit event sequences.
//!
//! Rules:
//! - `StepStarted(i)` makes step `i` processing, completes every step `< i`
//!   (monotonic catch-up for dropped completions) and clears the content buffer.
//!   Starts at or below the highest step already started are stale and ignored,
//!   so progress never regresses and at most one step is ever processing.
//! - `ContentDelta` appends to the processing step's buffer; no-op otherwise.
//! - `ArtifactReady` is idempotent; `FigureReady` raises the figure count to
//!   `index + 1` and never lowers it.
//! - `TerminalSuccess` completes all steps and overwrites artifacts and figure
//!   count with the supplied values. `TerminalFailure` freezes steps as-is.
//! - After a terminal event the state is sealed: only `Log` still appends.
//!
//! Catch-up hides an earlier step that failed without the service saying so
//! before the next step started; that is accepted behavior.

use crate::accumulator::ContentAccumulator;
use crate::artifacts::ArtifactRegistry;
use crate::log::SessionLog;
use apa_common::events::{LogEntry, PipelineEvent, SessionPhase, Step, StepStatus};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// State of one streaming session, owned by the task session
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    phase: SessionPhase,
    steps: Vec<Step>,
    highest_started: Option<usize>,
    current_label: Option<String>,
    content: ContentAccumulator,
    artifacts: ArtifactRegistry,
    log: SessionLog,
    error: Option<String>,
}

impl PipelineState {
    /// Fresh streaming state with every step pending
    pub fn new<S: AsRef<str>>(step_labels: &[S], max_log_entries: Option<usize>) -> Self {
        Self {
            phase: SessionPhase::Streaming,
            steps: step_labels
                .iter()
                .enumerate()
                .map(|(index, label)| Step::pending(index, label.as_ref()))
                .collect(),
            highest_started: None,
            current_label: None,
            content: ContentAccumulator::new(),
            artifacts: ArtifactRegistry::new(),
            log: SessionLog::new(max_log_entries),
            error: None,
        }
    }

    /// Pre-submission view: every step pending, phase `Idle`
    pub fn idle<S: AsRef<str>>(step_labels: &[S], max_log_entries: Option<usize>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            ..Self::new(step_labels, max_log_entries)
        }
    }

    /// Fold one event into the state
    pub fn apply(self, event: &PipelineEvent) -> Self {
        reduce(self, event)
    }

    /// `Idle` before a task starts, then `Streaming`, `Completed` or `Failed`
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether a terminal event has sealed the state
    pub fn is_sealed(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn processing_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Processing)
    }

    /// `(completed, total)` step counts
    pub fn progress(&self) -> (usize, usize) {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        (completed, self.steps.len())
    }

    /// Label sent with the most recent step start
    pub fn current_label(&self) -> Option<&str> {
        self.current_label.as_deref()
    }

    /// Text streamed for the processing step (frozen once sealed)
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn figure_count(&self) -> u32 {
        self.artifacts.figure_count()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Apply one event to the state, returning the next state
pub fn reduce(mut state: PipelineState, event: &PipelineEvent) -> PipelineState {
    if state.is_sealed() {
        match event {
            PipelineEvent::Log {
                message,
                received_at,
            } => append_log(&mut state, message, received_at),
            other => debug!(
                event_type = other.event_type(),
                phase = %state.phase,
                "Session sealed, ignoring event"
            ),
        }
        return state;
    }

    match event {
        PipelineEvent::StepStarted { index, label } => start_step(&mut state, *index, label),
        PipelineEvent::ContentDelta { text, step } => {
            if !state.content.append(text, *step) {
                trace!(belongs_to = ?step, "Dropped content delta with no matching processing step");
            }
        }
        PipelineEvent::ArtifactReady { key } => {
            if state.artifacts.mark_ready(key.clone(), key.clone()) {
                debug!(key = %key, "Artifact ready");
            }
        }
        PipelineEvent::FigureReady { index, total } => {
            state.artifacts.record_figure(*index, *total);
        }
        PipelineEvent::Log {
            message,
            received_at,
        } => append_log(&mut state, message, received_at),
        PipelineEvent::TerminalSuccess {
            artifacts,
            figure_count,
        } => complete(&mut state, artifacts, *figure_count),
        PipelineEvent::TerminalFailure { message, origin } => {
            warn!(origin = ?origin, error = %message, "Pipeline failed");
            state.error = Some(message.clone());
            state.phase = SessionPhase::Failed;
        }
    }

    state
}

fn start_step(state: &mut PipelineState, index: usize, label: &str) {
    if index >= state.steps.len() {
        warn!(
            index,
            step_count = state.steps.len(),
            "Step start beyond configured steps, ignoring"
        );
        return;
    }
    if let Some(highest) = state.highest_started {
        if index <= highest {
            debug!(index, highest, "Stale or duplicate step start, ignoring");
            return;
        }
    }

    for step in state.steps.iter_mut() {
        if step.index < index {
            step.status = StepStatus::Completed;
        }
    }
    state.steps[index].status = StepStatus::Processing;
    state.highest_started = Some(index);
    state.current_label = Some(label.to_string());
    state.content.begin_step(index);
}

fn complete(state: &mut PipelineState, artifacts: &BTreeMap<String, String>, figure_count: u32) {
    for step in state.steps.iter_mut() {
        step.status = StepStatus::Completed;
    }
    if state.artifacts.documents() != artifacts || state.artifacts.figure_count() != figure_count {
        debug!(
            local_documents = state.artifacts.document_count(),
            final_documents = artifacts.len(),
            local_figures = state.artifacts.figure_count(),
            final_figures = figure_count,
            "Final artifact values differ from accumulated values, using final values"
        );
    }
    state.artifacts.replace_all(artifacts.clone(), figure_count);
    state.phase = SessionPhase::Completed;
}

fn append_log(state: &mut PipelineState, message: &str, received_at: &chrono::DateTime<chrono::Utc>) {
    state.log.push(LogEntry {
        timestamp: *received_at,
        message: message.to_string(),
    });
}
