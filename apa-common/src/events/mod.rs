//! Event types for the APA tracker
//!
//! Provides the typed pipeline events consumed by the state reducer, the wire
//! frames they are decoded from, and the EventBus used to notify renderers.

// Sub-modules (supporting types)
mod step_types;
mod wire;

pub use step_types::{LogEntry, SessionPhase, Step, StepStatus};
pub use wire::{decode_frame, DoneStatus, RawIndex, WireFrame, DEFAULT_FAILURE_MESSAGE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Where a terminal failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    /// Explicit `error` frame or failed `done` frame from the service
    Remote,
    /// Synthesized locally after a transport failure or idle timeout
    Local,
}

/// Typed pipeline event
///
/// Produced by the stream client from wire frames (or synthesized locally) and
/// folded into session state by the reducer, one at a time, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Step `index` became the processing step
    StepStarted { index: usize, label: String },

    /// Streaming text for the processing step
    ContentDelta {
        text: String,
        /// Step the service says this text belongs to, if it said
        step: Option<usize>,
    },

    /// Document `key` is ready
    ArtifactReady { key: String },

    /// Figure `index` (0-based) is ready
    FigureReady { index: u32, total: Option<u32> },

    /// Server log line
    Log {
        message: String,
        received_at: DateTime<Utc>,
    },

    /// Pipeline completed; values here are authoritative
    TerminalSuccess {
        artifacts: BTreeMap<String, String>,
        figure_count: u32,
    },

    /// Pipeline failed
    TerminalFailure {
        message: String,
        origin: FailureOrigin,
    },
}

impl PipelineEvent {
    /// Locally synthesized terminal failure (transport loss, idle timeout)
    pub fn local_failure(message: impl Into<String>) -> Self {
        PipelineEvent::TerminalFailure {
            message: message.into(),
            origin: FailureOrigin::Local,
        }
    }

    /// Whether this event seals the session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::TerminalSuccess { .. } | PipelineEvent::TerminalFailure { .. }
        )
    }

    /// Get event type as string for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::StepStarted { .. } => "StepStarted",
            PipelineEvent::ContentDelta { .. } => "ContentDelta",
            PipelineEvent::ArtifactReady { .. } => "ArtifactReady",
            PipelineEvent::FigureReady { .. } => "FigureReady",
            PipelineEvent::Log { .. } => "Log",
            PipelineEvent::TerminalSuccess { .. } => "TerminalSuccess",
            PipelineEvent::TerminalFailure { .. } => "TerminalFailure",
        }
    }
}

/// Notification broadcast to renderers after session changes
///
/// Carries no state; subscribers re-read the session when notified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    /// Session phase changed
    PhaseChanged {
        /// Task id, once one has been obtained
        task_id: Option<String>,
        old_phase: SessionPhase,
        new_phase: SessionPhase,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline event was applied to session state
    EventApplied {
        task_id: String,
        event_type: String,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            TrackerEvent::PhaseChanged { .. } => "PhaseChanged",
            TrackerEvent::EventApplied { .. } => "EventApplied",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Distribution bus for tracker notifications
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the session)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use apa_common::events::{EventBus, SessionPhase, TrackerEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(TrackerEvent::PhaseChanged {
///     task_id: None,
///     old_phase: SessionPhase::Idle,
///     new_phase: SessionPhase::Uploading,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "PhaseChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of notifications buffered per subscriber before
    /// the oldest are dropped for that subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Emit a notification to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TrackerEvent,
    ) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
        self.tx.send(event)
    }

    /// Emit a notification, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TrackerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
