//! Pipeline step and session type definitions
//!
//! Supporting types for generation progress tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step not yet started
    Pending,
    /// Step currently running (at most one per session)
    Processing,
    /// Step finished, explicitly or by monotonic catch-up
    Completed,
    /// Step failed
    Failed,
}

/// One discrete stage of the generation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position in the pipeline, 0-based
    pub index: usize,
    /// Display label
    pub label: String,
    /// Current status
    pub status: StepStatus,
}

impl Step {
    pub fn pending(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            status: StepStatus::Pending,
        }
    }
}

/// Server-side log line received during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was received
    pub timestamp: DateTime<Utc>,
    /// Log message text
    pub message: String,
}

impl LogEntry {
    /// Render as `[HH:MM:SS] message` in local time
    pub fn display_line(&self) -> String {
        format!("[{}] {}", crate::time::wall_clock(&self.timestamp), self.message)
    }
}

/// Task session lifecycle phase
///
/// `Idle → Uploading → Streaming → {Completed, Failed}`; reset returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No active session
    Idle,
    /// Documents are being submitted, no task id yet
    Uploading,
    /// Event stream open, events being applied
    Streaming,
    /// Terminal success; downloads unlocked
    Completed,
    /// Terminal failure; state frozen at last known values
    Failed,
}

impl SessionPhase {
    /// Check if phase is terminal (sealed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Uploading => "uploading",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
