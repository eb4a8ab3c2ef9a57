//! Wire frames emitted by the generation service event stream
//!
//! Each SSE `data:` payload is one JSON object carrying a `type` discriminator.
//! Frames are decoded here and converted into typed [`PipelineEvent`]s.

use super::{FailureOrigin, PipelineEvent};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message used when a failed `done` frame carries no error text
pub const DEFAULT_FAILURE_MESSAGE: &str = "task failed";

/// Step index as sent on the wire
///
/// The service sends indices as strings (`"3"`); plain integers are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawIndex {
    Number(u64),
    Text(String),
}

impl RawIndex {
    /// Parse into a step index
    pub fn parse(&self) -> Result<usize> {
        match self {
            RawIndex::Number(n) => usize::try_from(*n)
                .map_err(|_| Error::MalformedFrame(format!("step index out of range: {}", n))),
            RawIndex::Text(s) => s
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::MalformedFrame(format!("invalid step index: {:?}", s))),
        }
    }
}

/// Final status carried by a `done` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoneStatus {
    Completed,
    Failed,
}

/// One decoded stream frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireFrame {
    /// A step started
    Step { step: RawIndex, label: String },

    /// Streaming text for the current step
    Content {
        text: String,
        /// Step the text belongs to (sent by the service, optional)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<RawIndex>,
    },

    /// A named document is ready for download
    FileReady { doc_type: String },

    /// Figure `index` (0-based) is ready
    FigureReady {
        index: u32,
        /// Number of figures the service expects to generate
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u32>,
    },

    /// Server-side log line
    Log { message: String },

    /// Pipeline failed
    Error { message: String },

    /// Pipeline finished; authoritative final values
    Done {
        status: DoneStatus,
        #[serde(default)]
        files: Option<BTreeMap<String, String>>,
        #[serde(default)]
        figures: Option<u32>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl WireFrame {
    /// Parse a JSON frame payload
    pub fn parse(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Convert into a typed pipeline event
    ///
    /// `received_at` stamps log entries so reduction stays pure.
    pub fn into_event(self, received_at: DateTime<Utc>) -> Result<PipelineEvent> {
        let event = match self {
            WireFrame::Step { step, label } => PipelineEvent::StepStarted {
                index: step.parse()?,
                label,
            },
            WireFrame::Content { text, step } => PipelineEvent::ContentDelta {
                text,
                step: step.as_ref().map(RawIndex::parse).transpose()?,
            },
            WireFrame::FileReady { doc_type } => PipelineEvent::ArtifactReady { key: doc_type },
            WireFrame::FigureReady { index, total } => PipelineEvent::FigureReady { index, total },
            WireFrame::Log { message } => PipelineEvent::Log {
                message,
                received_at,
            },
            WireFrame::Error { message } => PipelineEvent::TerminalFailure {
                message,
                origin: FailureOrigin::Remote,
            },
            WireFrame::Done {
                status: DoneStatus::Completed,
                files,
                figures,
                ..
            } => PipelineEvent::TerminalSuccess {
                artifacts: files.unwrap_or_default(),
                figure_count: figures.unwrap_or(0),
            },
            WireFrame::Done {
                status: DoneStatus::Failed,
                error,
                ..
            } => PipelineEvent::TerminalFailure {
                message: error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                origin: FailureOrigin::Remote,
            },
        };
        Ok(event)
    }
}

/// Decode one SSE data payload straight into a pipeline event
pub fn decode_frame(data: &str, received_at: DateTime<Utc>) -> Result<PipelineEvent> {
    WireFrame::parse(data)?.into_event(received_at)
}
