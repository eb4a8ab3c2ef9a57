//! apa-tracker - client-side tracker for patent generation tasks
//!
//! Submits documents to the patent service, follows the task's event stream
//! and folds every event into a [`PipelineState`] that renderers can read.

pub mod accumulator;
pub mod api;
pub mod artifacts;
pub mod download;
pub mod error;
pub mod log;
pub mod reducer;
pub mod session;
pub mod stream;

pub use api::{ApiClient, ArtifactFetcher, DocumentUpload, SubmissionRequest, SubmissionService};
pub use download::{download_all, DownloadItem, DownloadPlan, DownloadReport};
pub use error::{Result, TrackerError};
pub use reducer::{reduce, PipelineState};
pub use session::{SessionSettings, TaskSession};
pub use stream::{EventStreamClient, EventTransport, HttpTransport, StreamHandle};
