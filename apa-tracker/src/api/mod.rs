//! Service API: request types and the collaborator seams used by the session

mod client;

pub use client::ApiClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Accepts a submission and returns the task id assigned by the service
#[async_trait]
pub trait SubmissionService: Send + Sync {
    /// Whether the service has acknowledged a credential
    fn credential_acknowledged(&self) -> bool;

    async fn submit(&self, request: &SubmissionRequest) -> Result<String>;
}

/// Retrieves finished artifacts for a task
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch_document(&self, task_id: &str, key: &str) -> Result<Vec<u8>>;

    async fn fetch_figure(&self, task_id: &str, index: u32) -> Result<Vec<u8>>;
}

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a document from disk, keeping its file name
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Primary paper plus optional style samples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub primary: Option<DocumentUpload>,
    pub spec_sample: Option<DocumentUpload>,
    pub claims_sample: Option<DocumentUpload>,
    pub abstract_sample: Option<DocumentUpload>,
}

impl SubmissionRequest {
    pub fn new(primary: DocumentUpload) -> Self {
        Self {
            primary: Some(primary),
            ..Self::default()
        }
    }

    /// Reference samples that were supplied, keyed by upload field name
    pub fn samples(&self) -> impl Iterator<Item = (&'static str, &DocumentUpload)> {
        [
            ("spec_sample", self.spec_sample.as_ref()),
            ("claims_sample", self.claims_sample.as_ref()),
            ("abstract_sample", self.abstract_sample.as_ref()),
        ]
        .into_iter()
        .filter_map(|(field, doc)| doc.map(|doc| (field, doc)))
    }
}

/// Snapshot returned by the status endpoint
///
/// Diagnostic only; session state is driven by the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub step_label: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub figures: u32,
}
