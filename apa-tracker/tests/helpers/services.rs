//! Mock submission and artifact services

use apa_tracker::{ArtifactFetcher, Result, SubmissionRequest, SubmissionService, TrackerError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct MockSubmitter {
    acknowledged: bool,
    /// Task id to hand out, or the failure message
    outcome: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl MockSubmitter {
    pub fn accepting(task_id: &str) -> Self {
        Self {
            acknowledged: true,
            outcome: Ok(task_id.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            acknowledged: true,
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn without_credential() -> Self {
        Self {
            acknowledged: false,
            ..Self::accepting("unused")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionService for MockSubmitter {
    fn credential_acknowledged(&self) -> bool {
        self.acknowledged
    }

    async fn submit(&self, _request: &SubmissionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(TrackerError::Submission)
    }
}

/// Serves fixed bytes per document key and figure index
#[derive(Default)]
pub struct MockFetcher {
    documents: HashMap<String, Vec<u8>>,
    figures: HashMap<u32, Vec<u8>>,
    broken: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, key: &str, bytes: &[u8]) -> Self {
        self.documents.insert(key.to_string(), bytes.to_vec());
        self
    }

    pub fn with_figure(mut self, index: u32, bytes: &[u8]) -> Self {
        self.figures.insert(index, bytes.to_vec());
        self
    }

    /// Requests for `key` fail with a 500
    pub fn with_broken(mut self, key: &str) -> Self {
        self.broken.insert(key.to_string());
        self
    }

    /// Requested items as `doc:<key>` / `fig:<index>`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch_document(&self, _task_id: &str, key: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(format!("doc:{}", key));
        if self.broken.contains(key) {
            return Err(TrackerError::Http {
                status: 500,
                body: "generation error".to_string(),
            });
        }
        self.documents.get(key).cloned().ok_or(TrackerError::Http {
            status: 404,
            body: format!("{} not found", key),
        })
    }

    async fn fetch_figure(&self, _task_id: &str, index: u32) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(format!("fig:{}", index));
        self.figures.get(&index).cloned().ok_or(TrackerError::Http {
            status: 404,
            body: format!("figure {} not found", index),
        })
    }
}
