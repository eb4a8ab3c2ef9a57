//! Artifact registry
//!
//! Tracks which named documents and indexed figures are confirmed ready.
//! Entries are only added or overwritten; nothing is removed short of a full
//! session reset. The figure count never decreases while events accumulate,
//! which keeps it correct under reordered or duplicated `figure_ready` frames.

use std::collections::BTreeMap;

/// Readiness of documents (by type key) and figures (by count)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRegistry {
    documents: BTreeMap<String, String>,
    figure_count: u32,
    figures_expected: Option<u32>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark document `key` ready with a reference value
    ///
    /// Idempotent; a repeated key overwrites (last write wins). Returns `true`
    /// if the key was not ready before.
    pub fn mark_ready(&mut self, key: impl Into<String>, reference: impl Into<String>) -> bool {
        self.documents.insert(key.into(), reference.into()).is_none()
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    /// Reference recorded for `key`, if ready
    pub fn get(&self, key: &str) -> Option<&str> {
        self.documents.get(key).map(String::as_str)
    }

    /// Ready document keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn documents(&self) -> &BTreeMap<String, String> {
        &self.documents
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Record figure `index` as ready: count becomes `max(count, index + 1)`
    pub fn record_figure(&mut self, index: u32, total: Option<u32>) {
        self.figure_count = self.figure_count.max(index.saturating_add(1));
        if let Some(total) = total {
            self.figures_expected = Some(total);
        }
    }

    pub fn figure_count(&self) -> u32 {
        self.figure_count
    }

    /// Figure total announced by the service, if any
    pub fn figures_expected(&self) -> Option<u32> {
        self.figures_expected
    }

    pub fn is_figure_ready(&self, index: u32) -> bool {
        index < self.figure_count
    }

    /// Overwrite everything with authoritative final values
    pub fn replace_all(&mut self, documents: BTreeMap<String, String>, figure_count: u32) {
        self.documents = documents;
        self.figure_count = figure_count;
        self.figures_expected = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
