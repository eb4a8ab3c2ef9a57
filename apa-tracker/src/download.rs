//! Artifact download workflow
//!
//! Turns a completed session's artifact registry into a list of files to
//! fetch, then fetches them into an output directory. One failed item never
//! aborts the rest.

use crate::api::ArtifactFetcher;
use crate::error::Result;
use crate::reducer::PipelineState;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Known document type with its local file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentKind {
    pub key: &'static str,
    pub file_name: &'static str,
    pub title: &'static str,
}

/// Known documents in display order
pub const DOCUMENT_CATALOG: [DocumentKind; 4] = [
    DocumentKind {
        key: "specification",
        file_name: "specification.docx",
        title: "Specification",
    },
    DocumentKind {
        key: "claims",
        file_name: "claims.docx",
        title: "Claims",
    },
    DocumentKind {
        key: "abstract",
        file_name: "abstract.docx",
        title: "Abstract",
    },
    DocumentKind {
        key: "visual_prompts",
        file_name: "visual_prompts.txt",
        title: "Figure prompts",
    },
];

pub fn document_kind(key: &str) -> Option<&'static DocumentKind> {
    DOCUMENT_CATALOG.iter().find(|kind| kind.key == key)
}

/// Local file name for a document key; unknown keys become `<key>.docx`
pub fn document_file_name(key: &str) -> String {
    match document_kind(key) {
        Some(kind) => kind.file_name.to_string(),
        None => format!("{}.docx", key),
    }
}

/// Local file name for zero-based figure `index` (numbered from 1)
pub fn figure_file_name(index: u32) -> String {
    format!("figure_{}.png", u64::from(index) + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadItem {
    Document { key: String, file_name: String },
    Figure { index: u32, file_name: String },
}

impl DownloadItem {
    pub fn document(key: &str) -> Self {
        DownloadItem::Document {
            key: key.to_string(),
            file_name: document_file_name(key),
        }
    }

    pub fn figure(index: u32) -> Self {
        DownloadItem::Figure {
            index,
            file_name: figure_file_name(index),
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            DownloadItem::Document { file_name, .. } | DownloadItem::Figure { file_name, .. } => {
                file_name
            }
        }
    }

    async fn fetch(&self, fetcher: &dyn ArtifactFetcher, task_id: &str) -> Result<Vec<u8>> {
        match self {
            DownloadItem::Document { key, .. } => fetcher.fetch_document(task_id, key).await,
            DownloadItem::Figure { index, .. } => fetcher.fetch_figure(task_id, *index).await,
        }
    }
}

/// Everything ready for download in one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    task_id: String,
    items: Vec<DownloadItem>,
}

impl DownloadPlan {
    /// Ready documents (catalog order, then unknown keys sorted) followed by
    /// figures `0..figure_count`
    pub fn from_state(task_id: impl Into<String>, state: &PipelineState) -> Self {
        let artifacts = state.artifacts();
        let mut items: Vec<DownloadItem> = DOCUMENT_CATALOG
            .iter()
            .filter(|kind| artifacts.is_ready(kind.key))
            .map(|kind| DownloadItem::document(kind.key))
            .collect();

        // BTreeMap keys are already sorted
        items.extend(
            artifacts
                .keys()
                .filter(|key| document_kind(key).is_none())
                .map(DownloadItem::document),
        );
        items.extend((0..artifacts.figure_count()).map(DownloadItem::figure));

        Self {
            task_id: task_id.into(),
            items,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn items(&self) -> &[DownloadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of [`download_all`]
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<PathBuf>,
    /// `(file name, error message)` per failed item
    pub failures: Vec<(String, String)>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch every planned item into `out_dir`
///
/// Fails only if `out_dir` cannot be created; per-item errors land in the
/// report.
pub async fn download_all(
    fetcher: &dyn ArtifactFetcher,
    plan: &DownloadPlan,
    out_dir: &Path,
) -> Result<DownloadReport> {
    tokio::fs::create_dir_all(out_dir).await?;

    let mut report = DownloadReport::default();
    for item in plan.items() {
        let path = out_dir.join(item.file_name());
        let result = match item.fetch(fetcher, plan.task_id()).await {
            Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(Into::into),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(path = %path.display(), "Saved artifact");
                report.saved.push(path);
            }
            Err(e) => {
                warn!(file = %item.file_name(), error = %e, "Artifact download failed");
                report
                    .failures
                    .push((item.file_name().to_string(), e.to_string()));
            }
        }
    }

    Ok(report)
}
