//! HTTP client for the patent service API

use super::{ArtifactFetcher, DocumentUpload, SubmissionRequest, SubmissionService, TaskStatus};
use crate::error::{Result, TrackerError};
use crate::stream::HttpTransport;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("apa-tracker/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct ConfigPayload<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    task_id: String,
}

/// Client for the non-streaming endpoints
pub struct ApiClient {
    http_client: reqwest::Client,
    api_base: String,
    credential_acknowledged: AtomicBool,
}

impl ApiClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.into(),
            credential_acknowledged: AtomicBool::new(false),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Stream transport against the same service
    pub fn event_transport(&self) -> Result<HttpTransport> {
        HttpTransport::new(self.api_base.clone())
    }

    /// Hand the credential to the service
    ///
    /// The key is sent once and kept nowhere locally.
    pub async fn configure_credential(&self, api_key: &str) -> Result<()> {
        if api_key.trim().is_empty() {
            return Err(TrackerError::Rejected("credential is empty".to_string()));
        }

        let url = format!("{}/config", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .json(&ConfigPayload { api_key })
            .send()
            .await?;
        check_status(response).await?;

        self.credential_acknowledged.store(true, Ordering::SeqCst);
        info!("Credential acknowledged by service");
        Ok(())
    }

    pub async fn status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = format!("{}/status/{}", self.api_base, task_id);
        let response = self.http_client.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<TaskStatus>().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching artifact");
        let response = self.http_client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SubmissionService for ApiClient {
    fn credential_acknowledged(&self) -> bool {
        self.credential_acknowledged.load(Ordering::SeqCst)
    }

    async fn submit(&self, request: &SubmissionRequest) -> Result<String> {
        let primary = request
            .primary
            .as_ref()
            .ok_or_else(|| TrackerError::Rejected("primary document is required".to_string()))?;

        let mut form = Form::new().part("file", file_part(primary));
        for (field, sample) in request.samples() {
            form = form.part(field, file_part(sample));
        }

        let url = format!("{}/upload", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TrackerError::Submission(e.to_string()))?;

        let response = check_status(response)
            .await
            .map_err(|e| TrackerError::Submission(e.to_string()))?;

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::Submission(format!("invalid upload response: {}", e)))?;

        info!(task_id = %upload.task_id, file = %primary.file_name, "Submission accepted");
        Ok(upload.task_id)
    }
}

#[async_trait]
impl ArtifactFetcher for ApiClient {
    async fn fetch_document(&self, task_id: &str, key: &str) -> Result<Vec<u8>> {
        self.get_bytes(&format!("{}/download/{}/{}", self.api_base, task_id, key))
            .await
    }

    async fn fetch_figure(&self, task_id: &str, index: u32) -> Result<Vec<u8>> {
        self.get_bytes(&format!("{}/image/{}/{}", self.api_base, task_id, index))
            .await
    }
}

fn file_part(doc: &DocumentUpload) -> Part {
    Part::bytes(doc.bytes.clone()).file_name(doc.file_name.clone())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::Http {
        status: status.as_u16(),
        body,
    })
}
