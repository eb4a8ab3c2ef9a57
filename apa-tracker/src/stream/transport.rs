//! Byte transport for the per-task event stream

use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("apa-tracker/", env!("CARGO_PKG_VERSION"));

/// Raw byte chunks as they arrive off the connection
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Source of the raw `text/event-stream` bytes for a task
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Connect to the stream for `task_id`
    async fn connect(&self, task_id: &str) -> Result<ByteStream>;
}

/// `GET {api_base}/stream/{task_id}` over HTTP
pub struct HttpTransport {
    http_client: reqwest::Client,
    api_base: String,
}

impl HttpTransport {
    /// No overall request timeout: the stream lives as long as the task.
    /// Stalls are caught by the stream client's idle timeout instead.
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.into(),
        })
    }

    pub fn stream_url(&self, task_id: &str) -> String {
        format!("{}/stream/{}", self.api_base, task_id)
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn connect(&self, task_id: &str) -> Result<ByteStream> {
        let url = self.stream_url(task_id);
        debug!(url = %url, "Connecting to event stream");

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TrackerError::from))
            .boxed())
    }
}
