//! Event stream client
//!
//! Opens the per-task event stream, decodes frames into [`PipelineEvent`]s
//! and hands them to the session in arrival order over a bounded channel.
//!
//! Guarantees:
//! - At most one open stream per task id.
//! - No events are delivered after a terminal event or after `close()`.
//! - A connection that fails, ends, or stays silent past the idle timeout
//!   before a terminal event is reported as a local `TerminalFailure`, so a
//!   session never waits forever.

mod sse;
mod transport;

pub use sse::SseDecoder;
pub use transport::{ByteStream, EventTransport, HttpTransport};

use crate::error::{Result, TrackerError};
use apa_common::config::StreamConfig;
use apa_common::events::{decode_frame, PipelineEvent};
use apa_common::time;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type OpenStreams = Arc<Mutex<HashSet<String>>>;

fn lock(open: &OpenStreams) -> MutexGuard<'_, HashSet<String>> {
    open.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opens event streams over a transport
#[derive(Clone)]
pub struct EventStreamClient {
    transport: Arc<dyn EventTransport>,
    idle_timeout: Duration,
    channel_capacity: usize,
    open_streams: OpenStreams,
}

impl EventStreamClient {
    pub fn new(transport: Arc<dyn EventTransport>, config: &StreamConfig) -> Self {
        Self {
            transport,
            idle_timeout: config.idle_timeout(),
            channel_capacity: config.channel_capacity.max(1),
            open_streams: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Open the stream for `task_id`
    ///
    /// Connection happens on a spawned reader task; a failure to connect
    /// arrives as a local `TerminalFailure` event. Must be called inside a
    /// tokio runtime.
    pub fn open(&self, task_id: &str) -> Result<StreamHandle> {
        if !lock(&self.open_streams).insert(task_id.to_string()) {
            return Err(TrackerError::StreamAlreadyOpen(task_id.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();

        let reader = StreamReader {
            transport: Arc::clone(&self.transport),
            task_id: task_id.to_string(),
            idle_timeout: self.idle_timeout,
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(reader.run());

        info!(task_id = %task_id, "Event stream opened");

        Ok(StreamHandle {
            task_id: task_id.to_string(),
            events: rx,
            cancel,
            open_streams: Arc::clone(&self.open_streams),
            closed: false,
        })
    }

    /// Whether a stream for `task_id` is currently open
    pub fn is_open(&self, task_id: &str) -> bool {
        lock(&self.open_streams).contains(task_id)
    }
}

/// Consumer side of one open stream
///
/// Dropping the handle closes the stream.
pub struct StreamHandle {
    task_id: String,
    events: mpsc::Receiver<PipelineEvent>,
    cancel: CancellationToken,
    open_streams: OpenStreams,
    closed: bool,
}

impl StreamHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Next event in arrival order; `None` once closed or exhausted
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    /// Stop the reader and discard undelivered events. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        self.events.close();
        lock(&self.open_streams).remove(&self.task_id);
        debug!(task_id = %self.task_id, "Event stream closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

enum ReadOutcome {
    /// A terminal event was delivered
    Finished,
    /// Closed by the consumer
    Cancelled,
    /// Ended without a terminal event
    Failed(String),
}

struct StreamReader {
    transport: Arc<dyn EventTransport>,
    task_id: String,
    idle_timeout: Duration,
    tx: mpsc::Sender<PipelineEvent>,
    cancel: CancellationToken,
}

impl StreamReader {
    async fn run(self) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => ReadOutcome::Cancelled,
            outcome = self.read() => outcome,
        };

        match outcome {
            ReadOutcome::Finished => {
                debug!(task_id = %self.task_id, "Event stream finished");
            }
            ReadOutcome::Cancelled => {
                debug!(task_id = %self.task_id, "Event stream reader stopped");
            }
            ReadOutcome::Failed(reason) => {
                warn!(task_id = %self.task_id, reason = %reason, "Event stream failed");
                // Receiver may already be gone; nothing left to notify then
                let _ = self.tx.send(PipelineEvent::local_failure(reason)).await;
            }
        }
    }

    async fn read(&self) -> ReadOutcome {
        let idle_secs = self.idle_timeout.as_secs();

        let mut stream = match timeout(self.idle_timeout, self.transport.connect(&self.task_id)).await {
            Err(_) => {
                return ReadOutcome::Failed(format!(
                    "event stream did not respond within {}s",
                    idle_secs
                ))
            }
            Ok(Err(e)) => return ReadOutcome::Failed(format!("event stream connection failed: {}", e)),
            Ok(Ok(stream)) => stream,
        };

        let mut decoder = SseDecoder::new();
        loop {
            // Heartbeat comments arrive as chunks too, so any chunk resets the timer
            let chunk = match timeout(self.idle_timeout, stream.next()).await {
                Err(_) => {
                    return ReadOutcome::Failed(format!(
                        "no activity on event stream for {}s",
                        idle_secs
                    ))
                }
                Ok(None) => {
                    if decoder.finish() > 0 {
                        debug!(task_id = %self.task_id, "Discarded unterminated frame at end of stream");
                    }
                    return ReadOutcome::Failed(
                        "event stream ended before the task finished".to_string(),
                    );
                }
                Ok(Some(Err(e))) => {
                    return ReadOutcome::Failed(format!("event stream interrupted: {}", e))
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            for data in decoder.feed(&chunk) {
                let event = match decode_frame(&data, time::now()) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(task_id = %self.task_id, error = %e, "Skipping malformed frame");
                        continue;
                    }
                };

                let terminal = event.is_terminal();
                if self.tx.send(event).await.is_err() {
                    return ReadOutcome::Cancelled;
                }
                if terminal {
                    return ReadOutcome::Finished;
                }
            }
        }
    }
}
