//! In-memory event transports

use apa_tracker::stream::{ByteStream, EventTransport};
use apa_tracker::{Result, TrackerError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Script {
    /// Yield the chunks, then end the connection
    Chunks(Vec<Vec<u8>>),
    /// Yield the chunks, then stay silent forever
    ChunksThenSilence(Vec<Vec<u8>>),
    /// Refuse to connect
    ConnectError(String),
    /// Chunks pushed by the test through a [`ChannelFeed`]
    Channel,
}

/// Sender side of a [`Script::Channel`] connection
pub type ChannelFeed = mpsc::UnboundedSender<Vec<u8>>;

pub struct ScriptedTransport {
    script: Script,
    feed: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    connects: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            feed: Mutex::new(None),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(Script::Chunks(chunks))
    }

    /// Transport fed chunk by chunk from the test
    pub fn channel() -> (Self, ChannelFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self::new(Script::Channel);
        *transport.feed.lock().unwrap() = Some(rx);
        (transport, tx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn connect(&self, _task_id: &str) -> Result<ByteStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            Script::Chunks(chunks) => Ok(stream::iter(chunks.clone().into_iter().map(Ok)).boxed()),
            Script::ChunksThenSilence(chunks) => Ok(stream::iter(chunks.clone().into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            Script::ConnectError(message) => Err(TrackerError::Transport(message.clone())),
            Script::Channel => {
                let mut rx = self
                    .feed
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| TrackerError::Transport("feed already taken".to_string()))?;
                Ok(async_stream::stream! {
                    while let Some(chunk) = rx.recv().await {
                        yield Ok::<_, TrackerError>(chunk);
                    }
                }
                .boxed())
            }
        }
    }
}
