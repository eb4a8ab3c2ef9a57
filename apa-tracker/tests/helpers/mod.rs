//! Test Helper Utilities
//!
//! Shared fixtures for apa-tracker integration tests

#![allow(dead_code)]

pub mod frames;
pub mod mock_service;
pub mod services;
pub mod transport;

pub use services::{MockFetcher, MockSubmitter};
pub use transport::{ChannelFeed, ScriptedTransport};

use apa_common::config::StreamConfig;
use apa_common::events::EventBus;
use apa_tracker::{
    DocumentUpload, EventStreamClient, SessionSettings, SubmissionRequest, TaskSession,
};
use std::sync::Arc;

pub const TEST_STEPS: [&str; 3] = ["Parse", "Draft", "Claims"];

pub fn stream_config(idle_timeout_secs: u64) -> StreamConfig {
    StreamConfig {
        idle_timeout_secs,
        channel_capacity: 16,
    }
}

pub fn paper() -> SubmissionRequest {
    SubmissionRequest::new(DocumentUpload::new("paper.pdf", b"%PDF-1.4 test".to_vec()))
}

/// Session wired to in-memory collaborators
pub fn create_test_session(
    transport: Arc<ScriptedTransport>,
    submitter: Arc<MockSubmitter>,
    fetcher: Arc<MockFetcher>,
) -> TaskSession {
    let settings = SessionSettings {
        step_labels: TEST_STEPS.iter().map(|s| s.to_string()).collect(),
        max_log_entries: None,
    };
    TaskSession::new(
        settings,
        submitter,
        fetcher,
        EventStreamClient::new(transport, &stream_config(60)),
        EventBus::new(64),
    )
}
