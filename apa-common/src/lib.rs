//! # APA Common Library
//!
//! Shared code for the Auto-Patent Architect client components:
//! - Wire frame definitions for the generation event stream
//! - Typed pipeline events and the tracker EventBus
//! - Step and log data types
//! - Configuration loading
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
