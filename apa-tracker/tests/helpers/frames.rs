//! Builders for SSE-framed service messages

use serde_json::{json, Value};

/// `data: <json>\n\n`
pub fn sse(frame: Value) -> Vec<u8> {
    format!("data: {}\n\n", frame).into_bytes()
}

pub fn heartbeat() -> Vec<u8> {
    b": heartbeat\n\n".to_vec()
}

pub fn step(index: usize, label: &str) -> Vec<u8> {
    sse(json!({"type": "step", "step": index.to_string(), "label": label}))
}

pub fn content(text: &str) -> Vec<u8> {
    sse(json!({"type": "content", "text": text}))
}

pub fn file_ready(doc_type: &str) -> Vec<u8> {
    sse(json!({"type": "file_ready", "doc_type": doc_type}))
}

pub fn figure_ready(index: u32) -> Vec<u8> {
    sse(json!({"type": "figure_ready", "index": index}))
}

pub fn log(message: &str) -> Vec<u8> {
    sse(json!({"type": "log", "message": message}))
}

pub fn error(message: &str) -> Vec<u8> {
    sse(json!({"type": "error", "message": message}))
}

pub fn done_completed(files: &[(&str, &str)], figures: u32) -> Vec<u8> {
    let files: serde_json::Map<String, Value> = files
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    sse(json!({
        "type": "done",
        "status": "completed",
        "files": files,
        "figures": figures,
        "error": ""
    }))
}

pub fn done_failed(error: &str) -> Vec<u8> {
    sse(json!({
        "type": "done",
        "status": "failed",
        "files": {},
        "figures": 0,
        "error": error
    }))
}

/// Concatenate frames into one body
pub fn body(frames: &[Vec<u8>]) -> Vec<u8> {
    frames.concat()
}
