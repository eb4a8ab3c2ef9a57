//! Incremental `text/event-stream` decoder
//!
//! Accepts arbitrary byte chunks and yields the `data` payload of each
//! completed event. Lines are terminated by `\n` or `\r\n`. Comment lines
//! (`:` prefix, sent as heartbeats) and the `event`, `id` and `retry` fields
//! are ignored. Multi-line data is joined with `\n`.

/// Stateful SSE line decoder for one connection
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, not yet terminated line
    partial_line: Vec<u8>,
    /// Data lines of the event being assembled
    data_lines: Vec<String>,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns data payloads of events completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut completed = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.partial_line.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let mut line = std::mem::take(&mut self.partial_line);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            // Splitting on '\n' never cuts a multi-byte UTF-8 sequence
            let line = String::from_utf8_lossy(&line);
            self.process_line(&line, &mut completed);
        }

        self.partial_line.extend_from_slice(rest);
        completed
    }

    /// Discard any unterminated event at end of stream
    pub fn finish(&mut self) -> usize {
        let discarded = usize::from(self.has_data) + usize::from(!self.partial_line.is_empty());
        self.partial_line.clear();
        self.data_lines.clear();
        self.has_data = false;
        discarded
    }

    fn process_line(&mut self, line: &str, completed: &mut Vec<String>) {
        if line.is_empty() {
            if self.has_data {
                completed.push(self.data_lines.join("\n"));
            }
            self.data_lines.clear();
            self.has_data = false;
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            self.data_lines.push(value.to_string());
            self.has_data = true;
        }
    }
}
