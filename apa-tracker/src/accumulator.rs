//! Content accumulator for streaming step text
//!
//! Buffers `content` deltas for the step currently processing. The buffer is
//! cleared synchronously when a new step starts, so it always equals the
//! arrival-order concatenation of deltas received since the latest step start.

/// Append-only text buffer scoped to one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentAccumulator {
    step: Option<usize>,
    buffer: String,
}

impl ContentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the buffer to a newly started step, discarding previous text
    pub fn begin_step(&mut self, index: usize) {
        self.step = Some(index);
        self.buffer.clear();
    }

    /// Append a delta
    ///
    /// Dropped (returns `false`) when no step is active, or when `belongs_to`
    /// names a step other than the active one.
    pub fn append(&mut self, text: &str, belongs_to: Option<usize>) -> bool {
        match (self.step, belongs_to) {
            (None, _) => false,
            (Some(active), Some(step)) if active != step => false,
            (Some(_), _) => {
                self.buffer.push_str(text);
                true
            }
        }
    }

    /// Step the buffer belongs to
    pub fn step(&self) -> Option<usize> {
        self.step
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Full reset: no active step, empty buffer
    pub fn clear(&mut self) {
        self.step = None;
        self.buffer.clear();
    }
}
