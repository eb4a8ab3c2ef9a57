//! Session log book
//!
//! Append-only, ordered, session-scoped. Unbounded unless a capacity is
//! configured, in which case it behaves as a ring that evicts the oldest entry.

use apa_common::events::LogEntry;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
    evicted: u64,
}

impl SessionLog {
    /// `capacity` of `None` keeps every entry
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
            evicted: 0,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                self.entries.pop_front();
                self.evicted += 1;
            }
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped by the ring so far
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// `[HH:MM:SS] message` lines, oldest first
    pub fn display_lines(&self) -> Vec<String> {
        self.entries.iter().map(LogEntry::display_line).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }
}
