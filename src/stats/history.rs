//! Fixed-capacity sample window for display.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DEFAULT_HISTORY_CAPACITY;

/// One successful measurement. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub sequence_id: u64,
    pub timestamp: DateTime<Utc>,
    /// Chart axis label, `MM:SS`.
    pub label: String,
    pub latency_ms: u64,
}

impl Sample {
    pub fn new(sequence_id: u64, timestamp: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            sequence_id,
            timestamp,
            label: timestamp.format("%M:%S").to_string(),
            latency_ms,
        }
    }
}

/// Chronological window of the most recent samples.
///
/// Holds at most `capacity` entries; pushing onto a full window evicts the
/// oldest sample first.
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty window. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Copy of the window, oldest first.
    pub fn to_vec(&self) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.len());
        samples.extend(self.iter().cloned());
        samples
    }
}
