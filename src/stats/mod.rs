//! Streaming latency statistics.
//!
//! The [`Accumulator`] folds probe outcomes into a running [`Stats`] record
//! and keeps the most recent successful samples in a bounded [`History`].
//! Averages cover every outcome since the last reset, not just the visible
//! window.

mod history;

pub use history::*;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::probe::ProbeError;

/// Exponential smoothing weights for displayed jitter: previous value, new deviation.
const JITTER_KEEP: f64 = 0.7;
const JITTER_GAIN: f64 = 0.3;

/// Why a probe produced no latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Network,
    Unknown,
}

impl From<&ProbeError> for FailureKind {
    fn from(e: &ProbeError) -> Self {
        match e {
            ProbeError::Timeout(_) => FailureKind::Timeout,
            ProbeError::Network(_) => FailureKind::Network,
            ProbeError::Unknown(_) => FailureKind::Unknown,
        }
    }
}

/// Result of one probe, as seen by the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success(u64),
    Failure(FailureKind),
}

impl From<&Result<u64, ProbeError>> for Outcome {
    fn from(result: &Result<u64, ProbeError>) -> Self {
        match result {
            Ok(ms) => Outcome::Success(*ms),
            Err(e) => Outcome::Failure(e.into()),
        }
    }
}

/// Aggregate statistics since the last reset.
///
/// `min`, `max`, `avg` and `jitter` stay at zero and `current` stays `None`
/// until the first success.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Stats {
    pub current: Option<u64>,
    pub min: u64,
    pub max: u64,
    pub avg: u64,
    pub jitter: u64,
    /// Percentage of failed probes, 0..=100.
    pub packet_loss: f64,
    pub total_pings: u64,
    pub failed_pings: u64,
}

impl Stats {
    fn recompute_loss(&mut self) {
        self.packet_loss = if self.total_pings == 0 {
            0.0
        } else {
            100.0 * self.failed_pings as f64 / self.total_pings as f64
        };
    }
}

/// Coarse quality bucket for the current latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyGrade {
    Unknown,
    Good,
    Fair,
    Poor,
}

impl LatencyGrade {
    pub fn from_latency(latency_ms: Option<u64>) -> Self {
        match latency_ms {
            None => LatencyGrade::Unknown,
            Some(ms) if ms < 50 => LatencyGrade::Good,
            Some(ms) if ms < 100 => LatencyGrade::Fair,
            Some(_) => LatencyGrade::Poor,
        }
    }
}

/// Incremental statistics over a stream of probe outcomes.
#[derive(Debug, Clone)]
pub struct Accumulator {
    stats: Stats,
    history: History,
    next_sequence: u64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_CAPACITY)
    }
}

impl Accumulator {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            stats: Stats::default(),
            history: History::new(history_capacity),
            next_sequence: 1,
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Fold one outcome in and return the new snapshot.
    pub fn update(&mut self, outcome: Outcome) -> Stats {
        self.update_at(outcome, Utc::now())
    }

    /// Like [`update`](Self::update) with an explicit sample timestamp.
    pub fn update_at(&mut self, outcome: Outcome, at: DateTime<Utc>) -> Stats {
        match outcome {
            Outcome::Success(ms) => self.record_success(ms, at),
            Outcome::Failure(_) => self.record_failure(),
        }
        self.stats
    }

    /// Back to the zero state with an empty history.
    pub fn reset(&mut self) -> Stats {
        self.stats = Stats::default();
        self.history.clear();
        self.next_sequence = 1;
        self.stats
    }

    fn record_success(&mut self, ms: u64, at: DateTime<Utc>) {
        let s = &mut self.stats;
        let total_before = s.total_pings;
        s.total_pings += 1;

        match s.current {
            None => {
                s.min = ms;
                s.max = ms;
                s.jitter = 0;
            }
            Some(previous) => {
                s.min = s.min.min(ms);
                s.max = s.max.max(ms);
                let deviation = ms.abs_diff(previous) as f64;
                s.jitter = (s.jitter as f64 * JITTER_KEEP + deviation * JITTER_GAIN).round() as u64;
            }
        }

        s.avg = ((s.avg as f64 * total_before as f64 + ms as f64) / s.total_pings as f64).round()
            as u64;
        s.current = Some(ms);
        s.recompute_loss();

        self.history.push(Sample::new(self.next_sequence, at, ms));
        self.next_sequence += 1;
    }

    fn record_failure(&mut self) {
        let s = &mut self.stats;
        s.total_pings += 1;
        s.failed_pings += 1;
        s.recompute_loss();
    }
}
