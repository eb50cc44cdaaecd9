//! Probe module for request round-trip measurement.
//!
//! A probe times one application-layer request against an endpoint. This is
//! request RTT, not ICMP ping: it includes connection setup, TLS and server
//! handling time.

mod http;

pub use http::*;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected probe failure: {0}")]
    Unknown(String),
}

impl ProbeError {
    /// Timeouts and transport failures are normal operating conditions for a
    /// latency probe; anything else indicates an unhandled condition.
    pub fn is_expected(&self) -> bool {
        matches!(self, ProbeError::Timeout(_) | ProbeError::Network(_))
    }
}

/// Probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// A single latency measurement against a URL.
///
/// Implementations must not retry internally and must enforce their own
/// deadline; dropping the returned future cancels the measurement.
pub trait Probe: Send + Sync + 'static {
    /// Returns the elapsed round-trip time in whole milliseconds.
    fn measure(&self, url: &str) -> impl Future<Output = Result<u64, ProbeError>> + Send;
}

/// Round an elapsed duration to the nearest millisecond.
pub fn round_to_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
