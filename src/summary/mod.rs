//! Natural-language assessment of a stats snapshot.
//!
//! The [`Analyzer`] owns the contract around an external text generator:
//! it never calls the generator with too little data, answers synchronously
//! when no generator is configured, and absorbs every generator error into a
//! fixed message.

mod gemini;

pub use gemini::*;

use std::future::Future;
use thiserror::Error;

use crate::stats::Stats;

/// Fewest total probes before a summary is attempted.
pub const MIN_PINGS_FOR_SUMMARY: u64 = 5;

pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Not enough data yet. Collect at least 5 measurements for an accurate analysis.";
pub const UNAVAILABLE_MESSAGE: &str =
    "Analysis is unavailable: no API key is configured.";
pub const FAILED_MESSAGE: &str = "An error occurred while analyzing the connection.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "The analysis service could not assess this data.";

/// Summary backend error types.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("backend returned no text")]
    EmptyResponse,
}

/// An external text generator.
pub trait SummaryGenerator: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, SummaryError>> + Send;
}

/// Wraps an optional generator with deterministic fallbacks.
pub struct Analyzer<G> {
    generator: Option<G>,
}

impl<G: SummaryGenerator> Analyzer<G> {
    pub fn new(generator: Option<G>) -> Self {
        Self { generator }
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    /// Describe `stats` for `target_name`. Never fails.
    pub async fn summarize(&self, stats: &Stats, target_name: &str) -> String {
        if stats.total_pings < MIN_PINGS_FOR_SUMMARY {
            return INSUFFICIENT_DATA_MESSAGE.to_string();
        }

        let Some(generator) = &self.generator else {
            return UNAVAILABLE_MESSAGE.to_string();
        };

        match generator.generate(&build_prompt(stats, target_name)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(SummaryError::EmptyResponse) => EMPTY_RESPONSE_MESSAGE.to_string(),
            Err(e) => {
                tracing::error!("Summary generation failed for {}: {}", target_name, e);
                FAILED_MESSAGE.to_string()
            }
        }
    }
}

/// Prompt handed to the generator.
pub fn build_prompt(stats: &Stats, target_name: &str) -> String {
    format!(
        "Act as a network engineer. Analyze the following request round-trip statistics \
         for a connection to server \"{}\". These are application-layer request times, \
         not ICMP ping. Give a concise assessment of the connection quality for:\n\
         1. Online gaming\n\
         2. Video streaming\n\
         3. Web browsing\n\n\
         Stats:\n\
         - Average latency: {} ms\n\
         - Jitter: {} ms\n\
         - Packet loss: {:.1}%\n\
         - Min/Max: {}/{} ms\n\n\
         Keep the response short (under 100 words), helpful and direct.",
        target_name, stats.avg, stats.jitter, stats.packet_loss, stats.min, stats.max
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeGenerator {
        reply: fn() -> Result<String, SummaryError>,
        calls: Arc<AtomicUsize>,
    }

    impl SummaryGenerator for FakeGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn with_reply(reply: fn() -> Result<String, SummaryError>) -> (Analyzer<FakeGenerator>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = FakeGenerator {
            reply,
            calls: calls.clone(),
        };
        (Analyzer::new(Some(generator)), calls)
    }

    fn stats_with_pings(total: u64) -> Stats {
        Stats {
            current: Some(30),
            min: 20,
            max: 45,
            avg: 30,
            jitter: 4,
            packet_loss: 0.0,
            total_pings: total,
            failed_pings: 0,
        }
    }

    #[tokio::test]
    async fn test_insufficient_data_skips_generator() {
        let (analyzer, calls) = with_reply(|| Ok("fine".to_string()));
        let text = analyzer.summarize(&stats_with_pings(4), "Cloudflare").await;
        assert_eq!(text, INSUFFICIENT_DATA_MESSAGE);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_without_generator() {
        let analyzer: Analyzer<FakeGenerator> = Analyzer::new(None);
        assert!(!analyzer.is_available());
        let text = analyzer.summarize(&stats_with_pings(10), "Cloudflare").await;
        assert_eq!(text, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_generator_text_is_returned() {
        let (analyzer, calls) = with_reply(|| Ok("Great for gaming.".to_string()));
        let text = analyzer.summarize(&stats_with_pings(5), "Google").await;
        assert_eq!(text, "Great for gaming.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_absorbed() {
        let (analyzer, _) = with_reply(|| Err(SummaryError::Request("connection reset".into())));
        let text = analyzer.summarize(&stats_with_pings(8), "Google").await;
        assert_eq!(text, FAILED_MESSAGE);

        let (analyzer, _) = with_reply(|| Ok("   ".to_string()));
        let text = analyzer.summarize(&stats_with_pings(8), "Google").await;
        assert_eq!(text, EMPTY_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_prompt_contents() {
        let mut stats = stats_with_pings(10);
        stats.packet_loss = 100.0 / 3.0;
        let prompt = build_prompt(&stats, "Example");
        assert!(prompt.contains("\"Example\""));
        assert!(prompt.contains("Average latency: 30 ms"));
        assert!(prompt.contains("Packet loss: 33.3%"));
        assert!(prompt.contains("Min/Max: 20/45 ms"));
    }
}
