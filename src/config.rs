//! Configuration module for rtt-monitor.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default probe deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default cadence between probes while running.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);
/// Default number of samples kept in the history window.
pub const DEFAULT_HISTORY_CAPACITY: usize = 30;
/// Default model used by the summary backend.
pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-2.5-flash";

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Registry id of the initially selected target (default: "cloudflare")
    pub target_id: String,
    /// Probe deadline (default: 5000 ms)
    pub probe_timeout: Duration,
    /// Interval between probes (default: 2000 ms)
    pub tick_interval: Duration,
    /// History window capacity (default: 30)
    pub history_capacity: usize,
    /// Start probing immediately on boot (default: false)
    pub autostart: bool,
    /// Credential for the summary backend; `None` means unavailable
    pub summary_api_key: Option<String>,
    pub summary_model: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            target_id: "cloudflare".to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            autostart: false,
            summary_api_key: None,
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RTT_MONITOR_HTTP_PORT`: HTTP port (default: 8080)
    /// - `RTT_MONITOR_TARGET`: target id from the registry (default: "cloudflare")
    /// - `RTT_MONITOR_PROBE_TIMEOUT_MS`: probe timeout in ms (default: 5000)
    /// - `RTT_MONITOR_INTERVAL_MS`: tick interval in ms (default: 2000)
    /// - `RTT_MONITOR_HISTORY_CAPACITY`: samples kept for display (default: 30)
    /// - `RTT_MONITOR_AUTOSTART`: "1"/"true" to start probing on boot
    /// - `GEMINI_API_KEY` or `API_KEY`: summary backend credential
    /// - `RTT_MONITOR_SUMMARY_MODEL`: summary model name
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Invalid or zero values
    /// keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_nonzero::<u16>(lookup("RTT_MONITOR_HTTP_PORT")) {
            cfg.http_port = port;
        }

        if let Some(target) = lookup("RTT_MONITOR_TARGET").filter(|s| !s.trim().is_empty()) {
            cfg.target_id = target.trim().to_string();
        }

        if let Some(ms) = parse_nonzero::<u64>(lookup("RTT_MONITOR_PROBE_TIMEOUT_MS")) {
            cfg.probe_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_nonzero::<u64>(lookup("RTT_MONITOR_INTERVAL_MS")) {
            cfg.tick_interval = Duration::from_millis(ms);
        }

        if let Some(cap) = parse_nonzero::<usize>(lookup("RTT_MONITOR_HISTORY_CAPACITY")) {
            cfg.history_capacity = cap;
        }

        if let Some(flag) = lookup("RTT_MONITOR_AUTOSTART") {
            cfg.autostart = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        cfg.summary_api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|key| !key.trim().is_empty());

        if let Some(model) = lookup("RTT_MONITOR_SUMMARY_MODEL").filter(|s| !s.trim().is_empty()) {
            cfg.summary_model = model;
        }

        cfg
    }
}

fn parse_nonzero<T>(value: Option<String>) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v != T::default())
}
