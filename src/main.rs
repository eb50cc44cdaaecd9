//! rtt-monitor - request round-trip latency monitor
//!
//! Periodically times a lightweight HTTP request against a selected endpoint
//! and keeps live statistics (current/min/max/avg latency, jitter, loss) plus
//! a short history window. This measures application-layer request RTT, not
//! ICMP ping.

mod config;
mod probe;
mod registry;
mod scheduler;
mod stats;
mod summary;
mod web;

use config::MonitorConfig;
use probe::{HttpProbe, ProbeConfig};
use registry::TargetRegistry;
use scheduler::{Scheduler, SchedulerConfig};
use summary::{Analyzer, GeminiGenerator};
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("rtt_monitor=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();
    tracing::info!("Starting rtt-monitor on port {}...", cfg.http_port);
    tracing::info!(
        "Probe timeout {:?}, interval {:?}, history {} samples",
        cfg.probe_timeout,
        cfg.tick_interval,
        cfg.history_capacity
    );

    let registry = TargetRegistry::default();
    let target = registry
        .get_or_default(&cfg.target_id)
        .cloned()
        .ok_or("target registry is empty")?;

    let probe = Arc::new(HttpProbe::new(&ProbeConfig::new(cfg.probe_timeout))?);
    let scheduler = Arc::new(Scheduler::new(
        probe,
        registry,
        target,
        SchedulerConfig::from(&cfg),
    ));

    let generator = match &cfg.summary_api_key {
        Some(key) => Some(GeminiGenerator::new(key, &cfg.summary_model)?),
        None => None,
    };
    let analyzer = Arc::new(Analyzer::new(generator));
    if !analyzer.is_available() {
        tracing::info!("No summary API key configured, analysis disabled");
    }

    // Trace every snapshot change
    let mut updates = scheduler.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snap = updates.borrow_and_update().clone();
            tracing::debug!(
                "{:?} {}: current={:?} avg={} jitter={} loss={:.1}% ({} pings)",
                snap.state,
                snap.target.name,
                snap.stats.current,
                snap.stats.avg,
                snap.stats.jitter,
                snap.stats.packet_loss,
                snap.stats.total_pings
            );
        }
    });

    if cfg.autostart {
        scheduler.start().await;
    }

    // Start web server
    let server = Server::new(cfg, scheduler, analyzer);
    server.start().await?;

    Ok(())
}
