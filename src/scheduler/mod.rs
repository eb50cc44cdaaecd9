//! Scheduler module for driving probes and aggregating their outcomes.

use crate::config::{MonitorConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_TICK_INTERVAL};
use crate::probe::{Probe, ProbeError};
use crate::registry::{Target, TargetRegistry};
use crate::stats::{Accumulator, LatencyGrade, Outcome, Sample, Stats};

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};

/// Scheduler error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("unknown target: {0}")]
    UnknownTarget(String),
}

/// Lifecycle of a measurement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Stopped,
}

/// Everything a renderer needs, taken atomically.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: RunState,
    pub target: Target,
    pub stats: Stats,
    pub grade: LatencyGrade,
    pub history: Vec<Sample>,
}

/// Scheduler timing configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub history_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_TICK_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl From<&MonitorConfig> for SchedulerConfig {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            interval: cfg.tick_interval,
            history_capacity: cfg.history_capacity,
        }
    }
}

struct Session {
    state: RunState,
    target: Target,
    accumulator: Accumulator,
    /// Bumped whenever the running loop is replaced or cancelled. Outcomes
    /// carrying an older epoch are discarded.
    epoch: u64,
    stop_tx: Option<broadcast::Sender<()>>,
}

impl Session {
    fn snapshot(&self) -> Snapshot {
        let stats = self.accumulator.stats();
        Snapshot {
            state: self.state,
            target: self.target.clone(),
            stats,
            grade: LatencyGrade::from_latency(stats.current),
            history: self.accumulator.history().to_vec(),
        }
    }

    /// Stop the probe loop, if any. Idempotent.
    fn cancel_loop(&mut self) {
        self.epoch += 1;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Drives a [`Probe`] at a fixed cadence and folds every outcome into the
/// session statistics.
pub struct Scheduler<P: Probe> {
    probe: Arc<P>,
    registry: TargetRegistry,
    interval: Duration,
    session: Arc<Mutex<Session>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    /// Held outside the session lock so dropping the scheduler always ends
    /// any running loop.
    shutdown_tx: broadcast::Sender<()>,
}

impl<P: Probe> Scheduler<P> {
    /// Create an idle scheduler measuring `target`.
    pub fn new(probe: Arc<P>, registry: TargetRegistry, target: Target, config: SchedulerConfig) -> Self {
        let session = Session {
            state: RunState::Idle,
            target,
            accumulator: Accumulator::new(config.history_capacity),
            epoch: 0,
            stop_tx: None,
        };
        let (snapshot_tx, _) = watch::channel(session.snapshot());
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            probe,
            registry,
            interval: config.interval,
            session: Arc::new(Mutex::new(session)),
            snapshot_tx: Arc::new(snapshot_tx),
            shutdown_tx,
        }
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Begin or resume probing.
    ///
    /// From `Idle` this starts a fresh session; from `Stopped` it continues
    /// the existing one. Calling it while running does nothing.
    pub async fn start(&self) {
        let mut session = self.session.lock().await;

        match session.state {
            RunState::Running => {
                tracing::debug!("Scheduler: already running for {}", session.target.name);
                return;
            }
            RunState::Idle => {
                session.accumulator.reset();
            }
            RunState::Stopped => {}
        }

        session.cancel_loop();
        session.state = RunState::Running;

        let (stop_tx, stop_rx) = broadcast::channel(1);
        session.stop_tx = Some(stop_tx);

        let ctx = LoopContext {
            probe: self.probe.clone(),
            target: session.target.clone(),
            interval: self.interval,
            epoch: session.epoch,
            session: self.session.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
        };

        tracing::info!(
            "Scheduler: probing {} ({}) every {:?}",
            ctx.target.name,
            ctx.target.url,
            ctx.interval
        );

        tokio::spawn(run_probe_loop(ctx, stop_rx, self.shutdown_tx.subscribe()));

        self.publish(&session);
    }

    /// Pause probing. Accumulated data is kept.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;

        if session.state != RunState::Running {
            return;
        }

        session.cancel_loop();
        session.state = RunState::Stopped;
        tracing::info!("Scheduler: stopped probing {}", session.target.name);

        self.publish(&session);
    }

    /// Cancel any probing and return to `Idle` with empty statistics.
    pub async fn reset(&self) {
        let mut session = self.session.lock().await;

        session.cancel_loop();
        session.accumulator.reset();
        session.state = RunState::Idle;
        tracing::info!("Scheduler: reset session for {}", session.target.name);

        self.publish(&session);
    }

    /// Switch to another registry target. Forces a stop when running and
    /// always clears the session.
    pub async fn select_target(&self, id: &str) -> Result<Target, SchedulerError> {
        let target = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownTarget(id.to_string()))?;

        let mut session = self.session.lock().await;

        if session.state == RunState::Running {
            tracing::info!(
                "Scheduler: stopping {} before switching target",
                session.target.name
            );
        }

        session.cancel_loop();
        session.accumulator.reset();
        session.state = RunState::Idle;
        session.target = target.clone();
        tracing::info!("Scheduler: selected target {} ({})", target.name, target.region);

        self.publish(&session);
        Ok(target)
    }

    /// Current view of the session.
    pub async fn snapshot(&self) -> Snapshot {
        self.session.lock().await.snapshot()
    }

    /// Receive a new [`Snapshot`] after every outcome and transition.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self, session: &Session) {
        self.snapshot_tx.send_replace(session.snapshot());
    }
}

impl<P: Probe> Drop for Scheduler<P> {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

struct LoopContext<P: Probe> {
    probe: Arc<P>,
    target: Target,
    interval: Duration,
    epoch: u64,
    session: Arc<Mutex<Session>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
}

impl<P: Probe> LoopContext<P> {
    /// Apply an outcome unless the session moved on. Returns false when the
    /// loop is stale and should exit.
    async fn apply(&self, outcome: Outcome) -> bool {
        let mut session = self.session.lock().await;

        if session.epoch != self.epoch || session.state != RunState::Running {
            tracing::debug!(
                "Scheduler: discarding stale outcome {:?} for {}",
                outcome,
                self.target.name
            );
            return false;
        }

        session.accumulator.update(outcome);
        self.snapshot_tx.send_replace(session.snapshot());
        true
    }
}

/// Run the probe loop for a single session.
///
/// Ticks are serialized: the next probe is not issued until the previous one
/// finished or hit its deadline. The first tick fires immediately.
async fn run_probe_loop<P: Probe>(
    ctx: LoopContext<P>,
    mut stop_rx: broadcast::Receiver<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(ctx.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {}
        }

        // Dropping the probe future on stop releases the pending request.
        let result = tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            _ = shutdown_rx.recv() => break,
            result = ctx.probe.measure(&ctx.target.url) => result,
        };

        log_result(&ctx.target, &result);

        if !ctx.apply(Outcome::from(&result)).await {
            break;
        }
    }

    tracing::debug!("Scheduler: probe loop for {} exited", ctx.target.name);
}

fn log_result(target: &Target, result: &Result<u64, ProbeError>) {
    match result {
        Ok(ms) => tracing::debug!("Probe {}: {} ms", target.name, ms),
        Err(e) if e.is_expected() => tracing::debug!("Probe {}: {}", target.name, e),
        Err(e) => tracing::error!("Probe failed for {}: {}", target.name, e),
    }
}
