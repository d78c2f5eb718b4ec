//! Performance monitor.
//!
//! A fixed-interval sampler that publishes each snapshot into local state
//! and, while the connection is open, forwards it as a `performance`
//! envelope. Enable/disable is independent of the connection lifecycle:
//! samples stop flowing over the wire when disconnected but local
//! collection continues.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use livesync_core::model::{ConnectionStatus, PerformanceSnapshot};
use livesync_core::protocol::{Envelope, EnvelopeKind};

use crate::config::MonitorSection;
use crate::connection::ConnectionManager;
use crate::state::{Action, PerfAction, StateContainer};

/// Source of telemetry samples, injectable for tests.
pub trait PerfProbe: Send + Sync {
    fn sample(&self) -> PerformanceSnapshot;
}

/// Default probe: the embedding renderer records measurements, the
/// sampler publishes the latest one wholesale each tick.
#[derive(Default)]
pub struct LatestProbe {
    latest: RwLock<PerformanceSnapshot>,
}

impl LatestProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recent renderer-side measurements.
    pub fn record(&self, snapshot: PerformanceSnapshot) {
        if let Ok(mut l) = self.latest.write() {
            *l = snapshot;
        }
    }
}

impl PerfProbe for LatestProbe {
    fn sample(&self) -> PerformanceSnapshot {
        let mut snap = match self.latest.read() {
            Ok(l) => l.clone(),
            Err(p) => p.into_inner().clone(),
        };
        snap.last_updated = Utc::now();
        snap
    }
}

pub struct PerformanceMonitor {
    interval: Duration,
    container: Arc<StateContainer>,
    connection: Arc<ConnectionManager>,
    probe: Arc<dyn PerfProbe>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PerformanceMonitor {
    pub fn new(
        cfg: &MonitorSection,
        container: Arc<StateContainer>,
        connection: Arc<ConnectionManager>,
        probe: Arc<dyn PerfProbe>,
    ) -> Self {
        Self {
            interval: Duration::from_millis(cfg.sample_interval_ms),
            container,
            connection,
            probe,
            task: Mutex::new(None),
        }
    }

    /// Start the sampler; idempotent.
    pub fn enable(&self) {
        let mut task = match self.task.lock() {
            Ok(t) => t,
            Err(p) => p.into_inner(),
        };
        if task.is_some() {
            return;
        }

        let container = Arc::clone(&self.container);
        let connection = Arc::clone(&self.connection);
        let probe = Arc::clone(&self.probe);
        let period = self.interval;

        *task = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.tick().await; // the immediate first tick
            loop {
                tick.tick().await;
                let snap = probe.sample();
                container.dispatch(Action::Perf(PerfAction::Sampled(snap.clone())));

                if container.snapshot().connection.status == ConnectionStatus::Open {
                    match Envelope::with_payload(EnvelopeKind::Performance, &snap) {
                        Ok(env) => {
                            if let Err(e) = connection.send(env).await {
                                debug!(error = %e, "performance envelope not sent");
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to encode performance snapshot"),
                    }
                }
            }
        }));
        debug!(interval_ms = period.as_millis() as u64, "performance monitor enabled");
    }

    /// Stop the sampler; idempotent.
    pub fn disable(&self) {
        let handle = match self.task.lock() {
            Ok(mut t) => t.take(),
            Err(p) => p.into_inner().take(),
        };
        if let Some(h) = handle {
            h.abort();
            debug!("performance monitor disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self.task.lock() {
            Ok(t) => t.is_some(),
            Err(p) => p.into_inner().is_some(),
        }
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.disable();
    }
}
