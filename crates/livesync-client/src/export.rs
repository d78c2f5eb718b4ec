//! Export orchestrator.
//!
//! Drives one export job at a time to a terminal state. Progress ticks
//! are generated locally in lieu of a real export backend; a remote
//! backend pushing `export` envelopes folds into the same job through
//! the reducer's monotone-progress guard.
//!
//! Cancellation is cooperative and local-only: the job carries an
//! explicit cancel handle, and `cancel_export` resets the local job
//! without any guarantee the remote operation stops.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use livesync_core::error::{Result, SyncError};
use livesync_core::model::{ExportOptions, ExportResult};
use livesync_core::protocol::{Envelope, EnvelopeKind};

use crate::config::ExportSection;
use crate::connection::ConnectionManager;
use crate::state::{Action, ExportAction, StateContainer};

pub struct ExportOrchestrator {
    cfg: ExportSection,
    container: Arc<StateContainer>,
    connection: Arc<ConnectionManager>,
    /// Cancel handle of the running job, if any.
    active: Mutex<Option<watch::Sender<bool>>>,
}

impl ExportOrchestrator {
    pub fn new(
        cfg: ExportSection,
        container: Arc<StateContainer>,
        connection: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            cfg,
            container,
            connection,
            active: Mutex::new(None),
        }
    }

    /// Run one export to completion.
    ///
    /// A second call while a job is running is rejected; there is no
    /// queueing of export requests.
    pub async fn export_portfolio(&self, options: ExportOptions) -> Result<ExportResult> {
        let mut cancel_rx = {
            let mut active = match self.active.lock() {
                Ok(a) => a,
                Err(p) => p.into_inner(),
            };
            if active.is_some() || self.container.snapshot().export.is_exporting() {
                return Err(SyncError::ExportInProgress);
            }
            let (tx, rx) = watch::channel(false);
            *active = Some(tx);
            rx
        };

        info!(kind = ?options.kind, quality = ?options.quality, "export started");
        self.container.dispatch(Action::Export(ExportAction::Started {
            kind: options.kind,
        }));

        // announce to the backend; queued for flush when offline
        match Envelope::with_payload(EnvelopeKind::Export, &options) {
            Ok(env) => {
                if let Err(e) = self.connection.send(env).await {
                    debug!(error = %e, "export announce not transmitted");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode export options"),
        }

        let step = self.cfg.progress_step;
        let mut tick = tokio::time::interval(Duration::from_millis(self.cfg.tick_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await; // the immediate first tick

        let mut progress: u8 = 0;
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    progress = progress.saturating_add(step).min(100);
                    self.container
                        .dispatch(Action::Export(ExportAction::Progress(progress)));
                    if progress >= 100 {
                        break;
                    }
                }
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        // cancel_export already reset the local job
                        debug!("export task observed cancellation");
                        self.clear_active();
                        return Err(SyncError::Cancelled);
                    }
                }
            }
        }

        let download_url = format!("/exports/{}.{}", Uuid::new_v4(), options.kind.extension());
        let result = ExportResult {
            download_url: download_url.clone(),
            file_size: estimated_size(&options),
            kind: options.kind,
        };
        self.container
            .dispatch(Action::Export(ExportAction::Succeeded { download_url }));
        self.clear_active();
        info!(url = %result.download_url, "export finished");
        Ok(result)
    }

    /// Immediately reset the local job and signal the running task.
    ///
    /// No-op when nothing is running.
    pub fn cancel_export(&self) {
        let handle = {
            let mut active = match self.active.lock() {
                Ok(a) => a,
                Err(p) => p.into_inner(),
            };
            active.take()
        };
        if let Some(tx) = handle {
            let _ = tx.send(true);
            self.container
                .dispatch(Action::Export(ExportAction::Cancelled));
            info!("export cancelled");
        }
    }

    fn clear_active(&self) {
        match self.active.lock() {
            Ok(mut a) => {
                a.take();
            }
            Err(p) => {
                p.into_inner().take();
            }
        }
    }
}

/// Placeholder artifact size derived from the requested options.
fn estimated_size(options: &ExportOptions) -> u64 {
    let base: u64 = match options.kind {
        livesync_core::model::ExportKind::Pdf => 450_000,
        livesync_core::model::ExportKind::Html => 120_000,
        livesync_core::model::ExportKind::Png => 900_000,
    };
    let quality: u64 = match options.quality {
        livesync_core::model::ExportQuality::Draft => 1,
        livesync_core::model::ExportQuality::Standard => 2,
        livesync_core::model::ExportQuality::High => 4,
    };
    let assets: u64 = if options.include_assets { 350_000 } else { 0 };
    base * quality + assets
}
