//! Client wiring facade.
//!
//! Builds the state container, connection manager, view controller,
//! performance monitor, and export orchestrator from one validated
//! config, and exposes them behind a single handle.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use livesync_core::error::Result;
use livesync_core::model::{ExportJob, LastError, PerformanceSnapshot};
use livesync_core::protocol::{Envelope, EnvelopeKind};

use crate::config::SyncConfig;
use crate::connection::ConnectionManager;
use crate::export::ExportOrchestrator;
use crate::monitor::{LatestProbe, PerformanceMonitor};
use crate::state::{ObserverId, PreviewState, StateContainer};
use crate::transport::{Transport, WsTransport};
use crate::view::ViewController;

/// Capacity of the remote-update fanout channel.
const REMOTE_BUFFER: usize = 128;

pub struct PreviewClient {
    cfg: SyncConfig,
    container: Arc<StateContainer>,
    connection: Arc<ConnectionManager>,
    view: ViewController,
    monitor: PerformanceMonitor,
    export: ExportOrchestrator,
    probe: Arc<LatestProbe>,
    remote_tx: broadcast::Sender<Envelope>,
}

impl PreviewClient {
    /// Production client over tokio-tungstenite.
    pub fn new(cfg: SyncConfig) -> Result<Self> {
        Self::with_transport(cfg, Arc::new(WsTransport::new()))
    }

    /// Client over an injected transport (tests, embedding runtimes).
    pub fn with_transport(cfg: SyncConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        cfg.validate()?;

        let container = Arc::new(StateContainer::new());
        let (remote_tx, _) = broadcast::channel(REMOTE_BUFFER);
        let connection = ConnectionManager::new(
            cfg.connection.clone(),
            transport,
            Arc::clone(&container),
            remote_tx.clone(),
        );
        let probe = Arc::new(LatestProbe::new());
        let view = ViewController::new(Arc::clone(&container), &cfg.view);
        let monitor = PerformanceMonitor::new(
            &cfg.monitor,
            Arc::clone(&container),
            Arc::clone(&connection),
            probe.clone(),
        );
        let export = ExportOrchestrator::new(
            cfg.export.clone(),
            Arc::clone(&container),
            Arc::clone(&connection),
        );

        Ok(Self {
            cfg,
            container,
            connection,
            view,
            monitor,
            export,
            probe,
            remote_tx,
        })
    }

    // --------------------
    // Connection lifecycle
    // --------------------

    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    pub async fn retry_connection(&self) -> Result<()> {
        self.connection.retry_connection().await
    }

    // --------------------
    // Messaging
    // --------------------

    /// Send a raw envelope (queued FIFO while offline).
    pub async fn send(&self, env: Envelope) -> Result<()> {
        self.connection.send(env).await
    }

    /// Send an `update` envelope carrying editor state for the renderer.
    pub async fn send_update<T: Serialize>(&self, payload: &T) -> Result<()> {
        let env = Envelope::with_payload(EnvelopeKind::Update, payload)?;
        self.connection.send(env).await
    }

    /// Subscribe to inbound `update` envelopes from the renderer.
    pub fn subscribe_remote(&self) -> broadcast::Receiver<Envelope> {
        self.remote_tx.subscribe()
    }

    // --------------------
    // State access
    // --------------------

    pub fn snapshot(&self) -> PreviewState {
        self.container.snapshot()
    }

    pub fn on_update(&self, f: impl Fn(&PreviewState) + Send + Sync + 'static) -> ObserverId {
        self.container.on_update(f)
    }

    pub fn on_error(&self, f: impl Fn(&LastError) + Send + Sync + 'static) -> ObserverId {
        self.container.on_error(f)
    }

    pub fn on_performance(
        &self,
        f: impl Fn(&PerformanceSnapshot) + Send + Sync + 'static,
    ) -> ObserverId {
        self.container.on_performance(f)
    }

    pub fn on_export(&self, f: impl Fn(&ExportJob) + Send + Sync + 'static) -> ObserverId {
        self.container.on_export(f)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.container.remove_observer(id)
    }

    // --------------------
    // Components
    // --------------------

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn exporter(&self) -> &ExportOrchestrator {
        &self.export
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn container(&self) -> &Arc<StateContainer> {
        &self.container
    }

    /// Renderer-side measurement sink for the default probe.
    pub fn probe(&self) -> &Arc<LatestProbe> {
        &self.probe
    }

    pub fn config(&self) -> &SyncConfig {
        &self.cfg
    }
}
