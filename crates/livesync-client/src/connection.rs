//! Connection manager.
//!
//! Owns the transport handle and the offline queue, reconnects
//! transparently with exponential backoff, and moves envelopes in both
//! directions. All status changes flow into the state container as
//! transport events; the manager itself knows nothing about view state.
//!
//! Ordering contract: envelopes queued while the link is down are flushed
//! FIFO on reconnect, before any new send is admitted ahead of the
//! backlog. Heartbeats are generated only while open, so they never enter
//! the offline queue.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use livesync_core::error::{ErrorKind, Result, SyncError};
use livesync_core::model::{ConnectionStatus, LastError, PerformanceSnapshot};
use livesync_core::protocol::{Envelope, EnvelopeKind};

use crate::config::ConnectionSection;
use crate::state::{Action, ExportAction, PerfAction, StateContainer, TransportEvent};
use crate::transport::{Transport, TransportLink};

/// Delay before reconnect attempt `n`: `base * 2^(n-1)`, uncapped.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

struct LinkHandles {
    outbound: mpsc::Sender<Envelope>,
    close: watch::Sender<bool>,
}

struct ConnState {
    phase: ConnectionStatus,
    user_closed: bool,
    attempts: u32,
    queue: VecDeque<Envelope>,
    link: Option<LinkHandles>,
    reconnect_cancel: Option<watch::Sender<bool>>,
    /// Bumped on every install; stale session tasks compare against it.
    session_epoch: u64,
}

pub struct ConnectionManager {
    cfg: ConnectionSection,
    transport: Arc<dyn Transport>,
    container: Arc<StateContainer>,
    /// Inbound `update` envelopes fan out to embedding subscribers.
    remote_tx: broadcast::Sender<Envelope>,
    inner: Mutex<ConnState>,
    me: Weak<Self>,
}

impl ConnectionManager {
    pub fn new(
        cfg: ConnectionSection,
        transport: Arc<dyn Transport>,
        container: Arc<StateContainer>,
        remote_tx: broadcast::Sender<Envelope>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            cfg,
            transport,
            container,
            remote_tx,
            inner: Mutex::new(ConnState {
                phase: ConnectionStatus::Closed,
                user_closed: false,
                attempts: 0,
                queue: VecDeque::new(),
                link: None,
                reconnect_cancel: None,
                session_epoch: 0,
            }),
            me: me.clone(),
        })
    }

    /// Envelopes waiting for the link to come back.
    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    // --------------------
    // Connect / disconnect
    // --------------------

    /// Open the connection.
    ///
    /// Idempotent when already open; rejects while a connect is in flight
    /// instead of opening a second socket. On failure a background
    /// reconnect is scheduled unless the user has explicitly disconnected.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut st = self.inner.lock().await;
            match st.phase {
                ConnectionStatus::Open => return Ok(()),
                ConnectionStatus::Connecting => return Err(SyncError::ConnectInProgress),
                ConnectionStatus::Closing | ConnectionStatus::Closed => {}
            }
            st.phase = ConnectionStatus::Connecting;
            st.user_closed = false;
            if let Some(c) = st.reconnect_cancel.take() {
                let _ = c.send(true);
            }
        }
        self.container
            .dispatch(Action::Transport(TransportEvent::Connecting));

        match self.try_open().await {
            Ok(link) => self.install_link(link).await,
            Err(e) => {
                let schedule = {
                    let mut st = self.inner.lock().await;
                    st.phase = ConnectionStatus::Closed;
                    !st.user_closed
                };
                warn!(error = %e, "connect failed");
                self.container
                    .dispatch(Action::Transport(TransportEvent::Closed {
                        error: Some(LastError {
                            code: ErrorKind::ConnectFailed.as_str().to_string(),
                            message: e.to_string(),
                        }),
                    }));
                if schedule {
                    self.schedule_reconnect().await;
                }
                Err(e)
            }
        }
    }

    /// Explicit user-initiated close. Cancels any scheduled reconnect and
    /// the heartbeat; does not auto-reconnect.
    pub async fn disconnect(&self) {
        let link = {
            let mut st = self.inner.lock().await;
            st.user_closed = true;
            if let Some(c) = st.reconnect_cancel.take() {
                let _ = c.send(true);
            }
            let link = st.link.take();
            if link.is_none() && st.phase == ConnectionStatus::Closed {
                return;
            }
            st.phase = ConnectionStatus::Closing;
            link
        };
        self.container
            .dispatch(Action::Transport(TransportEvent::Closing));

        if let Some(l) = link {
            // the bridge answers with a normal-closure frame
            let _ = l.close.send(true);
        }

        self.inner.lock().await.phase = ConnectionStatus::Closed;
        self.container
            .dispatch(Action::Transport(TransportEvent::Closed { error: None }));
        info!("disconnected");
    }

    /// The only exit from the terminal reconnect-exhausted state: reset
    /// the attempt budget and connect again.
    pub async fn retry_connection(&self) -> Result<()> {
        {
            let mut st = self.inner.lock().await;
            st.attempts = 0;
            if let Some(c) = st.reconnect_cancel.take() {
                let _ = c.send(true);
            }
        }
        self.connect().await
    }

    // --------------------
    // Send path
    // --------------------

    /// Transmit immediately when open; queue FIFO otherwise.
    pub async fn send(&self, env: Envelope) -> Result<()> {
        let tx = {
            let mut st = self.inner.lock().await;
            if st.phase == ConnectionStatus::Open {
                st.link.as_ref().map(|l| l.outbound.clone())
            } else {
                return Self::enqueue(&mut st, env, self.cfg.queue_capacity);
            }
        };

        match tx {
            Some(tx) => {
                if tx.send(env.clone()).await.is_err() {
                    // link died under us; the session task will notice.
                    // keep the envelope for the flush after reconnect
                    let mut st = self.inner.lock().await;
                    return Self::enqueue(&mut st, env, self.cfg.queue_capacity);
                }
                Ok(())
            }
            None => Err(SyncError::NotConnected),
        }
    }

    fn enqueue(st: &mut ConnState, env: Envelope, capacity: usize) -> Result<()> {
        if st.queue.len() >= capacity {
            return Err(SyncError::QueueFull { capacity });
        }
        debug!(kind = env.kind.as_str(), queued = st.queue.len() + 1, "queued while offline");
        st.queue.push_back(env);
        Ok(())
    }

    // --------------------
    // Internals
    // --------------------

    async fn try_open(&self) -> Result<TransportLink> {
        let bound = Duration::from_millis(self.cfg.connect_timeout_ms);
        match timeout(bound, self.transport.open(&self.cfg.url)).await {
            Ok(res) => res,
            Err(_) => Err(SyncError::ConnectFailed(format!(
                "connect timed out after {}ms",
                self.cfg.connect_timeout_ms
            ))),
        }
    }

    /// Flush the backlog, mark the link open, and start the session task.
    async fn install_link(&self, link: TransportLink) -> Result<()> {
        let TransportLink {
            outbound,
            inbound,
            close,
        } = link;

        let (epoch, close_rx) = {
            let mut st = self.inner.lock().await;
            if st.user_closed {
                // disconnect raced the dial; abandon the fresh link
                let _ = close.send(true);
                st.phase = ConnectionStatus::Closed;
                drop(st);
                self.container
                    .dispatch(Action::Transport(TransportEvent::Closed { error: None }));
                return Err(SyncError::Cancelled);
            }

            // drain the backlog before the link becomes visible to new
            // sends; the lock is held across the awaits on purpose
            while let Some(env) = st.queue.pop_front() {
                if let Err(e) = outbound.send(env).await {
                    st.queue.push_front(e.0);
                    st.phase = ConnectionStatus::Closed;
                    drop(st);
                    self.container
                        .dispatch(Action::Transport(TransportEvent::Closed {
                            error: Some(LastError {
                                code: ErrorKind::ConnectFailed.as_str().to_string(),
                                message: "link lost during queue flush".into(),
                            }),
                        }));
                    self.schedule_reconnect().await;
                    return Err(SyncError::ConnectFailed("link lost during queue flush".into()));
                }
            }

            st.session_epoch += 1;
            let close_rx = close.subscribe();
            st.link = Some(LinkHandles {
                outbound: outbound.clone(),
                close,
            });
            st.phase = ConnectionStatus::Open;
            st.attempts = 0;
            (st.session_epoch, close_rx)
        };

        info!("connection open");
        self.container
            .dispatch(Action::Transport(TransportEvent::Opened));

        if let Some(mgr) = self.me.upgrade() {
            tokio::spawn(async move {
                mgr.run_session(inbound, outbound, close_rx, epoch).await;
            });
        }
        Ok(())
    }

    /// Heartbeat + inbound pump for one link.
    async fn run_session(
        &self,
        mut inbound: mpsc::Receiver<Envelope>,
        outbound: mpsc::Sender<Envelope>,
        mut close_rx: watch::Receiver<bool>,
        epoch: u64,
    ) {
        let period = Duration::from_millis(self.cfg.heartbeat_interval_ms);
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe = inbound.recv() => {
                    match maybe {
                        Some(env) => self.handle_inbound(env, &outbound).await,
                        None => {
                            self.handle_connection_lost(epoch).await;
                            return;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    debug!("heartbeat ping");
                    if outbound.send(Envelope::ping()).await.is_err() {
                        self.handle_connection_lost(epoch).await;
                        return;
                    }
                }

                changed = close_rx.changed() => {
                    if changed.is_err() || *close_rx.borrow() {
                        debug!("session closed by disconnect");
                        return;
                    }
                }
            }
        }
    }

    async fn handle_inbound(&self, env: Envelope, outbound: &mpsc::Sender<Envelope>) {
        match env.kind {
            EnvelopeKind::Ping => {
                let _ = outbound.send(Envelope::pong()).await;
            }
            EnvelopeKind::Pong => {
                self.container
                    .dispatch(Action::Transport(TransportEvent::PongReceived {
                        at: Utc::now(),
                    }));
            }
            EnvelopeKind::Performance => match env.parse_payload::<PerformanceSnapshot>() {
                Ok(snap) => self
                    .container
                    .dispatch(Action::Perf(PerfAction::Sampled(snap))),
                Err(e) => warn!(id = %env.id, error = %e, "dropping malformed performance payload"),
            },
            EnvelopeKind::Export => match env.parse_payload::<RemoteExportEvent>() {
                Ok(ev) => {
                    if let Some(action) = ev.into_action() {
                        self.container.dispatch(Action::Export(action));
                    }
                }
                Err(e) => warn!(id = %env.id, error = %e, "dropping malformed export payload"),
            },
            EnvelopeKind::Error => {
                let message = env
                    .parse_payload::<RemoteErrorPayload>()
                    .map(|p| p.message)
                    .unwrap_or_else(|_| "remote error".to_string());
                warn!(id = %env.id, %message, "remote error envelope");
                self.container
                    .dispatch(Action::Transport(TransportEvent::RemoteError { message }));
            }
            EnvelopeKind::Update => {
                // fan out to embedding subscribers; nobody listening is fine
                let _ = self.remote_tx.send(env);
            }
        }
    }

    async fn handle_connection_lost(&self, epoch: u64) {
        {
            let mut st = self.inner.lock().await;
            if st.session_epoch != epoch {
                return; // a newer session already took over
            }
            st.link = None;
            if st.user_closed {
                return;
            }
            st.phase = ConnectionStatus::Closed;
        }
        warn!("connection lost");
        self.container
            .dispatch(Action::Transport(TransportEvent::Closed {
                error: Some(LastError {
                    code: ErrorKind::ConnectFailed.as_str().to_string(),
                    message: "connection lost".into(),
                }),
            }));
        self.schedule_reconnect().await;
    }

    async fn schedule_reconnect(&self) {
        let cancel_rx = {
            let mut st = self.inner.lock().await;
            if st.user_closed || st.reconnect_cancel.is_some() {
                return;
            }
            let (tx, rx) = watch::channel(false);
            st.reconnect_cancel = Some(tx);
            rx
        };

        if let Some(mgr) = self.me.upgrade() {
            tokio::spawn(async move {
                mgr.run_reconnect(cancel_rx).await;
            });
        }
    }

    /// Backoff loop. Exits on success, cancellation, user disconnect, or
    /// an exhausted attempt budget (terminal, no further timers).
    ///
    /// Returns a boxed `Send` future instead of being an `async fn` so the
    /// compiler has an explicit auto-trait bound at the `spawn` site,
    /// breaking the `run_reconnect -> install_link -> schedule_reconnect ->
    /// spawn(run_reconnect)` inference cycle.
    fn run_reconnect<'a>(
        &'a self,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        loop {
            let attempt = {
                let mut st = self.inner.lock().await;
                if st.user_closed || *cancel_rx.borrow() {
                    // whoever cancelled us already took the handle
                    return;
                }
                if st.attempts >= self.cfg.max_reconnect_attempts {
                    let attempts = st.attempts;
                    st.reconnect_cancel = None;
                    drop(st);
                    warn!(attempts, "reconnect budget exhausted");
                    self.container
                        .dispatch(Action::Transport(TransportEvent::ReconnectExhausted {
                            attempts,
                        }));
                    return;
                }
                st.attempts += 1;
                st.attempts
            };

            let delay = backoff_delay(self.cfg.base_interval_ms, attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            self.container
                .dispatch(Action::Transport(TransportEvent::ReconnectScheduled {
                    attempt,
                }));

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        debug!("reconnect cancelled");
                        return;
                    }
                }
            }

            {
                let mut st = self.inner.lock().await;
                if st.user_closed || *cancel_rx.borrow() {
                    return;
                }
                st.phase = ConnectionStatus::Connecting;
            }
            self.container
                .dispatch(Action::Transport(TransportEvent::Connecting));

            match self.try_open().await {
                Ok(link) => match self.install_link(link).await {
                    Ok(()) => {
                        self.inner.lock().await.reconnect_cancel = None;
                        return;
                    }
                    Err(_) => {
                        // install only fails on user disconnect or a link
                        // that died mid-flush; both are handled inside
                        let st = self.inner.lock().await;
                        if st.user_closed {
                            return;
                        }
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    self.inner.lock().await.phase = ConnectionStatus::Closed;
                    self.container
                        .dispatch(Action::Transport(TransportEvent::Closed {
                            error: Some(LastError {
                                code: ErrorKind::ConnectFailed.as_str().to_string(),
                                message: e.to_string(),
                            }),
                        }));
                }
            }
        }
        })
    }
}

/// Export progress pushed by a remote backend.
#[derive(Debug, Deserialize)]
struct RemoteExportEvent {
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteExportEvent {
    fn into_action(self) -> Option<ExportAction> {
        if let Some(error) = self.error {
            return Some(ExportAction::Failed { error });
        }
        if let Some(download_url) = self.download_url {
            return Some(ExportAction::Succeeded { download_url });
        }
        self.progress.map(ExportAction::Progress)
    }
}

#[derive(Debug, Deserialize)]
struct RemoteErrorPayload {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(3000, 1), Duration::from_millis(3000));
        assert_eq!(backoff_delay(3000, 2), Duration::from_millis(6000));
        assert_eq!(backoff_delay(3000, 3), Duration::from_millis(12000));
        assert_eq!(backoff_delay(3000, 4), Duration::from_millis(24000));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let d = backoff_delay(3000, 80);
        assert!(d >= backoff_delay(3000, 79));
        let huge = backoff_delay(u64::MAX, 100);
        assert_eq!(huge, Duration::from_millis(u64::MAX));
    }
}
