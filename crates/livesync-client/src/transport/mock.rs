//! In-memory mock transport for tests.
//!
//! Each successful `open` produces a [`MockPeer`] the test can drive:
//! observe envelopes the client transmitted, inject inbound envelopes,
//! and sever the link to simulate mid-session connection loss. Connect
//! outcomes are scriptable (`fail_next`, `refuse_all`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use livesync_core::error::{Result, SyncError};
use livesync_core::protocol::Envelope;

use super::{Transport, TransportLink, LINK_BUFFER};

/// Test-side end of one mock link.
pub struct MockPeer {
    sent: mpsc::Receiver<Envelope>,
    inject_tx: Option<mpsc::Sender<Envelope>>,
    close_rx: watch::Receiver<bool>,
}

impl MockPeer {
    /// Next envelope the client transmitted over this link.
    pub async fn recv_sent(&mut self) -> Option<Envelope> {
        self.sent.recv().await
    }

    /// Non-blocking variant of [`recv_sent`](Self::recv_sent).
    pub fn try_recv_sent(&mut self) -> Option<Envelope> {
        self.sent.try_recv().ok()
    }

    /// Push an inbound envelope to the client. Returns false once severed.
    pub async fn inject(&self, env: Envelope) -> bool {
        match &self.inject_tx {
            Some(tx) => tx.send(env).await.is_ok(),
            None => false,
        }
    }

    /// Drop the inbound side; the client observes connection loss.
    pub fn sever(&mut self) {
        self.inject_tx = None;
    }

    /// Whether the client requested a normal closure on this link.
    pub fn close_requested(&self) -> bool {
        *self.close_rx.borrow()
    }
}

#[derive(Default)]
struct Script {
    fail_next: u32,
    refuse_all: bool,
    open_delay_ms: u64,
}

/// Scriptable dialer handing out in-memory links.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    peers: Mutex<VecDeque<MockPeer>>,
    opens: AtomicU32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` open calls.
    pub fn fail_next(&self, n: u32) {
        if let Ok(mut s) = self.script.lock() {
            s.fail_next = n;
        }
    }

    /// Fail every open call until reset.
    pub fn refuse_all(&self, refuse: bool) {
        if let Ok(mut s) = self.script.lock() {
            s.refuse_all = refuse;
        }
    }

    /// Make every open call take this long before resolving.
    pub fn set_open_delay(&self, ms: u64) {
        if let Ok(mut s) = self.script.lock() {
            s.open_delay_ms = ms;
        }
    }

    /// Total open calls observed (successful or not).
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Take the oldest not-yet-claimed peer.
    pub fn take_peer(&self) -> Option<MockPeer> {
        self.peers.lock().ok()?.pop_front()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _url: &str) -> Result<TransportLink> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let (refused, delay_ms) = {
            let mut s = self
                .script
                .lock()
                .map_err(|_| SyncError::Internal("mock script lock poisoned".into()))?;
            let refused = if s.refuse_all {
                true
            } else if s.fail_next > 0 {
                s.fail_next -= 1;
                true
            } else {
                false
            };
            (refused, s.open_delay_ms)
        };

        // delay before any side effects so a timed-out dial leaves no peer
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        if refused {
            return Err(SyncError::ConnectFailed("mock refused connection".into()));
        }

        let (out_tx, out_rx) = mpsc::channel::<Envelope>(LINK_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<Envelope>(LINK_BUFFER);
        let (close_tx, close_rx) = watch::channel(false);

        let peer = MockPeer {
            sent: out_rx,
            inject_tx: Some(in_tx),
            close_rx,
        };
        self.peers
            .lock()
            .map_err(|_| SyncError::Internal("mock peer lock poisoned".into()))?
            .push_back(peer);

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
            close: close_tx,
        })
    }
}
