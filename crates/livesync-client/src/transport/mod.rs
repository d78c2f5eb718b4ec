//! Transport layer (WebSocket client).
//!
//! Exposes the [`Transport`] seam, the tokio-tungstenite implementation,
//! the decode-once codec, and an in-memory mock for tests. The manager
//! above this layer only ever sees [`Envelope`] values flowing over
//! channels; socket-level concerns (WS ping/pong, close frames, malformed
//! text) stay inside the bridge task.

pub mod codec;
pub mod mock;
pub mod ws;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use livesync_core::error::Result;
use livesync_core::protocol::Envelope;

pub use mock::{MockPeer, MockTransport};
pub use ws::WsTransport;

/// Channel capacity for each direction of a link.
pub(crate) const LINK_BUFFER: usize = 1024;

/// One live connection, as seen by the connection manager.
///
/// Dropping `outbound` (or flipping `close`) tears the link down; the
/// `inbound` receiver yielding `None` means the link is gone.
pub struct TransportLink {
    /// Envelopes to transmit.
    pub outbound: mpsc::Sender<Envelope>,
    /// Envelopes received from the peer.
    pub inbound: mpsc::Receiver<Envelope>,
    /// Close signal; flipping to `true` requests a normal closure.
    pub close: watch::Sender<bool>,
}

/// Dialer seam, injectable so tests can run without sockets.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open one connection to `url`.
    async fn open(&self, url: &str) -> Result<TransportLink>;
}
