//! tokio-tungstenite transport.
//!
//! `open` dials the endpoint, splits the socket, and spawns a bridge task
//! that shuttles envelopes between the link channels and the wire.
//! Malformed inbound frames are logged and discarded inside the bridge;
//! they never reach the connection manager and never affect the
//! connection state.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use livesync_core::error::{Result, SyncError};
use livesync_core::protocol::Envelope;

use super::codec::{self, Inbound};
use super::{Transport, TransportLink, LINK_BUFFER};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Production transport backed by tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<TransportLink> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| SyncError::ConnectFailed(e.to_string()))?;
        info!(%url, "websocket connected");

        let (ws_tx, ws_rx) = stream.split();
        let (out_tx, out_rx) = mpsc::channel::<Envelope>(LINK_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<Envelope>(LINK_BUFFER);
        let (close_tx, close_rx) = watch::channel(false);

        tokio::spawn(run_bridge(ws_tx, ws_rx, out_rx, in_tx, close_rx));

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
            close: close_tx,
        })
    }
}

fn normal_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "client disconnect".into(),
    }))
}

/// Shuttle frames until either side goes away.
///
/// Dropping `in_tx` on exit is what signals connection loss upward.
async fn run_bridge(
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut out_rx: mpsc::Receiver<Envelope>,
    in_tx: mpsc::Sender<Envelope>,
    mut close_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(env) => match codec::encode(&env) {
                        Ok(msg) => {
                            if ws_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to encode outbound envelope"),
                    },
                    None => {
                        // manager gone; close out politely
                        let _ = ws_tx.send(normal_close()).await;
                        break;
                    }
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(msg)) => match codec::decode(msg) {
                        Ok(Inbound::Envelope(env)) => {
                            if in_tx.send(env).await.is_err() {
                                break;
                            }
                        }
                        Ok(Inbound::Ping(payload)) => {
                            let _ = ws_tx.send(Message::Pong(payload)).await;
                        }
                        Ok(Inbound::Pong(_)) | Ok(Inbound::Ignored) => {}
                        Ok(Inbound::Close) => {
                            debug!("received close frame from peer");
                            break;
                        }
                        Err(e) => {
                            // one bad frame must not destabilize the connection
                            warn!(error = %e, "dropping malformed inbound frame");
                        }
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read error");
                        break;
                    }
                    None => {
                        debug!("websocket stream ended");
                        break;
                    }
                }
            }

            changed = close_rx.changed() => {
                if changed.is_err() || *close_rx.borrow() {
                    let _ = ws_tx.send(normal_close()).await;
                    break;
                }
            }
        }
    }
    debug!("transport bridge ended");
}
