//! Decode-once codec for the transport layer.
//!
//! - Text frames => [`Envelope`] (lazy `RawValue` payloads)
//! - WS ping/pong/close are surfaced for lifecycle management
//! - Binary frames are a protocol violation: the wire format is JSON text

use tokio_tungstenite::tungstenite::Message;

use livesync_core::error::{Result, SyncError};
use livesync_core::protocol::{self, Envelope};

#[derive(Debug)]
pub enum Inbound {
    Envelope(Envelope),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
    /// Frame types with no protocol meaning (raw frames mid-reassembly).
    Ignored,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => Ok(Inbound::Envelope(protocol::decode(&s)?)),
        Message::Binary(_) => Err(SyncError::Protocol("unexpected binary frame".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
        Message::Frame(_) => Ok(Inbound::Ignored),
    }
}

pub fn encode(env: &Envelope) -> Result<Message> {
    Ok(Message::Text(protocol::encode(env)?))
}
