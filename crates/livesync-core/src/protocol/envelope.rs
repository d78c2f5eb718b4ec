//! Envelope: the unit of wire communication.
//!
//! The `data` payload is stored as `RawValue` to enable lazy parsing by
//! consumers. Envelope ids are diagnostic only; there is no
//! request/response correlation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Wire protocol version carried in every envelope.
pub const PROTOCOL_VERSION: u8 = 1;

/// Closed set of envelope kinds (field name is `type` in JSON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Update,
    Error,
    Performance,
    Export,
    Ping,
    Pong,
}

impl EnvelopeKind {
    /// Wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeKind::Update => "update",
            EnvelopeKind::Error => "error",
            EnvelopeKind::Performance => "performance",
            EnvelopeKind::Export => "export",
            EnvelopeKind::Ping => "ping",
            EnvelopeKind::Pong => "pong",
        }
    }
}

/// One wire frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Protocol version.
    pub v: u8,
    /// Envelope kind (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
    /// ISO-8601 creation time.
    pub timestamp: DateTime<Utc>,
    /// Unique id, used for diagnostics only.
    pub id: String,
}

impl Envelope {
    /// Build an envelope stamped with the current time and a fresh id.
    pub fn new(kind: EnvelopeKind, payload: Option<Box<RawValue>>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            kind,
            payload,
            timestamp: Utc::now(),
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Build an envelope from any serializable payload.
    pub fn with_payload<T: Serialize>(kind: EnvelopeKind, payload: &T) -> Result<Self> {
        let raw = serde_json::value::to_raw_value(payload)
            .map_err(|e| SyncError::Protocol(format!("payload encode failed: {e}")))?;
        Ok(Self::new(kind, Some(raw)))
    }

    /// Heartbeat ping.
    pub fn ping() -> Self {
        Self::new(EnvelopeKind::Ping, None)
    }

    /// Heartbeat pong.
    pub fn pong() -> Self {
        Self::new(EnvelopeKind::Pong, None)
    }

    /// Parse the payload into a concrete type.
    pub fn parse_payload<'a, T: Deserialize<'a>>(&'a self) -> Result<T> {
        let raw = self
            .payload
            .as_ref()
            .ok_or_else(|| SyncError::Protocol("envelope has no payload".into()))?;
        serde_json::from_str(raw.get())
            .map_err(|e| SyncError::Protocol(format!("payload decode failed: {e}")))
    }
}

/// Encode an envelope into a JSON text frame.
pub fn encode(env: &Envelope) -> Result<String> {
    serde_json::to_string(env).map_err(|e| SyncError::Protocol(format!("encode failed: {e}")))
}

/// Decode a JSON text frame into an envelope (version-checked).
pub fn decode(s: &str) -> Result<Envelope> {
    let env: Envelope = serde_json::from_str(s)
        .map_err(|e| SyncError::Protocol(format!("invalid envelope json: {e}")))?;
    if env.v != PROTOCOL_VERSION {
        return Err(SyncError::Protocol(format!(
            "unsupported protocol version {}",
            env.v
        )));
    }
    Ok(env)
}
