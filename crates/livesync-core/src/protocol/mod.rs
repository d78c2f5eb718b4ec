//! Wire protocol (JSON envelopes).
//!
//! Every frame on the preview connection is one JSON-encoded [`Envelope`].
//! Payloads are stored as `RawValue` so consumers can parse them lazily.
//!
//! All parsing is panic-free: malformed input is reported as `SyncError`
//! instead of panicking, keeping the client resilient to hostile or
//! truncated remote traffic.

pub mod envelope;

pub use envelope::{decode, encode, Envelope, EnvelopeKind, PROTOCOL_VERSION};
