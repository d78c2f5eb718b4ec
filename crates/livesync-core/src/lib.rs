//! livesync core: transport-agnostic protocol primitives, shared state
//! models, and error types.
//!
//! This crate defines the wire-level envelope, the composite preview state
//! value types, the static device preset catalog, and the error surface
//! shared by the client runtime and embedding applications. It carries no
//! transport or runtime dependencies so it can be reused in multiple
//! contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SyncError`/`Result` so embedding
//! processes do not crash on malformed frames or bad remote traffic.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod presets;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SyncError};
