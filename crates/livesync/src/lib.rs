//! Top-level facade crate for livesync.
//!
//! Re-exports the core types and the client library so embedding
//! applications can depend on a single crate.

pub mod core {
    pub use livesync_core::*;
}

pub mod client {
    pub use livesync_client::*;
}
