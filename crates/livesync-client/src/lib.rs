//! livesync client library entry.
//!
//! This crate wires the transport, connection manager, state container,
//! view controller, performance monitor, and export orchestrator into a
//! cohesive preview-synchronization stack. It is intended to be consumed
//! programmatically by an embedding application and by integration tests;
//! there is no CLI surface.

pub mod client;
pub mod config;
pub mod connection;
pub mod export;
pub mod monitor;
pub mod registry;
pub mod state;
pub mod transport;
pub mod view;

pub use client::PreviewClient;
pub use registry::ClientRegistry;
