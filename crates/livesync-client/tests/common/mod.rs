//! Shared helpers for integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use livesync_client::config::SyncConfig;
use livesync_client::transport::{MockTransport, Transport};
use livesync_client::PreviewClient;
use livesync_core::model::ConnectionStatus;

/// Config with short timers for paused-clock tests.
pub fn test_config() -> SyncConfig {
    let mut cfg = SyncConfig::for_url("ws://mock.invalid/preview");
    cfg.connection.base_interval_ms = 100;
    cfg.connection.max_reconnect_attempts = 10;
    cfg.connection.heartbeat_interval_ms = 5000;
    cfg.connection.connect_timeout_ms = 1000;
    cfg.connection.queue_capacity = 8;
    cfg.export.tick_ms = 100;
    cfg.export.progress_step = 10;
    cfg.monitor.sample_interval_ms = 200;
    cfg.view.device_switch_settle_ms = 100;
    cfg
}

pub fn mock_client(cfg: SyncConfig) -> (PreviewClient, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let client =
        PreviewClient::with_transport(cfg, dyn_transport).expect("config must be valid");
    (client, transport)
}

/// Let spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock, letting timers fire in between.
///
/// Settles first so any freshly spawned task has a chance to arm its
/// timer against the current (pre-advance) clock before time jumps;
/// otherwise a task that hasn't polled yet would capture its deadline
/// baseline at the post-advance instant and appear one period late.
pub async fn advance(ms: u64) {
    settle().await;
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

/// Yield until the connection reaches `status` (bounded).
pub async fn wait_status(client: &PreviewClient, status: ConnectionStatus) {
    for _ in 0..500 {
        if client.snapshot().connection.status == status {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "connection never reached {status:?}, stuck at {:?}",
        client.snapshot().connection.status
    );
}
