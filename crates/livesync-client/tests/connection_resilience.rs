//! Connection manager behavior under loss, backoff, and disconnects.
//!
//! All tests run on a paused clock against the in-memory mock transport,
//! so timer-driven behavior (backoff schedule, heartbeat) is exact.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use common::{advance, mock_client, settle, test_config, wait_status};
use livesync_core::error::SyncError;
use livesync_core::model::ConnectionStatus;
use livesync_core::protocol::{Envelope, EnvelopeKind};
use serde_json::json;

fn update(seq: u32) -> Envelope {
    Envelope::with_payload(EnvelopeKind::Update, &json!({ "seq": seq })).unwrap()
}

#[tokio::test(start_paused = true)]
async fn connect_opens_and_transmits_immediately() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    assert_eq!(client.snapshot().connection.status, ConnectionStatus::Open);
    assert_eq!(transport.open_count(), 1);

    client.send(update(1)).await.unwrap();
    settle().await;

    let mut peer = transport.take_peer().unwrap();
    let sent = peer.try_recv_sent().unwrap();
    assert_eq!(sent.kind, EnvelopeKind::Update);
    assert_eq!(client.connection().queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent_when_open() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_while_connecting_is_rejected() {
    let (client, transport) = mock_client(test_config());
    transport.set_open_delay(500);
    let client = Arc::new(client);

    let dialing = {
        let c = Arc::clone(&client);
        tokio::spawn(async move { c.connect().await })
    };
    settle().await;
    assert_eq!(
        client.snapshot().connection.status,
        ConnectionStatus::Connecting
    );

    let second = client.connect().await;
    assert!(matches!(second, Err(SyncError::ConnectInProgress)));

    advance(500).await;
    dialing.await.unwrap().unwrap();
    assert_eq!(client.snapshot().connection.status, ConnectionStatus::Open);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_attempt_is_bounded_by_timeout() {
    let (client, transport) = mock_client(test_config());
    transport.set_open_delay(2000); // past the 1000ms bound

    let err = client.connect().await.expect_err("must time out");
    assert!(err.to_string().contains("timed out"), "got: {err}");

    let conn = client.snapshot().connection;
    assert_eq!(conn.status, ConnectionStatus::Closed);
    assert_eq!(conn.last_error.unwrap().code, "CONNECT_FAILED");
}

#[tokio::test(start_paused = true)]
async fn offline_sends_queue_and_flush_fifo_on_reconnect() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    let mut peer = transport.take_peer().unwrap();

    // drop the link mid-session; hold reconnects off while we queue
    transport.refuse_all(true);
    peer.sever();
    wait_status(&client, ConnectionStatus::Closed).await;

    client.send(update(1)).await.unwrap();
    client.send(update(2)).await.unwrap();
    assert_eq!(client.connection().queue_len().await, 2);

    transport.refuse_all(false);
    advance(100).await; // attempt 1 fires
    wait_status(&client, ConnectionStatus::Open).await;

    let mut peer2 = transport.take_peer().unwrap();
    let first = peer2.try_recv_sent().unwrap();
    let second = peer2.try_recv_sent().unwrap();
    assert!(first.payload.unwrap().get().contains("1"));
    assert!(second.payload.unwrap().get().contains("2"));

    // a fresh send goes out behind the backlog
    client.send(update(3)).await.unwrap();
    settle().await;
    let third = peer2.try_recv_sent().unwrap();
    assert!(third.payload.unwrap().get().contains("3"));
    assert_eq!(client.connection().queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    let mut cfg = test_config();
    cfg.connection.base_interval_ms = 100;
    let (client, transport) = mock_client(cfg);
    transport.refuse_all(true);

    client.connect().await.expect_err("mock refuses");
    settle().await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(client.snapshot().connection.reconnect_attempts, 1);

    // attempt 1 waits base = 100ms
    advance(99).await;
    assert_eq!(transport.open_count(), 1);
    advance(1).await;
    assert_eq!(transport.open_count(), 2);

    // attempt 2 waits 200ms
    advance(199).await;
    assert_eq!(transport.open_count(), 2);
    advance(1).await;
    assert_eq!(transport.open_count(), 3);

    // attempt 3 waits 400ms
    advance(399).await;
    assert_eq!(transport.open_count(), 3);
    advance(1).await;
    assert_eq!(transport.open_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn reconnect_stops_after_budget_exhausted() {
    let mut cfg = test_config();
    cfg.connection.max_reconnect_attempts = 10;
    let (client, transport) = mock_client(cfg);
    transport.refuse_all(true);

    client.connect().await.expect_err("mock refuses");

    // burn through every scheduled attempt (total backoff ~102s)
    for _ in 0..15 {
        advance(60_000).await;
    }

    // initial dial + 10 reconnect attempts, the 11th never scheduled
    assert_eq!(transport.open_count(), 11);
    let conn = client.snapshot().connection;
    assert_eq!(conn.status, ConnectionStatus::Closed);
    assert_eq!(conn.reconnect_attempts, 10);
    assert_eq!(conn.last_error.unwrap().code, "RECONNECT_EXHAUSTED");

    advance(600_000).await;
    assert_eq!(transport.open_count(), 11);
}

#[tokio::test(start_paused = true)]
async fn retry_connection_resets_the_budget() {
    let mut cfg = test_config();
    cfg.connection.max_reconnect_attempts = 2;
    let (client, transport) = mock_client(cfg);
    transport.refuse_all(true);

    client.connect().await.expect_err("mock refuses");
    for _ in 0..10 {
        advance(10_000).await;
    }
    assert_eq!(
        client.snapshot().connection.last_error.unwrap().code,
        "RECONNECT_EXHAUSTED"
    );

    transport.refuse_all(false);
    client.retry_connection().await.unwrap();

    let conn = client.snapshot().connection;
    assert_eq!(conn.status, ConnectionStatus::Open);
    assert_eq!(conn.reconnect_attempts, 0);
    assert!(conn.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_and_never_reconnects() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    let peer = transport.take_peer().unwrap();

    client.disconnect().await;
    settle().await;
    assert_eq!(client.snapshot().connection.status, ConnectionStatus::Closed);
    assert!(peer.close_requested());

    advance(600_000).await;
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_a_scheduled_reconnect() {
    let (client, transport) = mock_client(test_config());
    transport.refuse_all(true);

    client.connect().await.expect_err("mock refuses");
    settle().await;
    assert_eq!(client.snapshot().connection.reconnect_attempts, 1);

    client.disconnect().await;
    transport.refuse_all(false);
    advance(600_000).await;

    assert_eq!(transport.open_count(), 1);
    assert_eq!(client.snapshot().connection.status, ConnectionStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_while_open() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    let mut peer = transport.take_peer().unwrap();

    advance(5000).await;
    let ping = peer.try_recv_sent().unwrap();
    assert_eq!(ping.kind, EnvelopeKind::Ping);

    // pong receipt lands in diagnostics
    assert!(peer.inject(Envelope::pong()).await);
    settle().await;
    assert!(client.snapshot().connection.last_pong.is_some());

    advance(5000).await;
    let ping2 = peer.try_recv_sent().unwrap();
    assert_eq!(ping2.kind, EnvelopeKind::Ping);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_does_not_enter_the_offline_queue() {
    let (client, transport) = mock_client(test_config());

    client.connect().await.unwrap();
    let mut peer = transport.take_peer().unwrap();
    transport.refuse_all(true);
    peer.sever();
    wait_status(&client, ConnectionStatus::Closed).await;

    // two heartbeat periods pass while closed
    advance(5000).await;
    advance(5000).await;
    assert_eq!(client.connection().queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn offline_queue_is_bounded() {
    let mut cfg = test_config();
    cfg.connection.queue_capacity = 2;
    let (client, _transport) = mock_client(cfg);

    client.send(update(1)).await.unwrap();
    client.send(update(2)).await.unwrap();
    let err = client.send(update(3)).await.expect_err("queue is full");
    assert!(matches!(err, SyncError::QueueFull { capacity: 2 }));
    assert_eq!(client.connection().queue_len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn remote_envelopes_route_by_kind() {
    use livesync_core::model::PerformanceSnapshot;

    let (client, transport) = mock_client(test_config());
    client.connect().await.unwrap();
    let peer = transport.take_peer().unwrap();
    let mut remote = client.subscribe_remote();

    // update fans out to subscribers
    let upd = Envelope::with_payload(EnvelopeKind::Update, &json!({ "component": "hero" })).unwrap();
    assert!(peer.inject(upd).await);
    settle().await;
    let got = remote.try_recv().unwrap();
    assert_eq!(got.kind, EnvelopeKind::Update);

    // performance folds into state
    let snap = PerformanceSnapshot {
        fps: 57.5,
        component_count: 12,
        ..Default::default()
    };
    let perf = Envelope::with_payload(EnvelopeKind::Performance, &snap).unwrap();
    assert!(peer.inject(perf).await);
    settle().await;
    assert_eq!(client.snapshot().perf.fps, 57.5);

    // remote error notifies error observers without touching status
    let codes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&codes);
    client.on_error(move |e| sink.lock().unwrap().push(e.code.clone()));
    let err_env =
        Envelope::with_payload(EnvelopeKind::Error, &json!({ "message": "render crashed" }))
            .unwrap();
    assert!(peer.inject(err_env).await);
    settle().await;
    assert_eq!(*codes.lock().unwrap(), vec!["REMOTE".to_string()]);
    assert_eq!(client.snapshot().connection.status, ConnectionStatus::Open);

    // a server-side protocol ping is answered with a pong envelope
    let mut peer = peer;
    assert!(peer.inject(Envelope::ping()).await);
    settle().await;
    let reply = peer.try_recv_sent().unwrap();
    assert_eq!(reply.kind, EnvelopeKind::Pong);
}
