//! Export orchestrator lifecycle.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::{Arc, Mutex};

use common::{advance, mock_client, settle, test_config};
use livesync_core::error::SyncError;
use livesync_core::model::{ExportKind, ExportOptions, ExportPhase, ExportQuality};
use livesync_core::protocol::EnvelopeKind;

fn pdf_options() -> ExportOptions {
    ExportOptions {
        kind: ExportKind::Pdf,
        quality: ExportQuality::Standard,
        include_assets: true,
    }
}

#[tokio::test(start_paused = true)]
async fn export_runs_to_completion() {
    let (client, _t) = mock_client(test_config());

    let progress_log = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&progress_log);
    client.on_export(move |job| log.lock().unwrap().push((job.phase, job.progress)));

    let result = client.exporter().export_portfolio(pdf_options()).await.unwrap();
    assert!(result.download_url.starts_with("/exports/"));
    assert!(result.download_url.ends_with(".pdf"));
    assert_eq!(result.kind, ExportKind::Pdf);
    assert!(result.file_size > 0);

    let job = client.snapshot().export;
    assert_eq!(job.phase, ExportPhase::Succeeded);
    assert_eq!(job.progress, 100);
    assert!(!job.is_exporting());
    assert_eq!(job.download_url.as_deref(), Some(result.download_url.as_str()));

    // observed progress is monotone and terminates at exactly 100
    let log = progress_log.lock().unwrap();
    let progresses: Vec<u8> = log.iter().map(|(_, p)| *p).collect();
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*progresses.last().unwrap(), 100);
    assert_eq!(log.last().unwrap().0, ExportPhase::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn second_export_is_rejected_while_running() {
    let (client, _t) = mock_client(test_config());
    let client = Arc::new(client);

    let running = {
        let c = Arc::clone(&client);
        tokio::spawn(async move { c.exporter().export_portfolio(pdf_options()).await })
    };
    settle().await;
    assert!(client.snapshot().export.is_exporting());

    let second = client
        .exporter()
        .export_portfolio(ExportOptions {
            kind: ExportKind::Png,
            quality: ExportQuality::Draft,
            include_assets: false,
        })
        .await;
    assert!(matches!(second, Err(SyncError::ExportInProgress)));

    // the first job is unaffected and finishes
    let result = running.await.unwrap().unwrap();
    assert_eq!(result.kind, ExportKind::Pdf);
    assert_eq!(client.snapshot().export.phase, ExportPhase::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn cancel_resets_the_job_immediately() {
    let (client, _t) = mock_client(test_config());
    let client = Arc::new(client);

    let running = {
        let c = Arc::clone(&client);
        tokio::spawn(async move { c.exporter().export_portfolio(pdf_options()).await })
    };
    settle().await;
    advance(200).await; // a couple of progress ticks
    let mid = client.snapshot().export;
    assert!(mid.is_exporting());
    assert!(mid.progress > 0);

    client.exporter().cancel_export();
    let job = client.snapshot().export;
    assert_eq!(job.phase, ExportPhase::Cancelled);
    assert_eq!(job.progress, 0);
    assert!(!job.is_exporting());

    let outcome = running.await.unwrap();
    assert!(matches!(outcome, Err(SyncError::Cancelled)));

    // late ticks from the dead task never resurrect the job
    advance(2000).await;
    assert_eq!(client.snapshot().export.phase, ExportPhase::Cancelled);
    assert_eq!(client.snapshot().export.progress, 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_without_a_job_is_a_no_op() {
    let (client, _t) = mock_client(test_config());
    client.exporter().cancel_export();
    assert_eq!(client.snapshot().export.phase, ExportPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn export_can_start_again_after_cancel() {
    let (client, _t) = mock_client(test_config());
    let client = Arc::new(client);

    let running = {
        let c = Arc::clone(&client);
        tokio::spawn(async move { c.exporter().export_portfolio(pdf_options()).await })
    };
    settle().await;
    client.exporter().cancel_export();
    let _ = running.await.unwrap();

    let result = client
        .exporter()
        .export_portfolio(ExportOptions {
            kind: ExportKind::Html,
            quality: ExportQuality::Draft,
            include_assets: false,
        })
        .await
        .unwrap();
    assert!(result.download_url.ends_with(".html"));
    assert_eq!(client.snapshot().export.phase, ExportPhase::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn export_announce_goes_over_the_wire_when_open() {
    let (client, transport) = mock_client(test_config());
    client.connect().await.unwrap();
    let mut peer = transport.take_peer().unwrap();

    client.exporter().export_portfolio(pdf_options()).await.unwrap();

    let env = peer.recv_sent().await.unwrap();
    assert_eq!(env.kind, EnvelopeKind::Export);
    assert!(env.payload.unwrap().get().contains("pdf"));
}

#[tokio::test(start_paused = true)]
async fn offline_export_still_completes_and_queues_the_announce() {
    let (client, _t) = mock_client(test_config());

    let result = client.exporter().export_portfolio(pdf_options()).await.unwrap();
    assert_eq!(client.snapshot().export.phase, ExportPhase::Succeeded);
    assert!(result.file_size > 0);

    // the announce waits for a future connection
    assert_eq!(client.connection().queue_len().await, 1);
}
