//! Closed action sum type.
//!
//! Every state transition in the system is one of these variants; the
//! reducer matches exhaustively, so adding a variant is a compile error
//! until every consumer handles it.

use chrono::{DateTime, Utc};

use livesync_core::model::{
    DeviceViewport, ExportKind, LastError, PanOffset, PerformanceSnapshot,
};

#[derive(Debug, Clone)]
pub enum Action {
    Transport(TransportEvent),
    View(ViewAction),
    Perf(PerfAction),
    Export(ExportAction),
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connecting,
    Opened,
    Closing,
    Closed { error: Option<LastError> },
    ReconnectScheduled { attempt: u32 },
    ReconnectExhausted { attempts: u32 },
    PongReceived { at: DateTime<Utc> },
    /// Application-level error reported by the remote peer. State is
    /// unaffected; error observers are notified.
    RemoteError { message: String },
}

/// User intent against the view state.
#[derive(Debug, Clone)]
pub enum ViewAction {
    SetViewport(DeviceViewport),
    DeviceSwitchSettled,
    SetZoom(f32),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetPan(PanOffset),
    ResetPan,
    FitToScreen,
    SetFullscreen(bool),
    /// External fullscreen-change notification (no corresponding call).
    FullscreenChanged(bool),
}

#[derive(Debug, Clone)]
pub enum PerfAction {
    /// Wholesale replacement from the sampler or the remote renderer.
    Sampled(PerformanceSnapshot),
}

#[derive(Debug, Clone)]
pub enum ExportAction {
    Started { kind: ExportKind },
    Progress(u8),
    Succeeded { download_url: String },
    Failed { error: String },
    Cancelled,
}
