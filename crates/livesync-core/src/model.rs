//! Shared state value types.
//!
//! These records are owned and mutated exclusively by the client's state
//! container; everything here is a plain value that can be cloned out as a
//! snapshot. `ViewState` and `PerformanceSnapshot` also travel inside
//! `update`/`performance` envelopes, so they carry serde derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --------------------
// Connection
// --------------------

/// Transport connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Last error retained for UI consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    /// Stable error code (`ErrorKind::as_str`).
    pub code: String,
    pub message: String,
}

/// Connection sub-state as observed through snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub last_error: Option<LastError>,
    /// Receipt time of the most recent heartbeat pong (diagnostics only).
    pub last_pong: Option<DateTime<Utc>>,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Closed,
            reconnect_attempts: 0,
            last_error: None,
            last_pong: None,
        }
    }
}

// --------------------
// View
// --------------------

/// Simulated device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Mobile,
    Tablet,
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Portrait => Orientation::Landscape,
            Orientation::Landscape => Orientation::Portrait,
        }
    }
}

/// Simulated device display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceViewport {
    pub kind: DeviceKind,
    pub width: u32,
    pub height: u32,
    pub name: String,
    pub orientation: Orientation,
    pub pixel_ratio: f32,
}

impl DeviceViewport {
    /// Same device rotated a quarter turn: dimensions swapped,
    /// orientation flipped.
    pub fn rotated(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
            orientation: self.orientation.flipped(),
            ..self.clone()
        }
    }
}

/// Pan translation in preview pixels (unconstrained).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanOffset {
    pub x: f32,
    pub y: f32,
}

/// Editor view state synchronized to the remote renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub viewport: DeviceViewport,
    pub zoom: f32,
    pub pan: PanOffset,
    /// Mirror of the host fullscreen state; can change without a
    /// corresponding call (external fullscreen-change notifications).
    pub fullscreen: bool,
    /// Transient reflow indicator while a device switch settles.
    pub device_switching: bool,
}

impl ViewState {
    pub const ZOOM_MIN: f32 = 0.1;
    pub const ZOOM_MAX: f32 = 3.0;
    pub const ZOOM_STEP: f32 = 1.2;

    /// Clamp a zoom factor into the valid range. Out-of-range values are
    /// clamped, never rejected.
    pub fn clamp_zoom(z: f32) -> f32 {
        if !z.is_finite() {
            return 1.0;
        }
        z.clamp(Self::ZOOM_MIN, Self::ZOOM_MAX)
    }
}

// --------------------
// Performance
// --------------------

/// One telemetry sample, replaced wholesale on each sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub render_time_ms: f64,
    pub memory_bytes: u64,
    pub fps: f32,
    pub component_count: u32,
    pub bundle_bytes: u64,
    pub load_time_ms: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for PerformanceSnapshot {
    fn default() -> Self {
        Self {
            render_time_ms: 0.0,
            memory_bytes: 0,
            fps: 0.0,
            component_count: 0,
            bundle_bytes: 0,
            load_time_ms: 0.0,
            last_updated: Utc::now(),
        }
    }
}

// --------------------
// Export
// --------------------

/// Export artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Pdf,
    Html,
    Png,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Html => "html",
            ExportKind::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Draft,
    Standard,
    High,
}

/// Options for one export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub kind: ExportKind,
    pub quality: ExportQuality,
    #[serde(default)]
    pub include_assets: bool,
}

/// Final outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub download_url: String,
    pub file_size: u64,
    pub kind: ExportKind,
}

/// Export job lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// At most one export job is modeled at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub phase: ExportPhase,
    pub kind: Option<ExportKind>,
    /// 0..=100, monotonically non-decreasing while running.
    pub progress: u8,
    pub error: Option<String>,
    pub download_url: Option<String>,
}

impl ExportJob {
    pub fn is_exporting(&self) -> bool {
        self.phase == ExportPhase::Running
    }
}

impl Default for ExportJob {
    fn default() -> Self {
        Self {
            phase: ExportPhase::Idle,
            kind: None,
            progress: 0,
            error: None,
            download_url: None,
        }
    }
}
