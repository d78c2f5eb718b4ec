//! Deterministic state container.
//!
//! All mutation flows through one dispatch path: a closed [`Action`] sum
//! type reduced by an exhaustive pure function. Observers only ever see
//! complete snapshots; a dispatch is never observable half-applied.

pub mod action;
pub mod container;
pub mod reducer;

use livesync_core::model::{ConnectionSnapshot, ExportJob, PerformanceSnapshot, ViewState};
use livesync_core::presets;

pub use action::{Action, ExportAction, PerfAction, TransportEvent, ViewAction};
pub use container::{ObserverId, StateContainer};
pub use reducer::reduce;

/// Composite preview state. The container is the only writer.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub connection: ConnectionSnapshot,
    pub view: ViewState,
    pub perf: PerformanceSnapshot,
    pub export: ExportJob,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            connection: ConnectionSnapshot::default(),
            view: ViewState {
                viewport: presets::default_preset().viewport(),
                zoom: 1.0,
                pan: Default::default(),
                fullscreen: false,
                device_switching: false,
            },
            perf: PerformanceSnapshot::default(),
            export: ExportJob::default(),
        }
    }
}
