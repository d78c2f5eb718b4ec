//! View state controller.
//!
//! Mutates view state only by dispatching actions; works the same whether
//! the connection is up or not. Device switches raise a transient reflow
//! indicator that settles on a timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use livesync_core::error::{Result, SyncError};
use livesync_core::model::{DeviceViewport, PanOffset};
use livesync_core::presets;

use crate::config::ViewSection;
use crate::state::{Action, StateContainer, ViewAction};

pub struct ViewController {
    container: Arc<StateContainer>,
    settle: Duration,
    /// Monotonic switch marker; a settle timer only fires for the switch
    /// it belongs to.
    switch_epoch: Arc<AtomicU64>,
}

impl ViewController {
    pub fn new(container: Arc<StateContainer>, cfg: &ViewSection) -> Self {
        Self {
            container,
            settle: Duration::from_millis(cfg.device_switch_settle_ms),
            switch_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the simulated device. Synchronous from the caller's
    /// perspective; the reflow indicator clears on its own.
    pub fn set_device_viewport(&self, viewport: DeviceViewport) {
        let epoch = self.switch_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.container
            .dispatch(Action::View(ViewAction::SetViewport(viewport)));

        let container = Arc::clone(&self.container);
        let epochs = Arc::clone(&self.switch_epoch);
        let settle = self.settle;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            if epochs.load(Ordering::SeqCst) == epoch {
                container.dispatch(Action::View(ViewAction::DeviceSwitchSettled));
            }
        });
    }

    /// Apply a preset from the static catalog.
    pub fn select_preset(&self, id: &str) -> Result<()> {
        let preset = presets::by_id(id)
            .ok_or_else(|| SyncError::Config(format!("unknown device preset: {id}")))?;
        self.set_device_viewport(preset.viewport());
        Ok(())
    }

    pub fn set_zoom(&self, zoom: f32) {
        self.container
            .dispatch(Action::View(ViewAction::SetZoom(zoom)));
    }

    pub fn zoom_in(&self) {
        self.container.dispatch(Action::View(ViewAction::ZoomIn));
    }

    pub fn zoom_out(&self) {
        self.container.dispatch(Action::View(ViewAction::ZoomOut));
    }

    pub fn reset_zoom(&self) {
        self.container.dispatch(Action::View(ViewAction::ResetZoom));
    }

    pub fn set_pan(&self, x: f32, y: f32) {
        self.container
            .dispatch(Action::View(ViewAction::SetPan(PanOffset { x, y })));
    }

    pub fn reset_pan(&self) {
        self.container.dispatch(Action::View(ViewAction::ResetPan));
    }

    /// Zoom 1.0 and pan {0,0} in one transition.
    pub fn fit_to_screen(&self) {
        self.container
            .dispatch(Action::View(ViewAction::FitToScreen));
    }

    pub fn set_fullscreen(&self, on: bool) {
        self.container
            .dispatch(Action::View(ViewAction::SetFullscreen(on)));
    }

    /// Mirror an external fullscreen-change notification; idempotent.
    pub fn handle_fullscreen_change(&self, on: bool) {
        self.container
            .dispatch(Action::View(ViewAction::FullscreenChanged(on)));
    }
}
