//! Pure reducer: `(state, action) -> state`.
//!
//! No side effects, no scheduling. Invariants live here: the zoom clamp,
//! monotone export progress, atomic fit-to-screen, wholesale performance
//! replacement, and the terminal-only export transitions.

use livesync_core::error::ErrorKind;
use livesync_core::model::{
    ConnectionSnapshot, ConnectionStatus, ExportJob, ExportPhase, LastError, ViewState,
};

use super::action::{Action, ExportAction, PerfAction, TransportEvent, ViewAction};
use super::PreviewState;

pub fn reduce(state: &PreviewState, action: &Action) -> PreviewState {
    let mut next = state.clone();
    match action {
        Action::Transport(ev) => reduce_transport(&mut next.connection, ev),
        Action::View(a) => reduce_view(&mut next.view, a),
        Action::Perf(PerfAction::Sampled(snap)) => next.perf = snap.clone(),
        Action::Export(a) => reduce_export(&mut next.export, a),
    }
    next
}

fn reduce_transport(conn: &mut ConnectionSnapshot, ev: &TransportEvent) {
    match ev {
        TransportEvent::Connecting => {
            conn.status = ConnectionStatus::Connecting;
        }
        TransportEvent::Opened => {
            conn.status = ConnectionStatus::Open;
            conn.reconnect_attempts = 0;
            conn.last_error = None;
        }
        TransportEvent::Closing => {
            conn.status = ConnectionStatus::Closing;
        }
        TransportEvent::Closed { error } => {
            conn.status = ConnectionStatus::Closed;
            if let Some(e) = error {
                conn.last_error = Some(e.clone());
            }
        }
        TransportEvent::ReconnectScheduled { attempt } => {
            conn.reconnect_attempts = *attempt;
        }
        TransportEvent::ReconnectExhausted { attempts } => {
            conn.status = ConnectionStatus::Closed;
            conn.reconnect_attempts = *attempts;
            conn.last_error = Some(LastError {
                code: ErrorKind::ReconnectExhausted.as_str().to_string(),
                message: format!("gave up after {attempts} reconnect attempts"),
            });
        }
        TransportEvent::PongReceived { at } => {
            conn.last_pong = Some(*at);
        }
        TransportEvent::RemoteError { .. } => {}
    }
}

fn reduce_view(view: &mut ViewState, a: &ViewAction) {
    match a {
        ViewAction::SetViewport(vp) => {
            view.viewport = vp.clone();
            view.device_switching = true;
        }
        ViewAction::DeviceSwitchSettled => {
            view.device_switching = false;
        }
        ViewAction::SetZoom(z) => {
            view.zoom = ViewState::clamp_zoom(*z);
        }
        ViewAction::ZoomIn => {
            view.zoom = ViewState::clamp_zoom(view.zoom * ViewState::ZOOM_STEP);
        }
        ViewAction::ZoomOut => {
            view.zoom = ViewState::clamp_zoom(view.zoom / ViewState::ZOOM_STEP);
        }
        ViewAction::ResetZoom => {
            view.zoom = 1.0;
        }
        ViewAction::SetPan(p) => {
            view.pan = *p;
        }
        ViewAction::ResetPan => {
            view.pan = Default::default();
        }
        ViewAction::FitToScreen => {
            // both fields change in one transition
            view.zoom = 1.0;
            view.pan = Default::default();
        }
        ViewAction::SetFullscreen(on) | ViewAction::FullscreenChanged(on) => {
            view.fullscreen = *on;
        }
    }
}

fn reduce_export(job: &mut ExportJob, a: &ExportAction) {
    match a {
        ExportAction::Started { kind } => {
            *job = ExportJob {
                phase: ExportPhase::Running,
                kind: Some(*kind),
                progress: 0,
                error: None,
                download_url: None,
            };
        }
        // terminal transitions apply only to a running job, which makes
        // late ticks from an already-finished task harmless
        ExportAction::Progress(p) => {
            if job.phase == ExportPhase::Running {
                job.progress = job.progress.max((*p).min(100));
            }
        }
        ExportAction::Succeeded { download_url } => {
            if job.phase == ExportPhase::Running {
                job.phase = ExportPhase::Succeeded;
                job.progress = 100;
                job.download_url = Some(download_url.clone());
            }
        }
        ExportAction::Failed { error } => {
            if job.phase == ExportPhase::Running {
                job.phase = ExportPhase::Failed;
                job.error = Some(error.clone());
            }
        }
        ExportAction::Cancelled => {
            if job.phase == ExportPhase::Running {
                job.phase = ExportPhase::Cancelled;
                job.progress = 0;
                job.error = None;
            }
        }
    }
}
