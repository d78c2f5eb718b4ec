//! State container: single dispatch path + observer notification.
//!
//! Observers are invoked synchronously, in registration order, after each
//! reduce step. A dispatch issued from inside an observer callback (or
//! from another task while a dispatch is draining) is deferred onto a
//! pending queue and applied after the current notification step, so the
//! reducer never runs re-entrantly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::debug;

use livesync_core::error::ErrorKind;
use livesync_core::model::{ExportJob, LastError, PerformanceSnapshot};

use super::action::{Action, ExportAction, PerfAction, TransportEvent};
use super::reducer::reduce;
use super::PreviewState;

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

enum Observer {
    Update(Box<dyn Fn(&PreviewState) + Send + Sync>),
    Error(Box<dyn Fn(&LastError) + Send + Sync>),
    Performance(Box<dyn Fn(&PerformanceSnapshot) + Send + Sync>),
    Export(Box<dyn Fn(&ExportJob) + Send + Sync>),
}

#[derive(Default)]
struct ObserverSet {
    next_id: u64,
    entries: Vec<(u64, Arc<Observer>)>,
}

#[derive(Default)]
struct DispatchQueue {
    pending: VecDeque<Action>,
    draining: bool,
}

#[derive(Default)]
pub struct StateContainer {
    state: Mutex<PreviewState>,
    observers: Mutex<ObserverSet>,
    queue: Mutex<DispatchQueue>,
}

impl StateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot of the composite state.
    pub fn snapshot(&self) -> PreviewState {
        match self.state.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply one action and notify observers.
    ///
    /// Re-entrant calls are queued and drained by the outermost dispatch.
    pub fn dispatch(&self, action: Action) {
        {
            let mut q = match self.queue.lock() {
                Ok(q) => q,
                Err(p) => p.into_inner(),
            };
            q.pending.push_back(action);
            if q.draining {
                return;
            }
            q.draining = true;
        }

        loop {
            let action = {
                let mut q = match self.queue.lock() {
                    Ok(q) => q,
                    Err(p) => p.into_inner(),
                };
                match q.pending.pop_front() {
                    Some(a) => a,
                    None => {
                        q.draining = false;
                        return;
                    }
                }
            };

            let next = {
                let mut s = match self.state.lock() {
                    Ok(s) => s,
                    Err(p) => p.into_inner(),
                };
                let next = reduce(&s, &action);
                *s = next.clone();
                next
            };

            debug!(action = ?action, "state action applied");
            self.notify(&action, &next);
        }
    }

    // --------------------
    // Observer registration
    // --------------------

    pub fn on_update(
        &self,
        f: impl Fn(&PreviewState) + Send + Sync + 'static,
    ) -> ObserverId {
        self.register(Observer::Update(Box::new(f)))
    }

    pub fn on_error(&self, f: impl Fn(&LastError) + Send + Sync + 'static) -> ObserverId {
        self.register(Observer::Error(Box::new(f)))
    }

    pub fn on_performance(
        &self,
        f: impl Fn(&PerformanceSnapshot) + Send + Sync + 'static,
    ) -> ObserverId {
        self.register(Observer::Performance(Box::new(f)))
    }

    pub fn on_export(&self, f: impl Fn(&ExportJob) + Send + Sync + 'static) -> ObserverId {
        self.register(Observer::Export(Box::new(f)))
    }

    /// Remove an observer; returns whether it was present.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut set = match self.observers.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };
        let before = set.entries.len();
        set.entries.retain(|(oid, _)| *oid != id.0);
        set.entries.len() != before
    }

    fn register(&self, obs: Observer) -> ObserverId {
        let mut set = match self.observers.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };
        set.next_id += 1;
        let id = set.next_id;
        set.entries.push((id, Arc::new(obs)));
        ObserverId(id)
    }

    // --------------------
    // Notification
    // --------------------

    fn notify(&self, action: &Action, next: &PreviewState) {
        // snapshot the list so callbacks may register/remove observers
        let entries: Vec<Arc<Observer>> = {
            let set = match self.observers.lock() {
                Ok(s) => s,
                Err(p) => p.into_inner(),
            };
            set.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
        };

        let error = error_note(action);
        let perf = matches!(action, Action::Perf(PerfAction::Sampled(_)));
        let export = matches!(action, Action::Export(_));

        for obs in entries {
            match obs.as_ref() {
                Observer::Update(f) => f(next),
                Observer::Error(f) => {
                    if let Some(e) = &error {
                        f(e);
                    }
                }
                Observer::Performance(f) => {
                    if perf {
                        f(&next.perf);
                    }
                }
                Observer::Export(f) => {
                    if export {
                        f(&next.export);
                    }
                }
            }
        }
    }
}

/// Which actions carry an error worth surfacing to error observers.
fn error_note(action: &Action) -> Option<LastError> {
    match action {
        Action::Transport(TransportEvent::Closed { error: Some(e) }) => Some(e.clone()),
        Action::Transport(TransportEvent::ReconnectExhausted { attempts }) => Some(LastError {
            code: ErrorKind::ReconnectExhausted.as_str().to_string(),
            message: format!("gave up after {attempts} reconnect attempts"),
        }),
        Action::Transport(TransportEvent::RemoteError { message }) => Some(LastError {
            code: ErrorKind::Remote.as_str().to_string(),
            message: message.clone(),
        }),
        Action::Export(ExportAction::Failed { error }) => Some(LastError {
            code: ErrorKind::ExportFailed.as_str().to_string(),
            message: error.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::action::ViewAction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn observers_fire_in_registration_order() {
        let c = Arc::new(StateContainer::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            c.on_update(move |_| order.lock().unwrap().push(tag));
        }
        c.dispatch(Action::View(ViewAction::ZoomIn));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn reentrant_dispatch_is_deferred() {
        let c = Arc::new(StateContainer::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::clone(&c);
        let seen_a = Arc::clone(&seen);
        c.on_update(move |s| {
            seen_a.lock().unwrap().push(s.view.zoom);
            // trigger exactly once, from the first notification
            if s.view.zoom > 1.0 && s.view.zoom < 1.3 {
                inner.dispatch(Action::View(ViewAction::FitToScreen));
            }
        });

        c.dispatch(Action::View(ViewAction::ZoomIn));

        // both notifications arrived; the nested one after the first
        let zooms = seen.lock().unwrap().clone();
        assert_eq!(zooms.len(), 2);
        assert!((zooms[0] - 1.2).abs() < 1e-6);
        assert_eq!(zooms[1], 1.0);
        assert_eq!(c.snapshot().view.zoom, 1.0);
    }

    #[test]
    fn removed_observer_stops_firing() {
        let c = StateContainer::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = c.on_update(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        c.dispatch(Action::View(ViewAction::ZoomIn));
        assert!(c.remove_observer(id));
        assert!(!c.remove_observer(id));
        c.dispatch(Action::View(ViewAction::ZoomIn));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_observers_see_transport_failures() {
        let c = StateContainer::new();
        let codes = Arc::new(Mutex::new(Vec::new()));
        let cs = Arc::clone(&codes);
        c.on_error(move |e| cs.lock().unwrap().push(e.code.clone()));

        c.dispatch(Action::Transport(TransportEvent::Closed {
            error: Some(LastError {
                code: "CONNECT_FAILED".into(),
                message: "refused".into(),
            }),
        }));
        c.dispatch(Action::Transport(TransportEvent::Closed { error: None }));
        c.dispatch(Action::Transport(TransportEvent::ReconnectExhausted {
            attempts: 4,
        }));

        assert_eq!(
            *codes.lock().unwrap(),
            vec!["CONNECT_FAILED".to_string(), "RECONNECT_EXHAUSTED".into()]
        );
    }

    #[test]
    fn export_observers_track_job() {
        use livesync_core::model::ExportKind;
        let c = StateContainer::new();
        let phases = Arc::new(Mutex::new(Vec::new()));
        let ps = Arc::clone(&phases);
        c.on_export(move |j| ps.lock().unwrap().push((j.phase, j.progress)));

        c.dispatch(Action::Export(ExportAction::Started {
            kind: ExportKind::Pdf,
        }));
        c.dispatch(Action::Export(ExportAction::Progress(50)));
        c.dispatch(Action::Export(ExportAction::Succeeded {
            download_url: "/exports/a.pdf".into(),
        }));

        use livesync_core::model::ExportPhase::*;
        assert_eq!(
            *phases.lock().unwrap(),
            vec![(Running, 0), (Running, 50), (Succeeded, 100)]
        );
    }
}
