//! Per-record in-flight flags

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::debug;

use super::view::{Flow, PlanPhase, ViewState};
use crate::error::PlanError;

/// Holds one flow's in-flight flag until dropped
///
/// If the flow is abandoned (its future dropped) while the view still shows
/// it as active, dropping the guard clears the busy indicators and restores
/// the fallback phase before releasing the flag.
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    flow: Flow,
    view: &'a watch::Sender<ViewState>,
    fallback: PlanPhase,
}

impl<'a> InFlightGuard<'a> {
    /// Claim the flag, or fail with `InFlight` if it is already held
    pub fn acquire(
        flag: &'a AtomicBool,
        flow: Flow,
        view: &'a watch::Sender<ViewState>,
    ) -> Result<Self, PlanError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PlanError::InFlight(flow))?;
        debug!(%flow, "InFlightGuard::acquire: claimed");
        let fallback = view.borrow().phase;
        Ok(Self {
            flag,
            flow,
            view,
            fallback,
        })
    }

    /// Phase restored if the flow is abandoned
    pub fn fallback(&self) -> PlanPhase {
        self.fallback
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let active = self.flow.active_phase();
        let fallback = self.fallback;
        let restored = self.view.send_if_modified(|view| {
            if view.phase != active {
                return false;
            }
            view.phase = fallback;
            view.uploading = false;
            view.processing = false;
            view.last_error = Some(format!("{} abandoned", self.flow));
            true
        });
        if restored {
            debug!(flow = %self.flow, %fallback, "InFlightGuard::drop: flow abandoned, view restored");
        }
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let flag = AtomicBool::new(false);
        let (view, _rx) = watch::channel(ViewState::for_narrative(None));

        let guard = InFlightGuard::acquire(&flag, Flow::Upload, &view).unwrap();
        let err = InFlightGuard::acquire(&flag, Flow::Upload, &view).err().unwrap();
        assert!(err.is_in_flight());

        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlightGuard::acquire(&flag, Flow::Upload, &view).is_ok());
    }

    #[test]
    fn test_drop_restores_abandoned_view() {
        let flag = AtomicBool::new(false);
        let (view, rx) = watch::channel(ViewState::for_narrative(Some("old plan")));

        let guard = InFlightGuard::acquire(&flag, Flow::Upload, &view).unwrap();
        assert_eq!(guard.fallback(), PlanPhase::Analyzed);
        view.send_modify(|v| {
            v.phase = PlanPhase::Uploading;
            v.uploading = true;
        });
        drop(guard);

        let state = rx.borrow().clone();
        assert_eq!(state.phase, PlanPhase::Analyzed);
        assert!(!state.uploading);
        assert_eq!(state.narrative, "old plan");
    }

    #[test]
    fn test_drop_leaves_settled_view_alone() {
        let flag = AtomicBool::new(false);
        let (view, rx) = watch::channel(ViewState::for_narrative(None));

        let guard = InFlightGuard::acquire(&flag, Flow::Upload, &view).unwrap();
        view.send_modify(|v| v.phase = PlanPhase::Failed);
        drop(guard);

        assert_eq!(rx.borrow().phase, PlanPhase::Failed);
        assert!(rx.borrow().last_error.is_none());
    }
}
