//! Plan Orchestrator
//!
//! Per-record state machine:
//! `Idle -> Uploading -> Analyzed -> Structuring -> Structured`, with
//! `Failed` reachable from `Uploading` on error.

mod guard;
mod view;
mod workflow;

pub use guard::InFlightGuard;
pub use view::{Flow, PlanPhase, ViewState};
pub use workflow::{BOARD_ROUTE, BoardHandoff, PlanOrchestrator};
