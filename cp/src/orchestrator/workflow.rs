//! PlanOrchestrator - per-record upload, analysis and structuring workflow

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use recordstore::{Record, RecordUpdate};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::guard::InFlightGuard;
use super::view::{Flow, PlanPhase, ViewState};
use crate::domain::BoardPayload;
use crate::encoder::{DocumentUpload, encode_file};
use crate::error::PlanError;
use crate::llm::{AnalysisOutcome, GenerativeSessionClient};
use crate::state::RecordStore;

/// Route the board view is reached through
pub const BOARD_ROUTE: &str = "/screening-schedules";

/// Navigation handoff produced by successful structuring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardHandoff {
    pub route: &'static str,
    pub board: BoardPayload,
}

/// Sequences encoder, session client and record store calls for one record
///
/// View state is published on a watch channel. At most one upload and one
/// structuring flow run at a time, and never both at once.
///
/// The in-flight flags belong to this instance. Create one orchestrator per
/// open record and share it (behind an `Arc`) with everything that can
/// trigger a flow; two orchestrators built for the same record are not
/// serialized against each other.
pub struct PlanOrchestrator {
    record_id: String,
    client: Arc<dyn GenerativeSessionClient>,
    store: Arc<dyn RecordStore>,
    view: watch::Sender<ViewState>,
    uploading: AtomicBool,
    structuring: AtomicBool,
}

impl PlanOrchestrator {
    pub fn new(record: &Record, client: Arc<dyn GenerativeSessionClient>, store: Arc<dyn RecordStore>) -> Self {
        debug!(record_id = %record.id, has_narrative = record.narrative().is_some(), "PlanOrchestrator::new: called");
        let (view, _) = watch::channel(ViewState::for_narrative(record.narrative()));
        Self {
            record_id: record.id.clone(),
            client,
            store,
            view,
            uploading: AtomicBool::new(false),
            structuring: AtomicBool::new(false),
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Receive view snapshots as they change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Current view snapshot
    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn phase(&self) -> PlanPhase {
        self.view.borrow().phase
    }

    /// Claim `flow`, refusing if either flow is already running
    fn claim(&self, flow: Flow) -> Result<InFlightGuard<'_>, PlanError> {
        let (own, other, other_flow) = match flow {
            Flow::Upload => (&self.uploading, &self.structuring, Flow::Structuring),
            Flow::Structuring => (&self.structuring, &self.uploading, Flow::Upload),
        };
        let guard = InFlightGuard::acquire(own, flow, &self.view)?;
        if other.load(Ordering::Acquire) {
            debug!(%flow, %other_flow, "claim: other flow in flight");
            return Err(PlanError::InFlight(other_flow));
        }
        Ok(guard)
    }

    /// Upload a document, analyse it and persist the narrative
    ///
    /// On provider failure the phase becomes `Failed`, the previous narrative
    /// stays visible and nothing is written. If analysis succeeds but the
    /// write fails, the new narrative is still shown and the persistence
    /// error is returned.
    pub async fn initiate_upload(&self, document: DocumentUpload) -> Result<AnalysisOutcome, PlanError> {
        debug!(record_id = %self.record_id, filename = %document.filename, "initiate_upload: called");
        let _guard = self.claim(Flow::Upload)?;

        self.view.send_modify(|v| {
            v.phase = PlanPhase::Uploading;
            v.uploading = true;
            v.upload_success = false;
            v.progress = 0;
            v.last_error = None;
        });
        info!(record_id = %self.record_id, "Upload started");

        let outcome = match self.client.upload_and_analyze(&document).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(record_id = %self.record_id, kind = e.kind(), error = %e, "Upload and analysis failed");
                self.view.send_modify(|v| {
                    v.phase = PlanPhase::Failed;
                    v.uploading = false;
                    v.upload_success = false;
                    v.progress = 100;
                    v.last_error = Some(e.to_string());
                });
                return Err(e);
            }
        };

        self.view.send_modify(|v| {
            v.phase = PlanPhase::Analyzed;
            v.uploading = false;
            v.upload_success = true;
            v.progress = 100;
            v.narrative = outcome.narrative.clone();
            v.citations = outcome.citations.clone();
        });
        info!(record_id = %self.record_id, citations = outcome.citations.len(), "Analysis received");

        if let Err(e) = self.persist_narrative(&outcome.narrative).await {
            warn!(record_id = %self.record_id, error = %e, "Narrative not persisted");
            self.view.send_modify(|v| {
                v.upload_success = false;
                v.last_error = Some(e.to_string());
            });
            return Err(e);
        }

        Ok(outcome)
    }

    async fn persist_narrative(&self, narrative: &str) -> Result<(), PlanError> {
        debug!(record_id = %self.record_id, "persist_narrative: called");
        let stored = self
            .store
            .update(RecordUpdate::analysis(&self.record_id, narrative))
            .await?;
        if stored.id != self.record_id || stored.analysis_result.as_deref() != Some(narrative) {
            return Err(PlanError::Persistence(format!(
                "store returned record {} without the submitted narrative",
                stored.id
            )));
        }
        Ok(())
    }

    /// Turn the current narrative into a board, persist it and hand it off
    ///
    /// On any failure the previous phase is restored, nothing partial is
    /// persisted and no handoff is produced.
    pub async fn request_structuring(&self) -> Result<BoardHandoff, PlanError> {
        debug!(record_id = %self.record_id, "request_structuring: called");
        let guard = self.claim(Flow::Structuring)?;
        let prior = guard.fallback();

        let narrative = {
            let view = self.view.borrow();
            let structurable = matches!(view.phase, PlanPhase::Analyzed | PlanPhase::Structured)
                || (view.phase == PlanPhase::Failed && !view.narrative.is_empty());
            if !structurable || view.narrative.is_empty() {
                return Err(PlanError::InvalidState(format!(
                    "cannot structure from phase {} without a narrative",
                    view.phase
                )));
            }
            view.narrative.clone()
        };

        self.view.send_modify(|v| {
            v.phase = PlanPhase::Structuring;
            v.processing = true;
            v.last_error = None;
        });
        info!(record_id = %self.record_id, "Structuring started");

        let result = match self.client.structure_plan(&narrative).await {
            Ok(plan) => self.persist_board(&plan.raw).await.map(|_| plan.board),
            Err(e) => Err(e),
        };

        match result {
            Ok(board) => {
                self.view.send_modify(|v| {
                    v.phase = PlanPhase::Structured;
                    v.processing = false;
                });
                info!(record_id = %self.record_id, tasks = board.tasks.len(), "Board structured");
                Ok(BoardHandoff {
                    route: BOARD_ROUTE,
                    board,
                })
            }
            Err(e) => {
                warn!(record_id = %self.record_id, kind = e.kind(), error = %e, "Structuring failed");
                self.view.send_modify(|v| {
                    v.phase = prior;
                    v.processing = false;
                    v.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    async fn persist_board(&self, raw: &str) -> Result<(), PlanError> {
        debug!(record_id = %self.record_id, len = raw.len(), "persist_board: called");
        let stored = self.store.update(RecordUpdate::board(&self.record_id, raw)).await?;
        if stored.id != self.record_id || stored.kanban_records.as_deref() != Some(raw) {
            return Err(PlanError::Persistence(format!(
                "store returned record {} without the submitted board",
                stored.id
            )));
        }
        Ok(())
    }

    /// Describe an image file; does not touch record state
    pub async fn describe_image(&self, path: impl AsRef<Path>) -> Result<String, PlanError> {
        debug!(path = %path.as_ref().display(), "describe_image: called");
        let image = encode_file(path).await?;
        self.client.describe_image(&image).await
    }
}
