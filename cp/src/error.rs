//! Error taxonomy for the plan workflow
//!
//! Every failure that can reach the presentation layer is a `PlanError`.
//! Provider transport problems are carried as the `LlmError` source of the
//! variant naming the operation that failed.

use thiserror::Error;

use crate::encoder::EncodingError;
use crate::llm::LlmError;
use crate::orchestrator::Flow;
use crate::state::StateError;

/// Errors surfaced by the session client and the orchestrator
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upload failed: {0}")]
    Upload(#[source] LlmError),

    #[error("Analysis failed: {0}")]
    Analysis(#[source] LlmError),

    #[error("Stream ended before completion: {0}")]
    Stream(String),

    #[error("Plan generation failed: {0}")]
    Generation(#[source] LlmError),

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Image description failed: {0}")]
    Description(#[source] LlmError),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("{0} already in flight for this record")]
    InFlight(Flow),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl PlanError {
    /// Short machine-readable kind, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::Encoding(_) => "encoding",
            PlanError::Configuration(_) => "configuration",
            PlanError::Upload(_) => "upload",
            PlanError::Analysis(_) => "analysis",
            PlanError::Stream(_) => "stream",
            PlanError::Generation(_) => "generation",
            PlanError::MalformedPlan(_) => "malformed_plan",
            PlanError::Description(_) => "description",
            PlanError::Persistence(_) => "persistence",
            PlanError::InFlight(_) => "in_flight",
            PlanError::InvalidState(_) => "invalid_state",
        }
    }

    /// True if the request was refused because another flow is running
    pub fn is_in_flight(&self) -> bool {
        matches!(self, PlanError::InFlight(_))
    }
}

impl From<StateError> for PlanError {
    fn from(e: StateError) -> Self {
        PlanError::Persistence(e.to_string())
    }
}
