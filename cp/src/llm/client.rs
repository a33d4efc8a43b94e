//! GenerativeSessionClient trait definition

use async_trait::async_trait;

use super::{AnalysisOutcome, StructuredPlan};
use crate::encoder::{DocumentUpload, EncodedDocument};
use crate::error::PlanError;

/// The three provider-backed operations the orchestrator depends on
///
/// Each call is independent and performs outbound network calls with a
/// preconfigured credential. None of them retry.
#[async_trait]
pub trait GenerativeSessionClient: Send + Sync {
    /// Upload a document, run the analysis assistant over it and return the
    /// narrative with citation markers rewritten to `[i]`
    async fn upload_and_analyze(&self, document: &DocumentUpload) -> Result<AnalysisOutcome, PlanError>;

    /// Turn narrative text into a validated board
    async fn structure_plan(&self, narrative: &str) -> Result<StructuredPlan, PlanError>;

    /// Describe an image with the vision model
    async fn describe_image(&self, image: &EncodedDocument) -> Result<String, PlanError>;
}
