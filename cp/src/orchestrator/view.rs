//! View state published to the presentation layer

use std::fmt;

use serde::Serialize;

use crate::domain::Citation;

/// Phase of the per-record workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPhase {
    /// Nothing analysed yet
    Idle,
    /// Last upload-and-analyze attempt failed
    Failed,
    /// Upload-and-analyze in flight
    Uploading,
    /// Narrative available
    Analyzed,
    /// Structuring in flight
    Structuring,
    /// Board produced and persisted
    Structured,
}

impl fmt::Display for PlanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanPhase::Idle => "idle",
            PlanPhase::Failed => "failed",
            PlanPhase::Uploading => "uploading",
            PlanPhase::Analyzed => "analyzed",
            PlanPhase::Structuring => "structuring",
            PlanPhase::Structured => "structured",
        };
        f.write_str(s)
    }
}

/// The two long-running flows a record can have in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Upload,
    Structuring,
}

impl Flow {
    /// Phase shown while this flow runs
    pub fn active_phase(&self) -> PlanPhase {
        match self {
            Flow::Upload => PlanPhase::Uploading,
            Flow::Structuring => PlanPhase::Structuring,
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Upload => f.write_str("upload"),
            Flow::Structuring => f.write_str("structuring"),
        }
    }
}

/// Snapshot of what the record view should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub phase: PlanPhase,
    /// Upload progress, 0-100
    pub progress: u8,
    pub uploading: bool,
    pub upload_success: bool,
    /// Structuring in progress
    pub processing: bool,
    /// Narrative text to render (Markdown)
    pub narrative: String,
    /// Citations from the most recent analysis
    pub citations: Vec<Citation>,
    pub last_error: Option<String>,
}

impl ViewState {
    /// Initial view for a record, given its stored narrative
    pub fn for_narrative(narrative: Option<&str>) -> Self {
        let narrative = narrative.unwrap_or_default().to_string();
        Self {
            phase: if narrative.is_empty() {
                PlanPhase::Idle
            } else {
                PlanPhase::Analyzed
            },
            progress: 0,
            uploading: false,
            upload_success: false,
            processing: false,
            narrative,
            citations: Vec::new(),
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_phase() {
        assert_eq!(ViewState::for_narrative(None).phase, PlanPhase::Idle);
        assert_eq!(ViewState::for_narrative(Some("")).phase, PlanPhase::Idle);
        assert_eq!(ViewState::for_narrative(Some("Plan")).phase, PlanPhase::Analyzed);
    }

    #[test]
    fn test_flow_display() {
        assert_eq!(Flow::Upload.to_string(), "upload");
        assert_eq!(Flow::Structuring.to_string(), "structuring");
        assert_eq!(Flow::Structuring.active_phase(), PlanPhase::Structuring);
    }
}
