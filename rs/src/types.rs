//! Record and user types

use serde::{Deserialize, Serialize};

/// The owner of a set of records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// One uploaded case and the results derived from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    pub id: String,

    /// Email of the owning user
    pub owner_email: String,

    /// Human-readable record name
    pub record_name: String,

    /// Narrative treatment-plan text, once analysed
    pub analysis_result: Option<String>,

    /// Serialized board payload, once structured
    pub kanban_records: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Record {
    /// Narrative text, treating an empty string as absent
    pub fn narrative(&self) -> Option<&str> {
        self.analysis_result.as_deref().filter(|s| !s.is_empty())
    }

    /// Serialized board text, treating an empty string as absent
    pub fn board_text(&self) -> Option<&str> {
        self.kanban_records.as_deref().filter(|s| !s.is_empty())
    }
}

/// Fields needed to create a record
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub owner_email: String,
    pub record_name: String,
}

impl NewRecord {
    pub fn new(owner_email: impl Into<String>, record_name: impl Into<String>) -> Self {
        Self {
            owner_email: owner_email.into(),
            record_name: record_name.into(),
        }
    }
}

/// A partial update to a record
///
/// Fields left as `None` are not touched. `kanban_records` distinguishes
/// "leave alone" (`None`) from "clear" (`Some(None)`) and "set"
/// (`Some(Some(text))`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    /// Record to update
    pub document_id: String,

    /// New narrative text
    pub analysis_result: Option<String>,

    /// New board payload text, or `Some(None)` to clear it
    pub kanban_records: Option<Option<String>>,
}

impl RecordUpdate {
    /// Store fresh narrative text and clear any board derived from the old one
    pub fn analysis(document_id: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            analysis_result: Some(narrative.into()),
            kanban_records: Some(None),
        }
    }

    /// Store a structured board, leaving the narrative alone
    pub fn board(document_id: impl Into<String>, board_text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            analysis_result: None,
            kanban_records: Some(Some(board_text.into())),
        }
    }

    /// True if the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.analysis_result.is_none() && self.kanban_records.is_none()
    }
}
