//! Board Payload - the three-column task list derived from a narrative

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlanError;

/// The fixed board columns, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnId {
    /// Tasks that need to be started
    Todo,
    /// Tasks that are in progress
    Doing,
    /// Tasks that are completed
    Done,
}

impl ColumnId {
    pub const ALL: [ColumnId; 3] = [ColumnId::Todo, ColumnId::Doing, ColumnId::Done];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnId::Todo => "todo",
            ColumnId::Doing => "doing",
            ColumnId::Done => "done",
        }
    }

    /// Default column title
    pub fn title(&self) -> &'static str {
        match self {
            ColumnId::Todo => "Todo",
            ColumnId::Doing => "Work in progress",
            ColumnId::Done => "Done",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A board column as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
}

/// A single task bound to one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(rename = "columnId")]
    pub column_id: String,

    pub content: String,
}

/// Structured treatment-plan board
///
/// Boards coming from a model reply go through [`BoardPayload::parse`],
/// which runs [`BoardPayload::validate`]. A board built by hand or
/// deserialized directly is unchecked until `validate` is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPayload {
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\r?\n(?P<body>.*?)\r?\n?[ \t]*```\s*$").expect("valid code fence regex")
});

/// Remove one surrounding Markdown code fence, if the whole text is fenced
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.name("body")) {
        Some(body) => body.as_str().trim(),
        None => text.trim(),
    }
}

impl BoardPayload {
    /// Parse and validate a model reply
    ///
    /// A single surrounding code fence is tolerated. Anything that is not a
    /// complete, schema-valid board is `MalformedPlan`.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        debug!(len = text.len(), "BoardPayload::parse: called");
        let body = strip_code_fence(text);
        let board: BoardPayload =
            serde_json::from_str(body).map_err(|e| PlanError::MalformedPlan(format!("not a board payload: {}", e)))?;
        board.validate()?;
        Ok(board)
    }

    /// Check the board against the fixed column set
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            let Some(id) = ColumnId::parse(&column.id) else {
                return Err(PlanError::MalformedPlan(format!("unknown column id '{}'", column.id)));
            };
            if !seen.insert(id) {
                return Err(PlanError::MalformedPlan(format!("duplicate column id '{}'", column.id)));
            }
        }
        if let Some(missing) = ColumnId::ALL.iter().find(|c| !seen.contains(c)) {
            return Err(PlanError::MalformedPlan(format!("missing column '{}'", missing)));
        }

        let mut task_ids = HashSet::new();
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(PlanError::MalformedPlan("task with empty id".to_string()));
            }
            if !task_ids.insert(task.id.as_str()) {
                return Err(PlanError::MalformedPlan(format!("duplicate task id '{}'", task.id)));
            }
            if ColumnId::parse(&task.column_id).is_none() {
                return Err(PlanError::MalformedPlan(format!(
                    "task '{}' references unknown column '{}'",
                    task.id, task.column_id
                )));
            }
        }

        Ok(())
    }

    /// Tasks in one column, in payload order
    pub fn tasks_in(&self, column: ColumnId) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.column_id == column.as_str()).collect()
    }

    /// Title shown for a column, falling back to the default
    pub fn column_title(&self, column: ColumnId) -> &str {
        self.columns
            .iter()
            .find(|c| c.id == column.as_str())
            .map(|c| c.title.as_str())
            .unwrap_or(column.title())
    }
}
