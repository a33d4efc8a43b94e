//! Session client request/response types
//!
//! The assistant wire types cover only the fields careplan reads from the
//! hosted Assistants API; everything else in the payloads is ignored.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LlmError;
use crate::domain::{Annotation, BoardPayload, Citation, strip_code_fence};
use crate::error::PlanError;

/// Result of a successful upload-and-analyze flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    /// Narrative text with annotation markers rewritten to `[i]`
    pub narrative: String,
    /// One citation per annotation, in marker order
    pub citations: Vec<Citation>,
}

/// Result of a successful structuring call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPlan {
    /// Reply text as persisted (surrounding code fence removed)
    pub raw: String,
    /// Validated board
    pub board: BoardPayload,
}

impl StructuredPlan {
    /// Parse a model reply into a validated plan
    pub fn from_reply(reply: &str) -> Result<Self, PlanError> {
        debug!(len = reply.len(), "StructuredPlan::from_reply: called");
        let raw = strip_code_fence(reply).to_string();
        let board = BoardPayload::parse(&raw)?;
        Ok(Self { raw, board })
    }
}

// === Assistants API objects ===

/// An uploaded provider file
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub purpose: String,
}

/// Any object where only the id matters (assistants, threads)
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

/// A run on a thread
#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl RunObject {
    /// Human-readable failure reason
    pub fn failure_reason(&self) -> String {
        match &self.last_error {
            Some(err) => format!("run {} {}: {} ({})", self.id, self.status, err.message, err.code),
            None => format!("run {} {}", self.id, self.status),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A message on a thread
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Text of the first content block, if that block is text
    pub fn first_text(&self) -> Option<&TextContent> {
        match self.content.first() {
            Some(MessageContent::Text { text }) => Some(text),
            _ => None,
        }
    }
}

/// One content block of a thread message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    #[serde(rename = "text")]
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<WireAnnotation>,
}

impl TextContent {
    pub fn annotations(&self) -> Vec<Annotation> {
        self.annotations.iter().map(WireAnnotation::to_annotation).collect()
    }
}

/// Annotation as sent by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct WireAnnotation {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file_citation: Option<FileRef>,
    #[serde(default)]
    pub file_path: Option<FileRef>,
}

impl WireAnnotation {
    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            text: self.text.clone(),
            file_id: self
                .file_citation
                .as_ref()
                .or(self.file_path.as_ref())
                .map(|f| f.file_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

// === Run stream events ===

/// Typed events from a streamed assistant run
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunCreated(RunObject),
    MessageCreated(ThreadMessage),
    TextDelta(String),
    ToolCallCreated(String),
    MessageCompleted(ThreadMessage),
    RunCompleted(RunObject),
    RunFailed(RunObject),
    Error(String),
    Done,
}

/// Lazy, finite, non-restartable sequence of run events
pub type RunEventStream = Pin<Box<dyn Stream<Item = Result<RunEvent, LlmError>> + Send>>;

impl RunEvent {
    /// Decode one server-sent event
    ///
    /// Returns `Ok(None)` for event kinds careplan does not act on.
    pub fn from_sse(event: &str, data: &str) -> Result<Option<Self>, LlmError> {
        debug!(%event, "RunEvent::from_sse: called");
        let parsed = match event {
            "thread.run.created" => Self::RunCreated(serde_json::from_str(data)?),
            "thread.message.created" => Self::MessageCreated(serde_json::from_str(data)?),
            "thread.message.delta" => {
                let delta: MessageDelta = serde_json::from_str(data)?;
                Self::TextDelta(delta.text())
            }
            "thread.run.step.created" => {
                let step: RunStep = serde_json::from_str(data)?;
                if step.step_details.kind != "tool_calls" {
                    return Ok(None);
                }
                Self::ToolCallCreated(step.id)
            }
            "thread.message.completed" => Self::MessageCompleted(serde_json::from_str(data)?),
            "thread.run.completed" => Self::RunCompleted(serde_json::from_str(data)?),
            "thread.run.failed" | "thread.run.cancelled" | "thread.run.expired" | "thread.run.incomplete" => {
                Self::RunFailed(serde_json::from_str(data)?)
            }
            "error" => Self::Error(error_message(data)),
            "done" => Self::Done,
            _ => {
                debug!(%event, "RunEvent::from_sse: ignoring event");
                return Ok(None);
            }
        };
        Ok(Some(parsed))
    }
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    delta: MessageDeltaBody,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    #[serde(default)]
    content: Vec<MessageDeltaContent>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaContent {
    #[serde(default)]
    text: Option<MessageDeltaText>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaText {
    #[serde(default)]
    value: String,
}

impl MessageDelta {
    fn text(&self) -> String {
        self.delta
            .content
            .iter()
            .filter_map(|c| c.text.as_ref())
            .map(|t| t.value.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RunStep {
    id: String,
    step_details: StepDetails,
}

#[derive(Debug, Deserialize)]
struct StepDetails {
    #[serde(rename = "type")]
    kind: String,
}

fn error_message(data: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(_) => return data.to_string(),
    };
    value["error"]["message"]
        .as_str()
        .or(value["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}

// === Chat completions ===

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETED: &str = r#"{
        "id": "msg_1",
        "object": "thread.message",
        "content": [{
            "type": "text",
            "text": {
                "value": "Result is good 【4:0†source】.",
                "annotations": [{
                    "type": "file_citation",
                    "text": "【4:0†source】",
                    "start_index": 15,
                    "end_index": 27,
                    "file_citation": { "file_id": "file-abc" }
                }]
            }
        }]
    }"#;

    #[test]
    fn test_message_completed_event() {
        let event = RunEvent::from_sse("thread.message.completed", COMPLETED).unwrap().unwrap();
        let RunEvent::MessageCompleted(message) = event else {
            panic!("expected MessageCompleted");
        };
        let text = message.first_text().unwrap();
        assert_eq!(text.value, "Result is good 【4:0†source】.");
        let annotations = text.annotations();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].file_id.as_deref(), Some("file-abc"));
    }

    #[test]
    fn test_file_path_annotation() {
        let json = r#"{"type":"file_path","text":"sandbox:/x.csv","file_path":{"file_id":"file-9"}}"#;
        let wire: WireAnnotation = serde_json::from_str(json).unwrap();
        assert_eq!(wire.to_annotation().file_id.as_deref(), Some("file-9"));
    }

    #[test]
    fn test_non_text_first_block() {
        let json = r#"{"id":"msg_2","content":[{"type":"image_file","image_file":{"file_id":"f"}}]}"#;
        let message: ThreadMessage = serde_json::from_str(json).unwrap();
        assert!(message.first_text().is_none());
    }

    #[test]
    fn test_text_delta_event() {
        let data = r#"{"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hel"}}]}}"#;
        let event = RunEvent::from_sse("thread.message.delta", data).unwrap().unwrap();
        assert!(matches!(event, RunEvent::TextDelta(ref t) if t == "Hel"));
    }

    #[test]
    fn test_tool_call_step_event() {
        let tool = r#"{"id":"step_1","step_details":{"type":"tool_calls","tool_calls":[]}}"#;
        let created = r#"{"id":"step_2","step_details":{"type":"message_creation"}}"#;
        assert!(matches!(
            RunEvent::from_sse("thread.run.step.created", tool).unwrap(),
            Some(RunEvent::ToolCallCreated(ref id)) if id == "step_1"
        ));
        assert!(RunEvent::from_sse("thread.run.step.created", created).unwrap().is_none());
    }

    #[test]
    fn test_failed_run_event() {
        let data = r#"{"id":"run_1","status":"failed","last_error":{"code":"server_error","message":"boom"}}"#;
        let event = RunEvent::from_sse("thread.run.failed", data).unwrap().unwrap();
        let RunEvent::RunFailed(run) = event else {
            panic!("expected RunFailed");
        };
        assert!(run.failure_reason().contains("boom"));
    }

    #[test]
    fn test_error_and_done_events() {
        assert!(matches!(
            RunEvent::from_sse("error", r#"{"error":{"message":"bad"}}"#).unwrap(),
            Some(RunEvent::Error(ref m)) if m == "bad"
        ));
        assert!(matches!(RunEvent::from_sse("done", "[DONE]").unwrap(), Some(RunEvent::Done)));
        assert!(RunEvent::from_sse("thread.run.queued", "{}").unwrap().is_none());
    }

    #[test]
    fn test_malformed_event_data_is_json_error() {
        let err = RunEvent::from_sse("thread.message.completed", "not json").unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }

    #[test]
    fn test_structured_plan_keeps_unfenced_text() {
        let body = r#"{"columns":[{"id":"todo","title":"Todo"},{"id":"doing","title":"Work in progress"},{"id":"done","title":"Done"}],"tasks":[]}"#;
        let plan = StructuredPlan::from_reply(&format!("```json\n{}\n```", body)).unwrap();
        assert_eq!(plan.raw, body);
        assert!(plan.board.tasks.is_empty());
    }
}
