//! Hosted session client
//!
//! Composes the OpenAI adapter (document analysis and plan structuring) and
//! the Gemini adapter (image description) behind `GenerativeSessionClient`.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::types::{RunEvent, ThreadMessage};
use super::{AnalysisOutcome, GeminiClient, GenerativeSessionClient, LlmError, OpenAIClient, StructuredPlan};
use crate::config::{Config, ProviderConfig};
use crate::domain::{resolve_citations, rewrite_markers};
use crate::encoder::{DocumentUpload, EncodedDocument};
use crate::error::PlanError;
use crate::prompts::PromptLoader;

/// Display name of the analysis assistant
pub const ASSISTANT_NAME: &str = "AI recommended treatment planner";

/// Session client backed by the hosted providers
///
/// Adapters are built on first use, so a missing API key surfaces as a
/// configuration error from the first operation that needs it.
pub struct HostedSessionClient {
    openai_config: ProviderConfig,
    gemini_config: ProviderConfig,
    prompts: PromptLoader,
    stream_timeout: Duration,
    openai: OnceCell<OpenAIClient>,
    gemini: OnceCell<GeminiClient>,
}

impl HostedSessionClient {
    pub fn new(config: &Config) -> Self {
        debug!("HostedSessionClient::new: called");
        Self {
            openai_config: config.openai.resolve(),
            gemini_config: config.gemini.resolve(),
            prompts: PromptLoader::new(&config.prompts.dir),
            stream_timeout: config.session.stream_timeout(),
            openai: OnceCell::new(),
            gemini: OnceCell::new(),
        }
    }

    async fn openai(&self) -> Result<&OpenAIClient, PlanError> {
        self.openai
            .get_or_try_init(|| async { OpenAIClient::from_config(&self.openai_config) })
            .await
    }

    async fn gemini(&self) -> Result<&GeminiClient, PlanError> {
        self.gemini
            .get_or_try_init(|| async { GeminiClient::from_config(&self.gemini_config) })
            .await
    }

    fn prompt(&self, result: eyre::Result<String>) -> Result<String, PlanError> {
        result.map_err(|e| PlanError::Configuration(e.to_string()))
    }
}

/// Warn when the provider rejects the configured key
fn note_auth_failure(config: &ProviderConfig) -> impl Fn(&LlmError) + '_ {
    move |e| {
        if e.is_auth_failure() {
            warn!(api_key_env = %config.api_key_env, status = ?e.status(), "Provider rejected the API key");
        }
    }
}

#[async_trait]
impl GenerativeSessionClient for HostedSessionClient {
    async fn upload_and_analyze(&self, document: &DocumentUpload) -> Result<AnalysisOutcome, PlanError> {
        debug!(filename = %document.filename, "upload_and_analyze: called");
        let openai = self.openai().await?;
        let instructions = self.prompt(self.prompts.assistant_instructions())?;
        let request = self.prompt(self.prompts.treatment_request())?;

        let file = openai
            .upload_file(document)
            .await
            .inspect_err(note_auth_failure(&self.openai_config))
            .map_err(PlanError::Upload)?;
        info!(file_id = %file.id, filename = %document.filename, "Uploaded document");

        let assistant = openai
            .create_assistant(ASSISTANT_NAME, &instructions)
            .await
            .map_err(PlanError::Analysis)?;
        let thread = openai
            .create_thread(&request, &file.id)
            .await
            .map_err(PlanError::Analysis)?;
        debug!(assistant_id = %assistant.id, thread_id = %thread.id, "upload_and_analyze: starting run");

        let events = openai
            .stream_run(&thread.id, &assistant.id)
            .await
            .map_err(PlanError::Analysis)?;
        let message = consume_run(events, self.stream_timeout).await?;

        let Some(text) = message.first_text() else {
            return Err(PlanError::Stream("completed message has no text".to_string()));
        };
        let annotations = text.annotations();
        let narrative = rewrite_markers(&text.value, &annotations);
        let citations = resolve_citations(&annotations, |file_id| async move {
            openai.retrieve_file(&file_id).await.map(|f| f.filename)
        })
        .await
        .map_err(PlanError::Upload)?;

        info!(
            model = %openai.model(),
            message_id = %message.id,
            citation_count = citations.len(),
            "Analysis complete"
        );
        Ok(AnalysisOutcome { narrative, citations })
    }

    async fn structure_plan(&self, narrative: &str) -> Result<StructuredPlan, PlanError> {
        debug!(narrative_len = narrative.len(), "structure_plan: called");
        let openai = self.openai().await?;
        let prompt = self.prompt(self.prompts.board_structure(narrative))?;

        let reply = openai
            .chat_completion(&prompt, true)
            .await
            .inspect_err(note_auth_failure(&self.openai_config))
            .map_err(PlanError::Generation)?;
        debug!(model = %openai.model(), reply_len = reply.len(), "structure_plan: reply received");

        StructuredPlan::from_reply(&reply).inspect_err(|e| warn!(error = %e, "Model reply is not a valid board"))
    }

    async fn describe_image(&self, image: &EncodedDocument) -> Result<String, PlanError> {
        debug!(filename = %image.filename, mime = %image.mime_type, "describe_image: called");
        let gemini = self.gemini().await?;
        let prompt = self.prompt(self.prompts.image_description())?;

        debug!(model = %gemini.model(), "describe_image: sending");
        gemini
            .generate_content(&prompt, image)
            .await
            .inspect_err(note_auth_failure(&self.gemini_config))
            .map_err(PlanError::Description)
    }
}

/// Drain a run's events until a completed text message arrives
///
/// Returns the first `MessageCompleted` whose first block is text. A failed
/// run, an error event, the stream closing first, or the deadline passing
/// are all `PlanError::Stream`.
pub async fn consume_run<S>(mut events: S, deadline: Duration) -> Result<ThreadMessage, PlanError>
where
    S: Stream<Item = Result<RunEvent, LlmError>> + Unpin,
{
    debug!(?deadline, "consume_run: called");
    let drain = async {
        while let Some(event) = events.next().await {
            match event.map_err(|e| PlanError::Stream(e.to_string()))? {
                RunEvent::RunCreated(run) => debug!(run_id = %run.id, "consume_run: run created"),
                RunEvent::MessageCreated(msg) => debug!(message_id = %msg.id, "consume_run: assistant >"),
                RunEvent::TextDelta(delta) => debug!(len = delta.len(), "consume_run: text delta"),
                RunEvent::ToolCallCreated(step) => debug!(%step, "consume_run: assistant tool call"),
                RunEvent::MessageCompleted(msg) => {
                    if msg.first_text().is_some() {
                        debug!(message_id = %msg.id, "consume_run: completed text message");
                        return Ok(msg);
                    }
                    debug!(message_id = %msg.id, "consume_run: completed message without text, waiting");
                }
                RunEvent::RunCompleted(run) => debug!(run_id = %run.id, "consume_run: run completed"),
                RunEvent::RunFailed(run) => return Err(PlanError::Stream(run.failure_reason())),
                RunEvent::Error(message) => return Err(PlanError::Stream(message)),
                RunEvent::Done => break,
            }
        }
        Err(PlanError::Stream("stream closed before a completed message".to_string()))
    };

    match tokio::time::timeout(deadline, drain).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?deadline, "Run stream timed out");
            Err(PlanError::Stream(LlmError::Timeout(deadline).to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeminiConfig, OpenAIConfig};
    use crate::llm::types::RunObject;
    use futures::stream;
    use serial_test::serial;

    fn completed(text: &str) -> RunEvent {
        let json = serde_json::json!({
            "id": "msg_1",
            "content": [{ "type": "text", "text": { "value": text, "annotations": [] } }],
        });
        RunEvent::MessageCompleted(serde_json::from_value(json).unwrap())
    }

    fn run(status: &str) -> RunObject {
        serde_json::from_value(serde_json::json!({ "id": "run_1", "status": status })).unwrap()
    }

    #[tokio::test]
    async fn test_consume_run_returns_first_text_message() {
        let events = stream::iter(vec![
            Ok(RunEvent::RunCreated(run("queued"))),
            Ok(RunEvent::TextDelta("Res".to_string())),
            Ok(completed("Result is good.")),
            Ok(completed("ignored")),
        ]);
        let message = consume_run(events, Duration::from_secs(5)).await.unwrap();
        assert_eq!(message.first_text().unwrap().value, "Result is good.");
    }

    #[tokio::test]
    async fn test_consume_run_closed_early_is_stream_error() {
        let events = stream::iter(vec![Ok(RunEvent::RunCreated(run("queued"))), Ok(RunEvent::Done)]);
        let err = consume_run(events, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, PlanError::Stream(_)));
    }

    #[tokio::test]
    async fn test_consume_run_failed_run_is_stream_error() {
        let events = stream::iter(vec![Ok(RunEvent::RunFailed(run("failed")))]);
        let err = consume_run(events, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, PlanError::Stream(ref m) if m.contains("failed")));
    }

    #[tokio::test]
    async fn test_consume_run_transport_error_is_stream_error() {
        let events = stream::iter(vec![Err(LlmError::EventSource("connection reset".to_string()))]);
        let err = consume_run(events, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, PlanError::Stream(ref m) if m.contains("connection reset")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consume_run_times_out() {
        let events = stream::pending::<Result<RunEvent, LlmError>>();
        let err = consume_run(events, Duration::from_secs(300)).await.unwrap_err();
        assert!(matches!(err, PlanError::Stream(ref m) if m.contains("Timeout")));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_key_is_configuration_error_at_first_use() {
        unsafe {
            std::env::remove_var("CAREPLAN_TEST_SESSION_OPENAI");
            std::env::remove_var("CAREPLAN_TEST_SESSION_GEMINI");
        }
        let config = Config {
            openai: OpenAIConfig {
                api_key_env: "CAREPLAN_TEST_SESSION_OPENAI".to_string(),
                ..Default::default()
            },
            gemini: GeminiConfig {
                api_key_env: "CAREPLAN_TEST_SESSION_GEMINI".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        // Construction succeeds without keys
        let client = HostedSessionClient::new(&config);

        let err = client.structure_plan("narrative").await.unwrap_err();
        assert!(matches!(err, PlanError::Configuration(ref m) if m.contains("CAREPLAN_TEST_SESSION_OPENAI")));

        let image = EncodedDocument {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
            filename: "scan.png".to_string(),
        };
        let err = client.describe_image(&image).await.unwrap_err();
        assert!(matches!(err, PlanError::Configuration(ref m) if m.contains("CAREPLAN_TEST_SESSION_GEMINI")));
    }
}
