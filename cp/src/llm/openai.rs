//! OpenAI API client
//!
//! Covers the Files, Assistants (v2) and Chat Completions endpoints the
//! analysis and structuring flows need. Runs are consumed as server-sent
//! events via `reqwest-eventsource`.

use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Event, EventSource};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::LlmError;
use super::types::{ChatCompletionResponse, FileObject, ObjectRef, RunEvent, RunEventStream};
use crate::config::ProviderConfig;
use crate::encoder::DocumentUpload;
use crate::error::PlanError;

const ASSISTANTS_BETA: &str = "assistants=v2";

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl OpenAIClient {
    /// Create a new client from resolved configuration
    ///
    /// Fails with a configuration error if the API key is not set.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, PlanError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key()?;

        // No client-wide timeout: it would also bound streamed runs
        let http = Client::builder()
            .build()
            .map_err(|e| PlanError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            timeout: config.timeout(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `ApiError`
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LlmError> {
        let response = request.timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "send_json: API error");
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Register a document for assistant retrieval
    pub async fn upload_file(&self, document: &DocumentUpload) -> Result<FileObject, LlmError> {
        debug!(filename = %document.filename, mime = %document.mime_type, "upload_file: called");
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(&document.mime_type)?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        self.send_json(self.post("/v1/files").multipart(form)).await
    }

    /// Look up an uploaded file (used to resolve citation filenames)
    pub async fn retrieve_file(&self, file_id: &str) -> Result<FileObject, LlmError> {
        debug!(%file_id, "retrieve_file: called");
        self.send_json(self.get(&format!("/v1/files/{}", file_id))).await
    }

    /// Create an assistant with the file search tool enabled
    pub async fn create_assistant(&self, name: &str, instructions: &str) -> Result<ObjectRef, LlmError> {
        debug!(%name, model = %self.model, "create_assistant: called");
        let body = serde_json::json!({
            "name": name,
            "instructions": instructions,
            "model": self.model,
            "tools": [{ "type": "file_search" }],
        });

        self.send_json(self.post("/v1/assistants").header("OpenAI-Beta", ASSISTANTS_BETA).json(&body))
            .await
    }

    /// Create a thread holding one user turn with the file attached
    pub async fn create_thread(&self, content: &str, file_id: &str) -> Result<ObjectRef, LlmError> {
        debug!(%file_id, "create_thread: called");
        let body = serde_json::json!({
            "messages": [{
                "role": "user",
                "content": content,
                "attachments": [{
                    "file_id": file_id,
                    "tools": [{ "type": "file_search" }],
                }],
            }],
        });

        self.send_json(self.post("/v1/threads").header("OpenAI-Beta", ASSISTANTS_BETA).json(&body))
            .await
    }

    /// Start a run and return its event stream
    ///
    /// Waits for the server to accept the run, so a rejected submission or
    /// a failed connection is returned here rather than from the stream.
    /// The stream ends after `done`, on transport failure, or when the
    /// server closes the connection. It never reconnects.
    pub async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream, LlmError> {
        debug!(%thread_id, %assistant_id, "stream_run: called");
        let body = serde_json::json!({
            "assistant_id": assistant_id,
            "stream": true,
        });

        let request = self
            .post(&format!("/v1/threads/{}/runs", thread_id))
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .json(&body);

        let mut es = EventSource::new(request).map_err(|e| LlmError::EventSource(e.to_string()))?;

        let opened = tokio::time::timeout(self.timeout, es.next())
            .await
            .map_err(|_| LlmError::Timeout(self.timeout));
        match opened {
            Ok(Some(Ok(Event::Open))) => debug!("stream_run: Event::Open"),
            Ok(Some(Ok(Event::Message(msg)))) => {
                es.close();
                return Err(LlmError::InvalidResponse(format!(
                    "run stream sent '{}' before opening",
                    msg.event
                )));
            }
            Ok(Some(Err(e))) => {
                es.close();
                debug!(%e, "stream_run: run rejected");
                return Err(event_source_error(e).await);
            }
            Ok(None) => return Err(LlmError::EventSource("run stream closed before opening".to_string())),
            Err(e) => {
                es.close();
                return Err(e);
            }
        }

        let stream = futures::stream::unfold(Some(es), |state| async move {
            let mut es = state?;
            loop {
                match es.next().await {
                    None => return None,
                    Some(Ok(Event::Open)) => {
                        debug!("stream_run: Event::Open");
                    }
                    Some(Ok(Event::Message(msg))) => match RunEvent::from_sse(&msg.event, &msg.data) {
                        Ok(Some(RunEvent::Done)) => {
                            debug!("stream_run: done");
                            es.close();
                            return Some((Ok(RunEvent::Done), None));
                        }
                        Ok(Some(event)) => return Some((Ok(event), Some(es))),
                        Ok(None) => {}
                        Err(e) => {
                            es.close();
                            return Some((Err(e), None));
                        }
                    },
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) => {
                        debug!("stream_run: server closed the stream");
                        es.close();
                        return None;
                    }
                    Some(Err(e)) => {
                        debug!(%e, "stream_run: Event error");
                        es.close();
                        return Some((Err(event_source_error(e).await), None));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    /// Single-turn chat completion, returning the reply text
    ///
    /// With `json_mode` the provider is asked for a JSON object reply.
    pub async fn chat_completion(&self, prompt: &str, json_mode: bool) -> Result<String, LlmError> {
        debug!(model = %self.model, prompt_len = prompt.len(), %json_mode, "chat_completion: called");
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response: ChatCompletionResponse = self.send_json(self.post("/v1/chat/completions").json(&body)).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Chat completion returned no content".to_string()))
    }
}

/// Map an event source failure, keeping the provider's status and body
async fn event_source_error(error: reqwest_eventsource::Error) -> LlmError {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => LlmError::ApiError {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        },
        reqwest_eventsource::Error::Transport(e) => LlmError::Network(e),
        other => LlmError::EventSource(other.to_string()),
    }
}
