//! Gemini API client for image description

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::LlmError;
use crate::config::ProviderConfig;
use crate::encoder::{EncodedDocument, strip_data_url_prefix};
use crate::error::PlanError;

/// Gemini `generateContent` client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from resolved configuration
    ///
    /// Fails with a configuration error if the API key is not set.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, PlanError> {
        debug!(model = %config.model, "from_config: called");
        let api_key = config.get_api_key()?;
        let http = Client::builder()
            .timeout(config.timeout())
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

    /// Build the request body: one text part followed by one inline image
    fn build_request_body(&self, prompt: &str, image: &EncodedDocument) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: strip_data_url_prefix(&image.data).to_string(),
                        },
                    },
                ],
            }],
        }
    }

    /// Ask the model about an image, returning its text reply
    pub async fn generate_content(&self, prompt: &str, image: &EncodedDocument) -> Result<String, LlmError> {
        debug!(model = %self.model, mime = %image.mime_type, timeout = ?self.timeout, "generate_content: called");
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(prompt, image);

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "generate_content: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&response.text().await?)?;
        extract_text(parsed)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::InvalidResponse(
            "Gemini returned no text in the response candidates".to_string(),
        ));
    }
    Ok(text)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
