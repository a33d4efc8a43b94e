//! Generative Session Client
//!
//! One capability interface (`GenerativeSessionClient`) over two hosted
//! providers: OpenAI for document analysis and plan structuring, Gemini for
//! image description.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod openai;
mod session;
pub mod types;

pub use client::GenerativeSessionClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use session::{ASSISTANT_NAME, HostedSessionClient, consume_run};
pub use types::{AnalysisOutcome, RunEvent, RunEventStream, StructuredPlan, ThreadMessage};

use crate::config::Config;

/// Create the session client used by the CLI
pub fn create_session_client(config: &Config) -> Arc<dyn GenerativeSessionClient> {
    debug!(
        openai_model = %config.openai.model,
        gemini_model = %config.gemini.model,
        "create_session_client: called"
    );
    Arc::new(HostedSessionClient::new(config))
}
