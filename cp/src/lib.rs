//! careplan - medical report analysis and treatment-plan boards
//!
//! careplan takes an uploaded medical report through a hosted
//! retrieval-augmented analysis session, keeps the cited narrative on the
//! user's record, and later re-derives a three-column treatment board from
//! that narrative.
//!
//! # Core Concepts
//!
//! - **One Flow Per Record**: uploads and structuring are serialized per
//!   record with in-flight flags, never locks
//! - **Citations Are Ordered**: marker `i` in a narrative always refers to
//!   the i-th annotation the provider emitted
//! - **Validate Before Persisting**: a board reaches the store only after
//!   it parses into exactly `todo`, `doing` and `done`
//!
//! # Modules
//!
//! - [`encoder`] - Document Encoder (bytes to base64 data, and back)
//! - [`llm`] - Generative Session Client over OpenAI and Gemini
//! - [`orchestrator`] - Plan Orchestrator state machine
//! - [`state`] - Record Store actor over `recordstore`
//! - [`domain`] - Board and citation types
//! - [`prompts`] - Prompt templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod state;

pub use config::Config;
pub use domain::{BoardPayload, Citation, ColumnId, Task};
pub use encoder::{DocumentUpload, EncodedDocument, EncodingError, encode_file};
pub use error::PlanError;
pub use llm::{AnalysisOutcome, GenerativeSessionClient, StructuredPlan, create_session_client};
pub use orchestrator::{BOARD_ROUTE, BoardHandoff, PlanOrchestrator, PlanPhase, ViewState};
pub use state::{RecordStore, StateError, StateManager};
