//! Prompt Template System
//!
//! Template loading chain:
//! 1. `.careplan/prompts/{name}.pmt` (user override, configurable)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{BoardContext, PromptLoader};
