//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Instructions given to the document analysis assistant
pub const ASSISTANT_INSTRUCTIONS: &str = include_str!("../../prompts/assistant-instructions.pmt");

/// User turn asking for a treatment plan
pub const TREATMENT_REQUEST: &str = include_str!("../../prompts/treatment-request.pmt");

/// Narrative-to-board structuring request
pub const BOARD_STRUCTURE: &str = include_str!("../../prompts/board-structure.pmt");

/// Vision prompt
pub const IMAGE_DESCRIPTION: &str = include_str!("../../prompts/image-description.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "assistant-instructions" => Some(ASSISTANT_INSTRUCTIONS),
        "treatment-request" => Some(TREATMENT_REQUEST),
        "board-structure" => Some(BOARD_STRUCTURE),
        "image-description" => Some(IMAGE_DESCRIPTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
