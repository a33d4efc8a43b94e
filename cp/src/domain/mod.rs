//! Domain types for careplan
//!
//! - `BoardPayload`: the structured three-column treatment board
//! - `Citation`: an (index, filename) pair extracted from annotated output

mod board;
mod citation;

pub use board::{BoardPayload, Column, ColumnId, Task, strip_code_fence};
pub use citation::{Annotation, Citation, UNKNOWN_SOURCE, resolve_citations, rewrite_markers};
