//! State management with actor pattern
//!
//! StateManager owns the record Store and processes messages via channels,
//! providing thread-safe access to persistent state. It is the
//! `RecordStore` the orchestrator is given.

mod manager;
mod messages;
mod record_store;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
pub use record_store::RecordStore;
