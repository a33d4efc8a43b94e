//! State manager messages
//!
//! Commands and responses for the actor pattern.

use recordstore::{NewRecord, Record, RecordUpdate, User};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("No current user configured")]
    NoCurrentUser,

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // User operations
    CreateUser {
        email: String,
        name: String,
        reply: oneshot::Sender<StateResponse<User>>,
    },
    FetchUser {
        email: String,
        reply: oneshot::Sender<StateResponse<Option<User>>>,
    },

    // Record operations
    CreateRecord {
        fields: NewRecord,
        reply: oneshot::Sender<StateResponse<Record>>,
    },
    GetRecord {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Record>>>,
    },
    UpdateRecord {
        update: RecordUpdate,
        reply: oneshot::Sender<StateResponse<Option<Record>>>,
    },
    ListRecords {
        email: String,
        reply: oneshot::Sender<StateResponse<Vec<Record>>>,
    },

    // Shutdown
    Shutdown,
}
