//! RecordStore trait - the persistence collaborator the orchestrator consumes

use async_trait::async_trait;
use recordstore::{NewRecord, Record, RecordUpdate, User};

use super::StateResponse;

/// Read/update access to Records for the current user
///
/// The orchestrator only ever calls `update` with its own record id. Board
/// payloads are validated before they reach the store; the store treats
/// them as opaque text.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the user who owns records
    async fn fetch_by_email(&self, email: &str) -> StateResponse<User>;

    /// Create a record
    async fn create(&self, fields: NewRecord) -> StateResponse<Record>;

    /// Apply a partial update and return the stored record
    async fn update(&self, update: RecordUpdate) -> StateResponse<Record>;

    /// All records of the current user, oldest first
    async fn list_for_current_user(&self) -> StateResponse<Vec<Record>>;

    /// Get one record
    async fn get(&self, id: &str) -> StateResponse<Option<Record>>;
}
