//! StateManager - actor that owns the record Store
//!
//! Processes commands via channels for thread-safe access to persistent state.

use std::path::Path;

use async_trait::async_trait;
use recordstore::{NewRecord, Record, RecordUpdate, Store, User};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StateCommand, StateError, StateResponse};
use super::record_store::RecordStore;

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    current_user: Option<String>,
}

impl StateManager {
    /// Spawn a new StateManager actor
    ///
    /// `current_user` is the email whose records `list_for_current_user`
    /// returns.
    pub fn spawn(store_path: impl AsRef<Path>, current_user: Option<String>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), ?current_user, "spawn: called");
        let store = Store::open(store_path.as_ref())?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));

        info!("StateManager spawned");
        Ok(Self { tx, current_user })
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === User operations ===

    /// Create a user
    pub async fn create_user(&self, email: &str, name: &str) -> StateResponse<User> {
        debug!(%email, "create_user: called");
        self.request(|reply| StateCommand::CreateUser {
            email: email.to_string(),
            name: name.to_string(),
            reply,
        })
        .await
    }

    /// Look up a user, `None` if unknown
    pub async fn fetch_user(&self, email: &str) -> StateResponse<Option<User>> {
        debug!(%email, "fetch_user: called");
        self.request(|reply| StateCommand::FetchUser {
            email: email.to_string(),
            reply,
        })
        .await
    }

    // === Record operations ===

    /// Create a record for the current user
    pub async fn create_for_current_user(&self, record_name: &str) -> StateResponse<Record> {
        debug!(%record_name, "create_for_current_user: called");
        let email = self.current_user.as_deref().ok_or(StateError::NoCurrentUser)?;
        self.create(NewRecord::new(email, record_name)).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

#[async_trait]
impl RecordStore for StateManager {
    async fn fetch_by_email(&self, email: &str) -> StateResponse<User> {
        debug!(%email, "fetch_by_email: called");
        self.fetch_user(email)
            .await?
            .ok_or_else(|| StateError::UserNotFound(email.to_string()))
    }

    async fn create(&self, fields: NewRecord) -> StateResponse<Record> {
        debug!(owner = %fields.owner_email, name = %fields.record_name, "create: called");
        self.request(|reply| StateCommand::CreateRecord { fields, reply }).await
    }

    async fn update(&self, update: RecordUpdate) -> StateResponse<Record> {
        debug!(document_id = %update.document_id, "update: called");
        let id = update.document_id.clone();
        self.request(|reply| StateCommand::UpdateRecord { update, reply })
            .await?
            .ok_or(StateError::NotFound(id))
    }

    async fn list_for_current_user(&self) -> StateResponse<Vec<Record>> {
        debug!("list_for_current_user: called");
        let email = self.current_user.clone().ok_or(StateError::NoCurrentUser)?;
        self.request(|reply| StateCommand::ListRecords { email, reply }).await
    }

    async fn get(&self, id: &str) -> StateResponse<Option<Record>> {
        debug!(%id, "get: called");
        self.request(|reply| StateCommand::GetRecord {
            id: id.to_string(),
            reply,
        })
        .await
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateUser { email, name, reply } => {
                debug!(%email, "actor_loop: CreateUser command");
                let result = store
                    .create_user(&email, &name)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::FetchUser { email, reply } => {
                debug!(%email, "actor_loop: FetchUser command");
                let result = store
                    .fetch_user_by_email(&email)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::CreateRecord { fields, reply } => {
                debug!(owner = %fields.owner_email, "actor_loop: CreateRecord command");
                let result = store
                    .create_record(fields)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::GetRecord { id, reply } => {
                debug!(%id, "actor_loop: GetRecord command");
                let result = store.get_record(&id).map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::UpdateRecord { update, reply } => {
                debug!(document_id = %update.document_id, "actor_loop: UpdateRecord command");
                let result = store
                    .update_record(update)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::ListRecords { email, reply } => {
                debug!(%email, "actor_loop: ListRecords command");
                let result = store
                    .list_records_for_user(&email)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
