//! RecordStore - persistence for care records
//!
//! Stores users and the records they upload in a single SQLite database.
//! A record carries the narrative analysis produced for its document and,
//! once structured, the serialized task board derived from that narrative.
//!
//! # Layout
//!
//! ```text
//! {store_dir}/
//! └── records.db      # users + records tables
//! ```
//!
//! # Example
//!
//! ```ignore
//! use recordstore::{NewRecord, RecordUpdate, Store};
//!
//! let mut store = Store::open(".careplan")?;
//! store.create_user("ada@example.com", "Ada")?;
//! let record = store.create_record(NewRecord::new("ada@example.com", "Blood panel"))?;
//! store.update_record(RecordUpdate::analysis(&record.id, "Result is good [0]."))?;
//! ```

mod store;
mod types;

pub use store::Store;
pub use types::{NewRecord, Record, RecordUpdate, User};

/// Database file name inside the store directory
pub const DB_FILE: &str = "records.db";

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
