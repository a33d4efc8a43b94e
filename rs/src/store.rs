//! SQLite-backed Store

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::types::{NewRecord, Record, RecordUpdate, User};
use crate::{DB_FILE, now_ms};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    email       TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id               TEXT PRIMARY KEY,
    owner_email      TEXT NOT NULL REFERENCES users(email),
    record_name      TEXT NOT NULL,
    analysis_result  TEXT,
    kanban_records   TEXT,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner_email);
"#;

const RECORD_COLUMNS: &str =
    "id, owner_email, record_name, analysis_result, kanban_records, created_at, updated_at";

/// Persistent store for users and records
pub struct Store {
    base_path: PathBuf,
    conn: Connection,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join(DB_FILE);
        let conn = Connection::open(&db_path).context(format!("Failed to open {}", db_path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA).context("Failed to apply schema")?;

        info!("Opened record store at {}", db_path.display());
        Ok(Self { base_path, conn })
    }

    /// Directory this store lives in
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    // === Users ===

    /// Create a user; fails if the email is already taken
    pub fn create_user(&mut self, email: &str, name: &str) -> Result<User> {
        debug!("create_user: email={}", email);
        if email.trim().is_empty() {
            bail!("User email must not be empty");
        }
        if self.fetch_user_by_email(email)?.is_some() {
            bail!("User already exists: {}", email);
        }

        let user = User {
            email: email.to_string(),
            name: name.to_string(),
            created_at: now_ms(),
        };
        self.conn.execute(
            "INSERT INTO users (email, name, created_at) VALUES (?1, ?2, ?3)",
            params![user.email, user.name, user.created_at],
        )?;
        Ok(user)
    }

    /// Look up a user by email
    pub fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>> {
        debug!("fetch_user_by_email: email={}", email);
        let user = self
            .conn
            .query_row(
                "SELECT email, name, created_at FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        email: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // === Records ===

    /// Create a record for an existing user
    pub fn create_record(&mut self, fields: NewRecord) -> Result<Record> {
        debug!("create_record: owner={} name={}", fields.owner_email, fields.record_name);
        if self.fetch_user_by_email(&fields.owner_email)?.is_none() {
            bail!("Unknown user: {}", fields.owner_email);
        }

        let now = now_ms();
        let record = Record {
            id: uuid::Uuid::now_v7().to_string(),
            owner_email: fields.owner_email,
            record_name: fields.record_name,
            analysis_result: None,
            kanban_records: None,
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            &format!("INSERT INTO records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)", RECORD_COLUMNS),
            params![
                record.id,
                record.owner_email,
                record.record_name,
                record.analysis_result,
                record.kanban_records,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(record)
    }

    /// Get a record by id
    pub fn get_record(&self, id: &str) -> Result<Option<Record>> {
        debug!("get_record: id={}", id);
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Apply a partial update, returning the stored record
    ///
    /// Returns `Ok(None)` if no record has the given id.
    pub fn update_record(&mut self, update: RecordUpdate) -> Result<Option<Record>> {
        debug!(
            "update_record: id={} analysis={} kanban={:?}",
            update.document_id,
            update.analysis_result.is_some(),
            update.kanban_records.as_ref().map(|k| k.is_some())
        );

        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                params![update.document_id],
                record_from_row,
            )
            .optional()?;

        let Some(mut record) = existing else {
            debug!("update_record: no such record");
            return Ok(None);
        };

        if let Some(analysis) = update.analysis_result {
            record.analysis_result = Some(analysis);
        }
        if let Some(kanban) = update.kanban_records {
            record.kanban_records = kanban;
        }
        record.updated_at = now_ms().max(record.updated_at);

        tx.execute(
            "UPDATE records SET analysis_result = ?2, kanban_records = ?3, updated_at = ?4 WHERE id = ?1",
            params![record.id, record.analysis_result, record.kanban_records, record.updated_at],
        )?;
        tx.commit()?;

        Ok(Some(record))
    }

    /// List a user's records, oldest first
    pub fn list_records_for_user(&self, email: &str) -> Result<Vec<Record>> {
        debug!("list_records_for_user: email={}", email);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records WHERE owner_email = ?1 ORDER BY created_at, id",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![email], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        owner_email: row.get(1)?,
        record_name: row.get(2)?,
        analysis_result: row.get(3)?,
        kanban_records: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with_user() -> (tempfile::TempDir, Store) {
        let temp = tempdir().unwrap();
        let mut store = Store::open(temp.path()).unwrap();
        store.create_user("ada@example.com", "Ada").unwrap();
        (temp, store)
    }

    #[test]
    fn test_open_creates_database() {
        let temp = tempdir().unwrap();
        let store = Store::open(temp.path().join("nested")).unwrap();
        assert!(store.base_path().join(DB_FILE).exists());
    }

    #[test]
    fn test_user_roundtrip() {
        let (_temp, store) = store_with_user();
        let user = store.fetch_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.name, "Ada");
        assert!(store.fetch_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let (_temp, mut store) = store_with_user();
        assert!(store.create_user("ada@example.com", "Other").is_err());
    }

    #[test]
    fn test_create_record_requires_user() {
        let (_temp, mut store) = store_with_user();
        let result = store.create_record(NewRecord::new("nobody@example.com", "Panel"));
        assert!(result.is_err());
    }

    #[test]
    fn test_narrative_roundtrips_byte_for_byte() {
        let (_temp, mut store) = store_with_user();
        let record = store
            .create_record(NewRecord::new("ada@example.com", "Panel"))
            .unwrap();

        let narrative = "## Plan\n\nResult is good [0].\n\t• émoji ✓ and trailing space ";
        store
            .update_record(RecordUpdate::analysis(&record.id, narrative))
            .unwrap()
            .unwrap();

        let fetched = store.get_record(&record.id).unwrap().unwrap();
        assert_eq!(fetched.analysis_result.as_deref(), Some(narrative));
    }

    #[test]
    fn test_update_touches_only_given_fields() {
        let (_temp, mut store) = store_with_user();
        let record = store
            .create_record(NewRecord::new("ada@example.com", "Panel"))
            .unwrap();

        store
            .update_record(RecordUpdate::analysis(&record.id, "narrative"))
            .unwrap();
        let updated = store
            .update_record(RecordUpdate::board(&record.id, "{\"columns\":[]}"))
            .unwrap()
            .unwrap();

        assert_eq!(updated.analysis_result.as_deref(), Some("narrative"));
        assert_eq!(updated.kanban_records.as_deref(), Some("{\"columns\":[]}"));

        // A fresh analysis clears the board
        let reanalysed = store
            .update_record(RecordUpdate::analysis(&record.id, "new narrative"))
            .unwrap()
            .unwrap();
        assert!(reanalysed.kanban_records.is_none());
    }

    #[test]
    fn test_update_unknown_record_returns_none() {
        let (_temp, mut store) = store_with_user();
        let result = store.update_record(RecordUpdate::analysis("missing", "text")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_records_for_user() {
        let (_temp, mut store) = store_with_user();
        store.create_user("bob@example.com", "Bob").unwrap();
        store
            .create_record(NewRecord::new("ada@example.com", "First"))
            .unwrap();
        store
            .create_record(NewRecord::new("ada@example.com", "Second"))
            .unwrap();
        store
            .create_record(NewRecord::new("bob@example.com", "Bob's"))
            .unwrap();

        let records = store.list_records_for_user("ada@example.com").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_name, "First");
        assert_eq!(records[1].record_name, "Second");
    }

    #[test]
    fn test_store_reopens_with_data() {
        let temp = tempdir().unwrap();
        let id = {
            let mut store = Store::open(temp.path()).unwrap();
            store.create_user("ada@example.com", "Ada").unwrap();
            store
                .create_record(NewRecord::new("ada@example.com", "Panel"))
                .unwrap()
                .id
        };

        let store = Store::open(temp.path()).unwrap();
        assert!(store.get_record(&id).unwrap().is_some());
    }
}
