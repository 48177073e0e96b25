use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{decode_table, encode_table, payload_digest};
use crate::config::{StoreConfig, StoreKind};
use crate::error::{GradebookError, Result};
use crate::table::{ColumnRules, Table};

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

/// One persisted slot value. The digest guards against torn or edited payloads.
#[derive(Debug, Clone)]
pub struct SlotRecord {
    pub payload: String,
    pub sha256: String,
    pub revision: String,
    pub saved_at: String,
}

impl SlotRecord {
    fn seal(payload: String) -> Self {
        Self {
            sha256: payload_digest(&payload),
            payload,
            revision: Uuid::new_v4().to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn open(&self, slot: &str, rules: &ColumnRules) -> Result<Table> {
        if payload_digest(&self.payload) != self.sha256 {
            return Err(GradebookError::StoreCorrupt {
                slot: slot.to_string(),
            });
        }
        decode_table(&self.payload, rules)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub revision: String,
    pub saved_at: String,
    pub rows: usize,
    pub columns: usize,
}

/// The three-operation storage contract every backend satisfies.
pub trait TableStore: Send + Sync {
    /// Establishes the slot. Safe to call any number of times.
    fn init(&self) -> Result<()>;

    /// Returns the stored table, or an empty table when nothing was written yet.
    fn fetch(&self) -> Result<Table>;

    /// Replaces the slot with the full table in one step.
    fn write(&self, table: &Table) -> Result<WriteReceipt>;

    fn kind(&self) -> StoreKind;
}

pub fn open_store(cfg: &StoreConfig, rules: &ColumnRules) -> Result<Arc<dyn TableStore>> {
    match cfg.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new(&cfg.slot_key, rules.clone()))),
        StoreKind::Sqlite => {
            let workspace = cfg.workspace.as_deref().unwrap_or_else(|| Path::new("."));
            Ok(Arc::new(SqliteStore::open(workspace, &cfg.slot_key, rules.clone())?))
        }
    }
}

fn receipt(record: &SlotRecord, table: &Table) -> WriteReceipt {
    WriteReceipt {
        revision: record.revision.clone(),
        saved_at: record.saved_at.clone(),
        rows: table.row_count(),
        columns: table.column_count(),
    }
}

/// Process-scoped slot standing in for a remote document store.
pub struct MemoryStore {
    slot_key: String,
    rules: ColumnRules,
    slot: RwLock<Option<SlotRecord>>,
}

impl MemoryStore {
    pub fn new(slot_key: &str, rules: ColumnRules) -> Self {
        Self {
            slot_key: slot_key.to_string(),
            rules,
            slot: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, payload: &str) {
        if let Ok(mut guard) = self.slot.write() {
            if let Some(rec) = guard.as_mut() {
                rec.payload = payload.to_string();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn raw_payload(&self) -> Option<String> {
        self.slot
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|rec| rec.payload.clone()))
    }
}

impl TableStore for MemoryStore {
    fn init(&self) -> Result<()> {
        debug!(slot = %self.slot_key, "memory store ready");
        Ok(())
    }

    fn fetch(&self) -> Result<Table> {
        let guard = self.slot.read().map_err(|_| GradebookError::LockPoisoned)?;
        match guard.as_ref() {
            Some(rec) => rec.open(&self.slot_key, &self.rules),
            None => Ok(Table::default()),
        }
    }

    fn write(&self, table: &Table) -> Result<WriteReceipt> {
        // Serialize before taking the lock so readers never wait on encoding.
        let record = SlotRecord::seal(encode_table(table)?);
        let out = receipt(&record, table);
        let mut guard = self.slot.write().map_err(|_| GradebookError::LockPoisoned)?;
        *guard = Some(record);
        info!(slot = %self.slot_key, revision = %out.revision, rows = out.rows, "table written to memory slot");
        Ok(out)
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }
}

/// Slot persisted in a SQLite file under a workspace directory.
pub struct SqliteStore {
    slot_key: String,
    rules: ColumnRules,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(workspace: &Path, slot_key: &str, rules: ColumnRules) -> Result<Self> {
        std::fs::create_dir_all(workspace)?;
        let db_path = workspace.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        info!(path = %db_path.display(), slot = slot_key, "opened sqlite store");
        Ok(Self {
            slot_key: slot_key.to_string(),
            rules,
            conn: Mutex::new(conn),
        })
    }

    fn read_record(conn: &Connection, slot_key: &str) -> Result<Option<SlotRecord>> {
        let rec = conn
            .query_row(
                "SELECT payload, sha256, revision, saved_at FROM table_slots WHERE slot_key = ?",
                [slot_key],
                |r| {
                    Ok(SlotRecord {
                        payload: r.get(0)?,
                        sha256: r.get(1)?,
                        revision: r.get(2)?,
                        saved_at: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }
}

impl TableStore for SqliteStore {
    fn init(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| GradebookError::LockPoisoned)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS table_slots(
                slot_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                sha256 TEXT NOT NULL,
                revision TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn fetch(&self) -> Result<Table> {
        let conn = self.conn.lock().map_err(|_| GradebookError::LockPoisoned)?;
        match Self::read_record(&conn, &self.slot_key)? {
            Some(rec) => rec.open(&self.slot_key, &self.rules).inspect_err(|e| {
                warn!(slot = %self.slot_key, error = %e, "stored slot could not be decoded");
            }),
            None => Ok(Table::default()),
        }
    }

    fn write(&self, table: &Table) -> Result<WriteReceipt> {
        let record = SlotRecord::seal(encode_table(table)?);
        let out = receipt(&record, table);
        let mut conn = self.conn.lock().map_err(|_| GradebookError::LockPoisoned)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO table_slots(slot_key, payload, sha256, revision, saved_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(slot_key) DO UPDATE SET
               payload = excluded.payload,
               sha256 = excluded.sha256,
               revision = excluded.revision,
               saved_at = excluded.saved_at",
            (
                &self.slot_key,
                &record.payload,
                &record.sha256,
                &record.revision,
                &record.saved_at,
            ),
        )?;
        tx.commit()?;
        info!(slot = %self.slot_key, revision = %out.revision, rows = out.rows, "table written to sqlite slot");
        Ok(out)
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn sample() -> Table {
        Table::new(
            &ColumnRules::default(),
            vec!["Nom".into(), "Présence_S1".into(), "Note_S1".into()],
            vec![
                vec![Cell::Text("Alice".into()), Cell::Bool(true), Cell::Number(15.0)],
                vec![Cell::Text("Bob".into()), Cell::Bool(false), Cell::Null],
            ],
        )
        .expect("sample")
    }

    #[test]
    fn memory_fetch_before_write_is_empty() {
        let store = MemoryStore::new("slot", ColumnRules::default());
        store.init().expect("init");
        store.init().expect("init twice");
        assert!(store.fetch().expect("fetch").is_empty());
    }

    #[test]
    fn memory_write_then_fetch_round_trips() {
        let store = MemoryStore::new("slot", ColumnRules::default());
        store.init().expect("init");
        let receipt = store.write(&sample()).expect("write");
        assert_eq!(receipt.rows, 2);
        assert_eq!(receipt.columns, 3);
        assert_eq!(store.fetch().expect("fetch"), sample());
    }

    #[test]
    fn write_of_fetch_is_idempotent() {
        let store = MemoryStore::new("slot", ColumnRules::default());
        store.write(&sample()).expect("write");
        let first = store.fetch().expect("fetch");
        store.write(&first).expect("rewrite");
        assert_eq!(store.fetch().expect("fetch again"), first);
    }

    #[test]
    fn memory_detects_tampered_payload() {
        let store = MemoryStore::new("slot", ColumnRules::default());
        store.write(&sample()).expect("write");
        store.tamper(r#"{"columns":[],"data":[]}"#);
        assert!(matches!(
            store.fetch(),
            Err(GradebookError::StoreCorrupt { .. })
        ));
    }

    #[test]
    fn sqlite_slot_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = SqliteStore::open(dir.path(), "slot", ColumnRules::default()).expect("open");
            store.init().expect("init");
            assert!(store.fetch().expect("fetch").is_empty());
            store.write(&sample()).expect("write");
        }
        let store = SqliteStore::open(dir.path(), "slot", ColumnRules::default()).expect("reopen");
        store.init().expect("init again");
        assert_eq!(store.fetch().expect("fetch"), sample());
        assert!(dir.path().join(DB_FILE_NAME).is_file());
    }

    #[test]
    fn sqlite_write_replaces_previous_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path(), "slot", ColumnRules::default()).expect("open");
        store.init().expect("init");
        let first = store.write(&sample()).expect("write");

        let mut edited = sample();
        edited
            .set_cell(1, "Présence_S1", Cell::Bool(true))
            .expect("edit");
        let second = store.write(&edited).expect("rewrite");
        assert_ne!(first.revision, second.revision);
        assert_eq!(store.fetch().expect("fetch"), edited);
    }

    #[test]
    fn open_store_selects_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rules = ColumnRules::default();
        let mem = open_store(&StoreConfig::default(), &rules).expect("memory");
        assert_eq!(mem.kind(), StoreKind::Memory);

        let cfg = StoreConfig {
            kind: StoreKind::Sqlite,
            workspace: Some(dir.path().to_path_buf()),
            ..StoreConfig::default()
        };
        let sql = open_store(&cfg, &rules).expect("sqlite");
        assert_eq!(sql.kind(), StoreKind::Sqlite);
    }
}
