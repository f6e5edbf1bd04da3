//! SQLite-based store implementation

use chrono::{DateTime, Local, TimeZone};
use honestfast_api::{FastRecord, Preferences};
use honestfast_util::FastId;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{FastStore, StoreError, StoreResult};

const FAST_COLUMNS: &str = "id, start_ms, end_ms, target_hours, plan_label, completed";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Fast records; times are epoch milliseconds
            CREATE TABLE IF NOT EXISTS fasts (
                id TEXT PRIMARY KEY,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER,
                target_hours REAL NOT NULL,
                plan_label TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0
            );

            -- Preferences (single row)
            CREATE TABLE IF NOT EXISTS preferences (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                prefs_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_fasts_start ON fasts(start_ms);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn to_millis(dt: &DateTime<Local>) -> i64 {
    dt.timestamp_millis()
}

fn from_millis(ms: i64) -> rusqlite::Result<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FastRecord> {
    let id_str: String = row.get(0)?;
    let id = FastId::parse(&id_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("invalid fast id: {id_str}").into(),
        )
    })?;
    let start_time = from_millis(row.get(1)?)?;
    let end_time = row.get::<_, Option<i64>>(2)?.map(from_millis).transpose()?;

    Ok(FastRecord::from_parts(
        id,
        start_time,
        end_time,
        row.get(3)?,
        row.get::<_, String>(4)?,
        row.get(5)?,
    ))
}

impl FastStore for SqliteStore {
    fn insert_fast(&self, record: &FastRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            &format!("INSERT INTO fasts ({FAST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                record.id().to_string(),
                to_millis(&record.start_time()),
                record.end_time().as_ref().map(to_millis),
                record.target_hours(),
                record.plan_label(),
                record.completed(),
            ],
        )?;

        debug!(fast_id = %record.id(), plan = record.plan_label(), "Fast inserted");
        Ok(())
    }

    fn update_fast(&self, record: &FastRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            UPDATE fasts
            SET start_ms = ?2, end_ms = ?3, target_hours = ?4, plan_label = ?5, completed = ?6
            WHERE id = ?1
            "#,
            params![
                record.id().to_string(),
                to_millis(&record.start_time()),
                record.end_time().as_ref().map(to_millis),
                record.target_hours(),
                record.plan_label(),
                record.completed(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("fast {}", record.id())));
        }

        debug!(fast_id = %record.id(), completed = record.completed(), "Fast updated");
        Ok(())
    }

    fn delete_all_fasts(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM fasts", [])?;
        debug!(deleted, "All fasts deleted");
        Ok(())
    }

    fn active_fast(&self) -> StoreResult<Option<FastRecord>> {
        let conn = self.conn()?;

        let record = conn
            .query_row(
                &format!(
                    "SELECT {FAST_COLUMNS} FROM fasts WHERE end_ms IS NULL \
                     ORDER BY start_ms DESC LIMIT 1"
                ),
                [],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn all_fasts(&self) -> StoreResult<Vec<FastRecord>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare(&format!("SELECT {FAST_COLUMNS} FROM fasts ORDER BY start_ms DESC"))?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn load_preferences(&self) -> StoreResult<Option<Preferences>> {
        let conn = self.conn()?;

        let json: Option<String> = conn
            .query_row("SELECT prefs_json FROM preferences WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn save_preferences(&self, prefs: &Preferences) -> StoreResult<()> {
        let conn = self.conn()?;
        let json = serde_json::to_string(prefs)?;

        conn.execute(
            r#"
            INSERT INTO preferences (id, prefs_json)
            VALUES (1, ?)
            ON CONFLICT(id)
            DO UPDATE SET prefs_json = excluded.prefs_json
            "#,
            [json],
        )?;

        debug!("Preferences saved");
        Ok(())
    }

    fn delete_preferences(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM preferences", [])?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
