use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::record::RecallRecord;
use crate::store::RecordStore;

/// SQLite-backed snapshot. One connection, serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, path.display().to_string())
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            location,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS recalls (
            position      INTEGER PRIMARY KEY,
            id            TEXT NOT NULL,
            title         TEXT NOT NULL,
            link          TEXT NOT NULL,
            date          TEXT NOT NULL,
            source        TEXT NOT NULL,
            category      TEXT NOT NULL,
            description   TEXT,
            product_name  TEXT,
            manufacturer  TEXT,
            recall_reason TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_recalls_source ON recalls(source);

        -- Single row: when the current snapshot was written
        CREATE TABLE IF NOT EXISTS snapshot (
            id           INTEGER PRIMARY KEY CHECK (id = 1),
            last_updated TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

impl RecordStore for SqliteStore {
    fn save(&self, records: &[RecallRecord], at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM recalls", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO recalls (position, id, title, link, date, source, category,
                                      description, product_name, manufacturer, recall_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, r) in records.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    r.id,
                    r.title,
                    r.link,
                    r.date,
                    r.source,
                    r.category,
                    r.description,
                    r.product_name,
                    r.manufacturer,
                    r.recall_reason,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO snapshot (id, last_updated) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_updated = excluded.last_updated",
            params![at.to_rfc3339_opts(SecondsFormat::Nanos, true)],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<RecallRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, link, date, source, category,
                    description, product_name, manufacturer, recall_reason
             FROM recalls ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RecallRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                link: row.get(2)?,
                date: row.get::<_, NaiveDate>(3)?,
                source: row.get(4)?,
                category: row.get(5)?,
                description: row.get(6)?,
                product_name: row.get(7)?,
                manufacturer: row.get(8)?,
                recall_reason: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn last_updated(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn();
        let raw: Option<String> = conn
            .query_row("SELECT last_updated FROM snapshot WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        raw.map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| StoreError::Timestamp(raw))
        })
        .transpose()
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;

    #[test]
    fn empty_database_is_empty_snapshot() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.last_updated().unwrap(), None);
    }

    #[test]
    fn load_returns_what_was_saved() {
        let store = SqliteStore::in_memory().unwrap();
        let mut records = vec![
            sample("a", "2024-03-01"),
            sample("b", "2024-03-01"),
            sample("c", "2023-12-31"),
        ];
        records[1].description = None;
        records[2].recall_reason = Some("Listeria risk".to_string());
        let at = Utc::now();

        store.save(&records, at).unwrap();

        assert_eq!(store.load().unwrap(), records);
        assert_eq!(store.last_updated().unwrap(), Some(at));
    }

    #[test]
    fn save_is_a_full_replace() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save(&[sample("a", "2024-01-01"), sample("b", "2024-01-02")], Utc::now())
            .unwrap();
        let later = Utc::now();
        store.save(&[sample("z", "2024-05-05")], later).unwrap();

        let ids: Vec<String> = store.load().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["z"]);
        assert_eq!(store.last_updated().unwrap(), Some(later));
    }

    #[test]
    fn unreadable_timestamp_is_an_error() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn()
            .execute("INSERT INTO snapshot (id, last_updated) VALUES (1, 'yesterday')", [])
            .unwrap();
        assert!(matches!(store.last_updated(), Err(StoreError::Timestamp(raw)) if raw == "yesterday"));
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recalls.sqlite");
        let at = Utc::now();
        SqliteStore::open(&path)
            .unwrap()
            .save(&[sample("a", "2024-02-02")], at)
            .unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 1);
        assert_eq!(reopened.last_updated().unwrap(), Some(at));
        assert_eq!(reopened.location(), path.display().to_string());
    }
}
