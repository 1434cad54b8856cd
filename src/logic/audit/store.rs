//! SQLite Audit Store
//!
//! Three tables: apps (known executables), alerts, enforcement_log.
//! The connection sits behind a mutex so every append is atomic; no record
//! is ever partially visible to a concurrent reader.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::logic::policy::EnforcementAction;

use super::types::{AlertRecord, AppRecord, EnforcementRecord, StoreError};

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS apps (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    path        TEXT NOT NULL UNIQUE,
    hash_sha256 TEXT,
    risk_score  REAL NOT NULL DEFAULT 0.0,
    trusted     INTEGER NOT NULL DEFAULT 0,
    last_seen   INTEGER NOT NULL,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS alerts (
    id          TEXT PRIMARY KEY,
    app_id      INTEGER,
    pid         INTEGER NOT NULL,
    message     TEXT NOT NULL,
    risk_score  REAL NOT NULL,
    resolved    INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL,
    resolved_at INTEGER,
    FOREIGN KEY(app_id) REFERENCES apps(id)
);

CREATE TABLE IF NOT EXISTS enforcement_log (
    id          TEXT PRIMARY KEY,
    pid         INTEGER NOT NULL,
    action      TEXT NOT NULL,
    reason      TEXT NOT NULL,
    success     INTEGER NOT NULL,
    error       TEXT,
    simulated   INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL
);
";

// ============================================================================
// STORE
// ============================================================================

pub struct AuditStore {
    conn: Mutex<Connection>,
}

impl AuditStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::init(conn, &path.display().to_string())
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, path: &str) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        log::info!("Audit store ready at {}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Default database location under the local data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("procsentry")
            .join("audit.db")
    }

    // ------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------

    /// Insert or refresh an app row, keyed by executable path. Returns the
    /// row id.
    pub fn upsert_app(
        &self,
        name: &str,
        path: &str,
        hash_sha256: Option<&str>,
        risk_score: f64,
    ) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO apps (name, path, hash_sha256, risk_score, last_seen, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(path) DO UPDATE SET
                 name = excluded.name,
                 hash_sha256 = COALESCE(excluded.hash_sha256, apps.hash_sha256),
                 risk_score = excluded.risk_score,
                 last_seen = excluded.last_seen",
            params![name, path, hash_sha256, risk_score, now],
        )?;

        let id = conn.query_row(
            "SELECT id FROM apps WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Lookup a known app by executable content hash.
    pub fn app_by_hash(&self, hash_sha256: &str) -> Result<Option<AppRecord>, StoreError> {
        let conn = self.conn.lock();
        let app = conn
            .query_row(
                "SELECT id, name, path, hash_sha256, risk_score, trusted, last_seen
                 FROM apps WHERE hash_sha256 = ?1",
                params![hash_sha256],
                |row| {
                    Ok(AppRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        path: row.get(2)?,
                        hash_sha256: row.get(3)?,
                        risk_score: row.get(4)?,
                        trusted: row.get::<_, i64>(5)? != 0,
                        last_seen: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(app)
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    /// Raise an alert. Returns the alert id.
    pub fn insert_alert(
        &self,
        pid: u32,
        message: &str,
        risk_score: f64,
        app_id: Option<i64>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        self.conn.lock().execute(
            "INSERT INTO alerts (id, app_id, pid, message, risk_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, app_id, pid, message, risk_score, now],
        )?;
        Ok(id)
    }

    /// Unresolved alerts, most recent first, bounded.
    pub fn unresolved_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, app_id, pid, message, risk_score, resolved, created_at, resolved_at
             FROM alerts WHERE resolved = 0
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(AlertRecord {
                id: row.get(0)?,
                app_id: row.get(1)?,
                pid: row.get::<_, i64>(2)? as u32,
                message: row.get(3)?,
                risk_score: row.get(4)?,
                resolved: row.get::<_, i64>(5)? != 0,
                timestamp: row.get(6)?,
                resolved_at: row.get(7)?,
            })
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?);
        }
        Ok(alerts)
    }

    /// Mark an alert resolved.
    pub fn resolve_alert(&self, alert_id: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        self.conn.lock().execute(
            "UPDATE alerts SET resolved = 1, resolved_at = ?1 WHERE id = ?2",
            params![now, alert_id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Enforcement log
    // ------------------------------------------------------------------

    /// Append one enforcement record. Append-only: nothing updates or
    /// deletes rows in this table.
    pub fn append_enforcement(&self, record: &EnforcementRecord) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO enforcement_log (id, pid, action, reason, success, error, simulated, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.pid,
                record.action.as_str(),
                record.reason,
                record.success as i64,
                record.error,
                record.simulated as i64,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Recent enforcement records, most recent first, bounded.
    pub fn enforcement_history(&self, limit: usize) -> Result<Vec<EnforcementRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, pid, action, reason, success, error, simulated, created_at
             FROM enforcement_log ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let action: String = row.get(2)?;
            Ok(EnforcementRecord {
                id: row.get(0)?,
                pid: row.get::<_, i64>(1)? as u32,
                action: EnforcementAction::from_str(&action)
                    .unwrap_or(EnforcementAction::Terminate),
                reason: row.get(3)?,
                success: row.get::<_, i64>(4)? != 0,
                error: row.get(5)?,
                simulated: row.get::<_, i64>(6)? != 0,
                timestamp: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_round_trip() {
        let store = AuditStore::open_in_memory().unwrap();
        store.insert_alert(42, "first", 55.0, None).unwrap();
        store.insert_alert(43, "second", 72.0, None).unwrap();

        let alerts = store.unresolved_alerts(10).unwrap();
        assert_eq!(alerts.len(), 2);
        // Most recent first
        assert_eq!(alerts[0].message, "second");
        assert_eq!(alerts[1].pid, 42);
    }

    #[test]
    fn test_resolved_alerts_drop_out() {
        let store = AuditStore::open_in_memory().unwrap();
        let id = store.insert_alert(1, "noisy", 60.0, None).unwrap();
        store.resolve_alert(&id).unwrap();
        assert!(store.unresolved_alerts(10).unwrap().is_empty());
    }

    #[test]
    fn test_unresolved_alerts_respects_limit() {
        let store = AuditStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert_alert(i, "alert", 50.0, None).unwrap();
        }
        assert_eq!(store.unresolved_alerts(3).unwrap().len(), 3);
    }

    #[test]
    fn test_upsert_app_dedupes_by_path() {
        let store = AuditStore::open_in_memory().unwrap();
        let first = store
            .upsert_app("tool.exe", "/opt/tool", Some("abc123"), 10.0)
            .unwrap();
        let second = store
            .upsert_app("tool.exe", "/opt/tool", None, 44.0)
            .unwrap();
        assert_eq!(first, second);

        // The hash survives an upsert that carries none.
        let app = store.app_by_hash("abc123").unwrap().unwrap();
        assert_eq!(app.id, first);
        assert_eq!(app.risk_score, 44.0);
    }

    #[test]
    fn test_app_by_hash_missing_is_none() {
        let store = AuditStore::open_in_memory().unwrap();
        assert!(store.app_by_hash("deadbeef").unwrap().is_none());
    }

    #[test]
    fn test_enforcement_append_and_read_back() {
        let store = AuditStore::open_in_memory().unwrap();
        let record = EnforcementRecord::new(
            EnforcementAction::Quarantine,
            777,
            "High Risk Quarantine",
            false,
            Some("process vanished".to_string()),
        );
        store.append_enforcement(&record).unwrap();

        let history = store.enforcement_history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, EnforcementAction::Quarantine);
        assert_eq!(history[0].pid, 777);
        assert!(!history[0].success);
        assert_eq!(history[0].error.as_deref(), Some("process vanished"));
        assert!(!history[0].simulated);
    }

    #[test]
    fn test_simulated_record_is_marked() {
        let store = AuditStore::open_in_memory().unwrap();
        let record =
            EnforcementRecord::simulated(EnforcementAction::Suspend, 9, "Suspicious Alert");
        store.append_enforcement(&record).unwrap();

        let history = store.enforcement_history(1).unwrap();
        assert!(history[0].simulated);
        assert!(history[0].success);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.db");
        let store = AuditStore::open(&path).unwrap();
        store.insert_alert(1, "persisted", 50.0, None).unwrap();
        assert!(path.exists());
    }
}
