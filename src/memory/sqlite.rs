//! SQLite store backend.
//!
//! Embedded database for durable issue memory. WAL journaling plus a busy
//! timeout keep concurrent access bounded; embeddings are stored as
//! little-endian f32 blobs so a database file moves between machines.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ensure_dimension, sort_matches, IssueRecord, SimilarityMatch};
use crate::embedding::cosine_similarity;
use crate::error::TriageError;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    dimension: usize,
    timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// A database created with a different embedding dimension is rejected
    /// with `IncompatibleDimension` rather than letting mismatched vectors
    /// meet at query time.
    pub fn open<P: AsRef<Path>>(
        path: P,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, TriageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TriageError::StorageUnavailable(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(storage)?;
        Self::from_connection(conn, dimension, timeout)
    }

    /// Open a private in-memory database. Used by tests and by callers who
    /// want sqlite semantics without a file on disk.
    pub fn open_in_memory(dimension: usize, timeout: Duration) -> Result<Self, TriageError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::from_connection(conn, dimension, timeout)
    }

    fn from_connection(
        conn: Connection,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, TriageError> {
        conn.busy_timeout(timeout).map_err(storage)?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(storage)?;
        init_schema(&conn)?;
        check_dimension(&conn, dimension)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimension,
            timeout,
        })
    }

    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, Connection>, TriageError> {
        self.conn.try_lock_for(self.timeout).ok_or_else(|| {
            TriageError::StorageUnavailable("timed out waiting for database lock".to_string())
        })
    }

    /// Insert or replace the record for its issue number.
    pub fn upsert(&self, record: IssueRecord) -> Result<(), TriageError> {
        ensure_dimension(self.dimension, record.embedding.len())?;
        let labels = serde_json::to_string(&record.labels)
            .map_err(|e| TriageError::StorageUnavailable(format!("failed to encode labels: {e}")))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO issue_embeddings
             (issue_number, title, body, embedding, labels, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.issue_number as i64,
                record.title,
                record.body,
                embedding_to_bytes(&record.embedding),
                labels,
                record.stored_at.to_rfc3339(),
            ],
        )
        .map_err(storage)?;
        Ok(())
    }

    pub fn get(&self, issue_number: u64) -> Result<Option<IssueRecord>, TriageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT title, body, embedding, labels, stored_at
             FROM issue_embeddings WHERE issue_number = ?1",
            params![issue_number as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(storage)?
        .map(|(title, body, blob, labels, stored_at)| {
            Ok(IssueRecord {
                issue_number,
                title,
                body,
                embedding: bytes_to_embedding(&blob)?,
                labels: serde_json::from_str(&labels).map_err(|e| {
                    TriageError::StorageUnavailable(format!("corrupt labels column: {e}"))
                })?,
                stored_at: parse_timestamp(&stored_at)?,
            })
        })
        .transpose()
    }

    /// Rank every stored record by cosine similarity to `query`.
    pub fn query_nearest(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, TriageError> {
        ensure_dimension(self.dimension, query.len())?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT issue_number, embedding FROM issue_embeddings")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(storage)?;

        let mut matches = Vec::new();
        for row in rows {
            let (issue_number, blob) = row.map_err(storage)?;
            let embedding = bytes_to_embedding(&blob)?;
            matches.push(SimilarityMatch {
                issue_number: issue_number as u64,
                score: cosine_similarity(query, &embedding),
            });
        }
        sort_matches(&mut matches, limit);
        Ok(matches)
    }

    pub fn len(&self) -> Result<usize, TriageError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM issue_embeddings", [], |row| row.get(0))
            .map_err(storage)?;
        Ok(count as usize)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn init_schema(conn: &Connection) -> Result<(), TriageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS issue_embeddings (
            issue_number INTEGER PRIMARY KEY,
            title        TEXT NOT NULL,
            body         TEXT NOT NULL,
            embedding    BLOB NOT NULL,
            labels       TEXT NOT NULL,
            stored_at    TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS embedding_metadata (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            dimension  INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
    .map_err(storage)
}

/// Record the dimension on first open; reject a mismatch on every later one.
fn check_dimension(conn: &Connection, dimension: usize) -> Result<(), TriageError> {
    let existing: Option<i64> = conn
        .query_row("SELECT dimension FROM embedding_metadata WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(storage)?;
    match existing {
        Some(found) if found as usize != dimension => Err(TriageError::IncompatibleDimension {
            expected: found as usize,
            actual: dimension,
        }),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO embedding_metadata (id, dimension, created_at) VALUES (1, ?1, ?2)",
                params![dimension as i64, Utc::now().to_rfc3339()],
            )
            .map_err(storage)?;
            Ok(())
        }
    }
}

fn storage(e: rusqlite::Error) -> TriageError {
    TriageError::StorageUnavailable(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TriageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TriageError::StorageUnavailable(format!("corrupt stored_at column: {e}")))
}

/// Encode an embedding as little-endian f32 bytes.
fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>, TriageError> {
    if bytes.len() % 4 != 0 {
        return Err(TriageError::StorageUnavailable(format!(
            "corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(issue_number: u64, embedding: Vec<f32>) -> IssueRecord {
        IssueRecord {
            issue_number,
            title: format!("issue {issue_number}"),
            body: "details".to_string(),
            embedding,
            labels: vec!["bug".to_string(), "performance".to_string()],
            stored_at: Utc::now(),
        }
    }

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(3, Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn round_trips_a_record() {
        let store = store();
        let original = record(42, vec![0.5, -0.25, 1.0]);
        store.upsert(original.clone()).unwrap();

        let found = store.get(42).unwrap().unwrap();
        assert_eq!(found.issue_number, 42);
        assert_eq!(found.title, original.title);
        assert_eq!(found.body, original.body);
        assert_eq!(found.embedding, original.embedding);
        assert_eq!(found.labels, original.labels);
    }

    #[test]
    fn get_missing_returns_none() {
        assert_eq!(store().get(404).unwrap(), None);
    }

    #[test]
    fn upsert_is_last_write_wins() {
        let store = store();
        store.upsert(record(7, vec![1.0, 0.0, 0.0])).unwrap();
        let mut updated = record(7, vec![0.0, 1.0, 0.0]);
        updated.title = "renamed".to_string();
        store.upsert(updated).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let found = store.get(7).unwrap().unwrap();
        assert_eq!(found.title, "renamed");
        assert_eq!(found.embedding, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn query_ranks_by_similarity_with_tiebreak() {
        let store = store();
        store.upsert(record(9, vec![1.0, 0.0, 0.0])).unwrap();
        store.upsert(record(2, vec![1.0, 0.0, 0.0])).unwrap();
        store.upsert(record(5, vec![0.0, 1.0, 0.0])).unwrap();

        let matches = store.query_nearest(&[1.0, 0.0, 0.0], 10).unwrap();
        let order: Vec<u64> = matches.iter().map(|m| m.issue_number).collect();
        // Equal scores fall back to ascending issue number.
        assert_eq!(order, vec![2, 9, 5]);
    }

    #[test]
    fn upsert_rejects_wrong_dimension() {
        let store = store();
        let err = store.upsert(record(1, vec![1.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            TriageError::IncompatibleDimension {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let store = store();
        store.upsert(record(9, vec![1.0, 0.0, 0.0])).unwrap();
        let err = store.query_nearest(&[1.0, 0.0], 10).unwrap_err();
        assert!(matches!(err, TriageError::IncompatibleDimension { .. }));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");

        {
            let store = SqliteStore::open(&path, 3, Duration::from_millis(500)).unwrap();
            store.upsert(record(1, vec![1.0, 0.0, 0.0])).unwrap();
        }

        let reopened = SqliteStore::open(&path, 3, Duration::from_millis(500)).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        let found = reopened.get(1).unwrap().unwrap();
        assert_eq!(found.embedding, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn reopening_with_wrong_dimension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");

        SqliteStore::open(&path, 384, Duration::from_millis(500)).unwrap();
        let err = SqliteStore::open(&path, 128, Duration::from_millis(500)).unwrap_err();
        assert_eq!(
            err,
            TriageError::IncompatibleDimension {
                expected: 384,
                actual: 128
            }
        );
    }

    #[test]
    fn embedding_bytes_round_trip() {
        let original = vec![0.0_f32, -1.5, 3.25, f32::MIN_POSITIVE];
        let bytes = embedding_to_bytes(&original);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), original);
    }

    #[test]
    fn truncated_blob_is_reported_corrupt() {
        assert!(matches!(
            bytes_to_embedding(&[1, 2, 3]),
            Err(TriageError::StorageUnavailable(_))
        ));
    }
}
