//! SqliteAssignmentStore - durable assignment store backed by SQLite.
//!
//! The handle only carries connection parameters. Each operation opens its
//! own connection and drops it before returning, so any number of handles,
//! threads and processes can point at the same database file; SQLite's
//! `UNIQUE (kind, name)` constraint arbitrates between them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use super::{Assignment, AssignmentStore, StoreError};

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS shard (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind VARCHAR(256) NOT NULL,
        bucket VARCHAR(256) NOT NULL,
        name VARCHAR(256) NOT NULL,
        UNIQUE (kind, name)
    );
    CREATE INDEX IF NOT EXISTS shard_kind_name_index ON shard (kind, name);
    CREATE INDEX IF NOT EXISTS shard_kind_bucket_index ON shard (kind, bucket);
";

/// Connection parameters for [`SqliteAssignmentStore`].
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the database file. Created on first use.
    pub path: PathBuf,
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Assignment store persisted in a SQLite `shard` table.
#[derive(Debug, Clone)]
pub struct SqliteAssignmentStore {
    config: SqliteStoreConfig,
}

impl SqliteAssignmentStore {
    pub fn new(config: SqliteStoreConfig) -> Self {
        Self { config }
    }

    /// Store at `path` with the default busy timeout.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(SqliteStoreConfig::new(path.as_ref()))
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let connection = Connection::open_with_flags(&self.config.path, flags).map_err(backend)?;
        connection
            .busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(backend)?;
        Ok(connection)
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn row_to_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        kind: row.get(1)?,
        bucket: row.get(2)?,
        name: row.get(3)?,
    })
}

impl AssignmentStore for SqliteAssignmentStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let connection = self.connect()?;
        let mode: String = connection
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(backend)?;
        connection.execute_batch(SCHEMA).map_err(backend)?;
        debug!(path = %self.config.path.display(), journal_mode = %mode, "shard schema ready");
        Ok(())
    }

    fn find_assignment(&self, kind: &str, name: &str) -> Result<Option<Assignment>, StoreError> {
        let connection = self.connect()?;
        connection
            .query_row(
                "SELECT id, kind, bucket, name FROM shard WHERE kind = ?1 AND name = ?2 LIMIT 1",
                params![kind, name],
                row_to_assignment,
            )
            .optional()
            .map_err(backend)
    }

    fn insert_assignment(
        &self,
        kind: &str,
        bucket: &str,
        name: &str,
    ) -> Result<Assignment, StoreError> {
        let connection = self.connect()?;
        match connection.execute(
            "INSERT INTO shard (kind, bucket, name) VALUES (?1, ?2, ?3)",
            params![kind, bucket, name],
        ) {
            Ok(_) => Ok(Assignment {
                id: connection.last_insert_rowid(),
                kind: kind.to_string(),
                bucket: bucket.to_string(),
                name: name.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey {
                    kind: kind.to_string(),
                    name: name.to_string(),
                })
            }
            Err(err) => Err(backend(err)),
        }
    }

    fn count_by_bucket(&self, kind: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare("SELECT bucket, COUNT(*) FROM shard WHERE kind = ?1 GROUP BY bucket")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![kind], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(backend)?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (bucket, total) = row.map_err(backend)?;
            counts.insert(bucket, total.max(0) as u64);
        }
        Ok(counts)
    }

    fn list_assignments(
        &self,
        kind: &str,
        bucket: Option<&str>,
    ) -> Result<Vec<Assignment>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(
                "SELECT id, kind, bucket, name FROM shard
                 WHERE kind = ?1 AND (?2 IS NULL OR bucket = ?2)
                 ORDER BY id",
            )
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![kind, bucket], row_to_assignment)
            .map_err(backend)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(backend)
    }

    fn find_by_name(&self, kind: &str, name: &str) -> Result<Vec<Assignment>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare("SELECT id, kind, bucket, name FROM shard WHERE kind = ?1 AND name = ?2 ORDER BY id")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![kind, name], row_to_assignment)
            .map_err(backend)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(backend)
    }

    fn delete_assignment(&self, kind: &str, name: &str) -> Result<u64, StoreError> {
        let connection = self.connect()?;
        let removed = connection
            .execute(
                "DELETE FROM shard WHERE kind = ?1 AND name = ?2",
                params![kind, name],
            )
            .map_err(backend)?;
        Ok(removed as u64)
    }

    fn move_assignment(&self, kind: &str, name: &str, bucket: &str) -> Result<u64, StoreError> {
        let connection = self.connect()?;
        let changed = connection
            .execute(
                "UPDATE shard SET bucket = ?3 WHERE kind = ?1 AND name = ?2",
                params![kind, name, bucket],
            )
            .map_err(backend)?;
        Ok(changed as u64)
    }
}
