use super::{Backend, Partition, ReadTxn, WriteTxn};
use crate::error::{Result, StoreError};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite-backed partitions, one table per partition.
///
/// Every transaction opens its own connection. Writers start with
/// `BEGIN IMMEDIATE`, which takes the database-wide write lock up front, so
/// SQLite itself is the single-writer serialization point.
pub struct SqliteBackend {
    db_path: PathBuf,
}

impl SqliteBackend {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let backend = Self { db_path };
        let conn = backend.get_conn()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::info!(
            "Opened sqlite backend at {:?} (journal_mode={})",
            backend.db_path,
            mode
        );
        Ok(backend)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn get_conn(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn table_name(partition: &Partition) -> Result<String> {
    let name = partition.name();
    if name.is_empty() || name.contains('"') {
        return Err(StoreError::Backend(format!(
            "invalid partition name: {}",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

struct SqliteTxn<'a> {
    tx: &'a Transaction<'a>,
}

impl ReadTxn for SqliteTxn<'_> {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", table_name(partition)?);
        let value = self
            .tx
            .query_row(&sql, params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;
        Ok(value)
    }
}

impl WriteTxn for SqliteTxn<'_> {
    fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            table_name(partition)?
        );
        self.tx.execute(&sql, params![key, value])?;
        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn ensure_partition(&self, partition: &Partition) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key BLOB PRIMARY KEY,
                    value BLOB NOT NULL
                ) WITHOUT ROWID",
                table_name(partition)?
            ),
            [],
        )?;
        Ok(())
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&SqliteTxn { tx: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // dropping `tx` on the error path rolls it back
        let out = f(&mut SqliteTxn { tx: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("test.db")).unwrap();
        let partition = Partition::new("bucket-0");
        backend.ensure_partition(&partition).unwrap();
        backend.ensure_partition(&partition).unwrap();

        backend
            .update(|txn| txn.put(&partition, b"k", b"v"))
            .unwrap();
        let value = backend.view(|txn| txn.get(&partition, b"k")).unwrap();
        assert_eq!(value, Some(b"v".to_vec()));

        let missing = backend.view(|txn| txn.get(&partition, b"nope")).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_sqlite_update_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("test.db")).unwrap();
        let partition = Partition::new("bucket-1");
        backend.ensure_partition(&partition).unwrap();

        let result: Result<()> = backend.update(|txn| {
            txn.put(&partition, b"k", b"v")?;
            Err(StoreError::Existing)
        });
        assert_eq!(result, Err(StoreError::Existing));

        let value = backend.view(|txn| txn.get(&partition, b"k")).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_sqlite_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");
        let partition = Partition::new("meta");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.ensure_partition(&partition).unwrap();
            backend
                .update(|txn| txn.put(&partition, b"object-cnt", &7u32.to_le_bytes()))
                .unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        let value = backend
            .view(|txn| txn.get(&partition, b"object-cnt"))
            .unwrap();
        assert_eq!(value, Some(7u32.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_sqlite_unknown_partition_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path().join("test.db")).unwrap();
        let result = backend.view(|txn| txn.get(&Partition::new("bucket-9"), b"k"));
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }
}
