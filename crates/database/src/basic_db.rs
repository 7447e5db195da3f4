use libmdbx::{Database, DatabaseOptions, TableFlags, WriteFlags, WriteMap};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::DbError;

/// Shared handle over one libmdbx environment.
///
/// Clones share the same environment. After [`SafeDatabase::close`] every
/// call on every clone fails with [`DbError::Closed`].
#[derive(Clone)]
pub struct InnerDatabase {
    db: Arc<Mutex<Option<Database<WriteMap>>>>,
}

/// Key/value access used by the typed stores. Implementations must be safe to
/// share between the sync loops and request handlers.
pub trait SafeDatabase: Send + Sync {
    /// Writes `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &[u8], table: &str) -> Result<(), DbError>;

    /// Writes `value` under `key` only if the key is absent.
    fn insert(&self, key: &str, value: &[u8], table: &str) -> Result<(), DbError>;

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, DbError>;

    fn read_all(&self, table: &str) -> Result<HashMap<Vec<u8>, Vec<u8>>, DbError>;

    fn close(&self);
}

impl InnerDatabase {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let mut options = DatabaseOptions::default();
        options.max_tables = Some(100);
        let db = Database::<WriteMap>::open_with_options(path, options)?;

        Ok(Self {
            db: Arc::new(Mutex::new(Some(db))),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Database<WriteMap>>> {
        // uncommitted transactions abort on drop, poisoning leaves nothing half-written
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn put(&self, key: &str, value: &[u8], table: &str, flags: WriteFlags) -> Result<(), DbError> {
        let guard = self.lock();
        let db = guard.as_ref().ok_or(DbError::Closed)?;
        let transaction = db.begin_rw_txn()?;
        let table_handle = transaction.create_table(Some(table), TableFlags::default())?;

        match transaction.put(&table_handle, key, value, flags) {
            Ok(()) => {}
            Err(libmdbx::Error::KeyExist) => return Err(DbError::AlreadyExists(key.to_string())),
            Err(e) => return Err(e.into()),
        }
        transaction.commit()?;
        Ok(())
    }
}

impl SafeDatabase for InnerDatabase {
    fn write(&self, key: &str, value: &[u8], table: &str) -> Result<(), DbError> {
        self.put(key, value, table, WriteFlags::default())
    }

    fn insert(&self, key: &str, value: &[u8], table: &str) -> Result<(), DbError> {
        self.put(key, value, table, WriteFlags::NO_OVERWRITE)
    }

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, DbError> {
        let guard = self.lock();
        let db = guard.as_ref().ok_or(DbError::Closed)?;
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let result: Option<Vec<u8>> = transaction.get(&table, key.as_bytes())?;
            return Ok(result);
        }

        Ok(None)
    }

    fn read_all(&self, table: &str) -> Result<HashMap<Vec<u8>, Vec<u8>>, DbError> {
        let mut map = HashMap::new();
        let guard = self.lock();
        let db = guard.as_ref().ok_or(DbError::Closed)?;
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let mut cursor = transaction.cursor(&table)?;

            for item in cursor.iter_start() {
                let (key, value): (Vec<u8>, Vec<u8>) = item?;
                map.insert(key, value);
            }
        }

        Ok(map)
    }

    fn close(&self) {
        // dropping the environment flushes and releases the files
        self.lock().take();
    }
}

//  NOTE: values are copied out as Vec<u8> on purpose. Borrowed Cow<[u8]> values
//  point into the mmap and must not outlive the read transaction.
