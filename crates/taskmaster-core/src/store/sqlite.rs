//! Durable SQLite local store

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations, LocalStore};
use crate::error::Result;
use crate::models::Entity;

/// On-device SQLite file shared by the per-entity stores.
#[derive(Clone)]
pub struct LocalDatabase {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl LocalDatabase {
    /// Open the cache at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let database = Self::initialize(conn, Some(path.to_path_buf()))?;
        tracing::debug!("Opened local cache at {}", path.display());
        Ok(database)
    }

    /// Open an in-memory cache (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        // WAL is unavailable for in-memory databases; ignore failures there
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        migrations::run(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// File backing this cache, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store for one entity type backed by this database
    pub fn store<T: Entity>(&self) -> SqliteStore<T> {
        SqliteStore {
            conn: Arc::clone(&self.conn),
            _entity: PhantomData,
        }
    }
}

/// `LocalStore` keeping each entity as a JSON document row.
///
/// Storage errors are logged and degrade to an empty/absent result so the
/// store keeps the never-failing local contract.
pub struct SqliteStore<T: Entity> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteStore<T> {
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decode(document: &str) -> Option<T> {
        match serde_json::from_str(document) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!("Skipping unreadable cached {}: {}", T::KIND, error);
                None
            }
        }
    }

    fn try_list(&self) -> Result<Vec<T>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT document FROM {} ORDER BY created_at DESC, id DESC",
            T::COLLECTION
        ))?;
        let documents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(documents
            .iter()
            .filter_map(|document| Self::decode(document))
            .collect())
    }

    fn try_get(&self, id: &T::Id) -> Result<Option<T>> {
        let conn = self.lock();
        let document: Option<String> = conn
            .query_row(
                &format!("SELECT document FROM {} WHERE id = ?", T::COLLECTION),
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(document.as_deref().and_then(Self::decode))
    }

    fn upsert(conn: &Connection, entity: &T) -> Result<()> {
        let document = serde_json::to_string(entity)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, created_at, document) VALUES (?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     created_at = excluded.created_at,
                     document = excluded.document",
                T::COLLECTION
            ),
            params![
                entity.id().to_string(),
                entity.created_at().timestamp_millis(),
                document
            ],
        )?;
        Ok(())
    }

    fn try_put_many(&self, entities: &[T], replace: bool) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if replace {
            tx.execute(&format!("DELETE FROM {}", T::COLLECTION), [])?;
        }
        for entity in entities {
            Self::upsert(&tx, entity)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn try_delete(&self, id: &T::Id) -> Result<()> {
        self.lock().execute(
            &format!("DELETE FROM {} WHERE id = ?", T::COLLECTION),
            params![id.to_string()],
        )?;
        Ok(())
    }

    fn try_clear(&self) -> Result<()> {
        self.lock()
            .execute(&format!("DELETE FROM {}", T::COLLECTION), [])?;
        Ok(())
    }
}

impl<T: Entity> LocalStore<T> for SqliteStore<T> {
    fn list(&self) -> Vec<T> {
        self.try_list().unwrap_or_else(|error| {
            tracing::warn!("Failed to read cached {} list: {}", T::KIND, error);
            Vec::new()
        })
    }

    fn get(&self, id: &T::Id) -> Option<T> {
        self.try_get(id).unwrap_or_else(|error| {
            tracing::warn!("Failed to read cached {} {}: {}", T::KIND, id, error);
            None
        })
    }

    fn put(&self, entity: T) {
        if let Err(error) = Self::upsert(&self.lock(), &entity) {
            tracing::warn!("Failed to cache {} {}: {}", T::KIND, entity.id(), error);
        }
    }

    fn put_many(&self, entities: Vec<T>) {
        if let Err(error) = self.try_put_many(&entities, false) {
            tracing::warn!("Failed to cache {} batch: {}", T::KIND, error);
        }
    }

    fn delete(&self, id: &T::Id) {
        if let Err(error) = self.try_delete(id) {
            tracing::warn!("Failed to evict cached {} {}: {}", T::KIND, id, error);
        }
    }

    fn clear(&self) {
        if let Err(error) = self.try_clear() {
            tracing::warn!("Failed to clear cached {} list: {}", T::KIND, error);
        }
    }

    fn replace_all(&self, entities: Vec<T>) {
        if let Err(error) = self.try_put_many(&entities, true) {
            tracing::warn!("Failed to replace cached {} list: {}", T::KIND, error);
        }
    }
}
