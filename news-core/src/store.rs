use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::error::StorageError;
use crate::favorite::{self, FavoriteRecord};

/// Narrow contract over the engine that durably holds favorites.
#[async_trait]
pub trait FavoriteEngine: Send + Sync {
    async fn load_all(&self) -> Result<Vec<FavoriteRecord>, StorageError>;
    /// Creates the record or replaces the one with the same id.
    async fn put(&self, record: FavoriteRecord) -> Result<(), StorageError>;
    /// Returns whether a record with that id existed.
    async fn remove(&self, id: &str) -> Result<bool, StorageError>;
}

/// Volatile engine; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    records: RwLock<Vec<FavoriteRecord>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavoriteEngine for MemoryEngine {
    async fn load_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        Ok(self.records.read().await.clone())
    }

    async fn put(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        upsert_in_place(&mut records, record);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|existing| existing.id != id);
        Ok(records.len() != before)
    }
}

/// Stores favorites as a pretty-printed JSON array.
///
/// Writes go to `<file>.tmp` first and are renamed over the main file; a
/// corrupt main file falls back to that temp copy when it is readable.
#[derive(Debug, Clone)]
pub struct JsonFileEngine {
    path: PathBuf,
}

impl JsonFileEngine {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_records(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Vec<FavoriteRecord>>(&bytes) {
            Ok(records) => Ok(records),
            Err(source) => {
                let tmp = self.tmp_path();
                warn!(error = %source, path = %self.path.display(), "failed to parse favorites, trying tmp fallback");
                match tokio::fs::read(&tmp).await {
                    Ok(tmp_bytes) => match serde_json::from_slice(&tmp_bytes) {
                        Ok(records) => Ok(records),
                        Err(_) => Err(StorageError::Corrupt {
                            path: self.path.clone(),
                            source,
                        }),
                    },
                    Err(_) => Err(StorageError::Corrupt {
                        path: self.path.clone(),
                        source,
                    }),
                }
            }
        }
    }

    async fn write_records(&self, records: &[FavoriteRecord]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(records)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // write-then-rename
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl FavoriteEngine for JsonFileEngine {
    async fn load_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        self.read_records().await
    }

    async fn put(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        let mut records = self.read_records().await?;
        upsert_in_place(&mut records, record);
        self.write_records(&records).await
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.read_records().await?;
        let before = records.len();
        records.retain(|existing| existing.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records).await?;
        Ok(true)
    }
}

fn upsert_in_place(records: &mut Vec<FavoriteRecord>, record: FavoriteRecord) {
    match records.iter_mut().find(|existing| existing.id == record.id) {
        Some(slot) => *slot = record,
        None => records.push(record),
    }
}

pub type FavoriteSnapshot = Arc<Vec<FavoriteRecord>>;

/// The shared favorite collection.
///
/// Mutations and reloads are serialized; after each mutation the whole set
/// is reloaded from the engine and published as a new snapshot. Readers only
/// ever see complete snapshots. When a reload fails the previous snapshot
/// stays in place.
#[derive(Clone)]
pub struct FavoriteStore {
    engine: Arc<dyn FavoriteEngine>,
    snapshot: Arc<watch::Sender<FavoriteSnapshot>>,
    write_lock: Arc<Mutex<()>>,
}

impl FavoriteStore {
    /// Opens the store and loads the current favorites, starting empty when the engine is unreadable.
    pub async fn open(engine: Arc<dyn FavoriteEngine>) -> Self {
        let store = Self::empty(engine);
        if let Err(err) = store.reload().await {
            warn!(error = %err, "starting with an empty favorite set");
        }
        store
    }

    /// Like [`FavoriteStore::open`] but fails when the initial load fails.
    pub async fn try_open(engine: Arc<dyn FavoriteEngine>) -> Result<Self, StorageError> {
        let store = Self::empty(engine);
        store.reload().await?;
        Ok(store)
    }

    pub fn in_memory() -> Self {
        Self::empty(Arc::new(MemoryEngine::new()))
    }

    fn empty(engine: Arc<dyn FavoriteEngine>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            engine,
            snapshot: Arc::new(snapshot),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads every record from the engine and publishes them.
    pub async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        let snapshot = self.reload().await?;
        Ok(snapshot.as_ref().clone())
    }

    pub async fn reload(&self) -> Result<FavoriteSnapshot, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.reload_locked().await
    }

    pub async fn upsert(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let id = record.id.clone();
        self.engine.put(record).await?;
        info!(id = %id, "favorite saved");
        self.reload_locked().await?;
        Ok(())
    }

    /// Removes the favorite with this id and returns whether one existed.
    /// Absent ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.engine.remove(id).await?;
        if removed {
            info!(id = %id, "favorite removed");
        } else {
            debug!(id = %id, "no favorite to remove");
        }
        self.reload_locked().await?;
        Ok(removed)
    }

    pub async fn favorite(&self, article: &Article) -> Result<(), StorageError> {
        self.upsert(favorite::from_article(article)).await
    }

    pub async fn unfavorite(&self, article: &Article) -> Result<bool, StorageError> {
        self.delete(&article.id).await
    }

    /// Flips the favorite state of `article` and returns the new state.
    pub async fn toggle(&self, article: &Article) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let now_favorited = if self.engine.remove(&article.id).await? {
            info!(id = %article.id, "favorite removed");
            false
        } else {
            self.engine.put(favorite::from_article(article)).await?;
            info!(id = %article.id, "favorite saved");
            true
        };
        self.reload_locked().await?;
        Ok(now_favorited)
    }

    /// Last successfully loaded favorite set.
    pub fn snapshot(&self) -> FavoriteSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified after every successful reload.
    pub fn subscribe(&self) -> watch::Receiver<FavoriteSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn is_favorited(&self, article: &Article) -> bool {
        favorite::is_favorited(article, &self.snapshot())
    }

    /// Favorites converted to display articles.
    pub fn articles(&self) -> Vec<Article> {
        favorite::to_articles(&self.snapshot())
    }

    async fn reload_locked(&self) -> Result<FavoriteSnapshot, StorageError> {
        match self.engine.load_all().await {
            Ok(records) => {
                debug!(count = records.len(), "favorites reloaded");
                let snapshot = Arc::new(records);
                self.snapshot.send_replace(snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "failed to reload favorites, keeping last known set");
                Err(err)
            }
        }
    }
}
