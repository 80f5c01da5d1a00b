use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use news_core::{
    from_article, Article, ArticleDecoder, FavoriteEngine, FavoriteRecord, FavoriteStore,
    JsonFileEngine, MemoryEngine, StorageError,
};
use serde_json::json;

fn article(url: Option<&str>, title: &str) -> Article {
    let mut raw = json!({ "title": title, "content": format!("<b>{title}</b> body") });
    if let Some(url) = url {
        raw["url"] = json!(url);
    }
    ArticleDecoder::default().decode(&raw).unwrap()
}

#[tokio::test]
async fn favorites_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");

    let store = FavoriteStore::open(Arc::new(JsonFileEngine::new(&path))).await;
    let a = article(Some("http://e/1"), "First");
    store.favorite(&a).await.unwrap();
    assert!(store.is_favorited(&a));

    let reopened = FavoriteStore::try_open(Arc::new(JsonFileEngine::new(&path)))
        .await
        .unwrap();
    let records = reopened.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "http://e/1");
    assert_eq!(records[0].content.as_deref(), Some("First body"));
    assert!(reopened.is_favorited(&a));
}

#[tokio::test]
async fn upsert_then_delete_flips_membership() {
    let store = FavoriteStore::in_memory();
    let a = article(Some("http://e/1"), "First");

    assert!(!store.is_favorited(&a));
    store.upsert(from_article(&a)).await.unwrap();
    assert!(store.is_favorited(&a));
    store.delete(&a.id).await.unwrap();
    assert!(!store.is_favorited(&a));
}

#[tokio::test]
async fn refavoriting_replaces_instead_of_duplicating() {
    let store = FavoriteStore::in_memory();
    let a = article(Some("http://e/1"), "First");
    let b = article(Some("http://e/1"), "Renamed");

    store.favorite(&a).await.unwrap();
    store.favorite(&b).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn deleting_an_unknown_id_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = FavoriteStore::open(Arc::new(JsonFileEngine::new(
        dir.path().join("favorites.json"),
    )))
    .await;
    let a = article(Some("http://e/1"), "First");
    store.favorite(&a).await.unwrap();

    assert!(!store.delete("http://nowhere").await.unwrap());
    assert_eq!(store.snapshot().len(), 1);
    assert!(store.delete(&a.id).await.unwrap());
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn generated_identity_round_trips_through_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("favorites.json");
    let store = FavoriteStore::open(Arc::new(JsonFileEngine::new(&path))).await;

    let a = article(None, "No link");
    assert!(!a.id.is_empty());
    store.favorite(&a).await.unwrap();

    let reopened = FavoriteStore::open(Arc::new(JsonFileEngine::new(&path))).await;
    let records = reopened.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, a.id);
    assert!(reopened.is_favorited(&a));
}

#[tokio::test]
async fn toggle_alternates_state() {
    let store = FavoriteStore::in_memory();
    let a = article(Some("http://e/1"), "First");

    assert!(store.toggle(&a).await.unwrap());
    assert!(store.is_favorited(&a));
    assert!(!store.toggle(&a).await.unwrap());
    assert!(!store.is_favorited(&a));
}

#[tokio::test]
async fn subscribers_see_each_reload() {
    let store = FavoriteStore::in_memory();
    let mut updates = store.subscribe();
    let a = article(Some("http://e/1"), "First");

    store.favorite(&a).await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().len(), 1);

    store.unfavorite(&a).await.unwrap();
    updates.changed().await.unwrap();
    assert!(updates.borrow_and_update().is_empty());
}

#[tokio::test]
async fn concurrent_mutations_are_not_lost() {
    let store = FavoriteStore::open(Arc::new(MemoryEngine::new())).await;
    let mut tasks = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let a = article(Some(&format!("http://e/{i}")), "item");
            store.favorite(&a).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(store.snapshot().len(), 20);
}

/// Engine whose reads can be switched off to simulate an unreadable store.
#[derive(Default)]
struct FlakyEngine {
    inner: MemoryEngine,
    broken: AtomicBool,
}

#[async_trait]
impl FavoriteEngine for FlakyEngine {
    async fn load_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk gone")));
        }
        self.inner.load_all().await
    }

    async fn put(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("read-only")));
        }
        self.inner.put(record).await
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        self.inner.remove(id).await
    }
}

#[tokio::test]
async fn failures_keep_last_known_good_snapshot() {
    let engine = Arc::new(FlakyEngine::default());
    let store = FavoriteStore::open(engine.clone()).await;
    let a = article(Some("http://e/1"), "First");
    store.favorite(&a).await.unwrap();

    engine.broken.store(true, Ordering::SeqCst);

    let b = article(Some("http://e/2"), "Second");
    assert!(store.favorite(&b).await.is_err());
    assert!(store.list_all().await.is_err());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(store.is_favorited(&a));
    assert!(!store.is_favorited(&b));
}

#[tokio::test]
async fn open_on_unreadable_engine_starts_empty() {
    let engine = Arc::new(FlakyEngine::default());
    engine.broken.store(true, Ordering::SeqCst);

    assert!(FavoriteStore::try_open(engine.clone()).await.is_err());
    let store = FavoriteStore::open(engine).await;
    assert!(store.snapshot().is_empty());
}
