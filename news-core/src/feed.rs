use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::article::Article;
use crate::error::FetchError;
use crate::fetcher::NewsClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Everything,
    TopHeadlines,
}

impl Category {
    pub fn path(&self) -> &'static str {
        match self {
            Category::Everything => "everything",
            Category::TopHeadlines => "top-headlines",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Updated { category: Category, count: usize },
    Failed { category: Category, message: String },
}

pub type SharedResults = Arc<RwLock<HashMap<Category, Vec<Article>>>>;

/// Latest article list per category.
///
/// Refreshes of the same category are not coordinated: whichever completes
/// last replaces the list. A failed refresh leaves the previous list alone.
#[derive(Debug, Clone)]
pub struct ArticleFeed {
    client: Arc<NewsClient>,
    results: SharedResults,
    last_error: Arc<RwLock<Option<String>>>,
    events: broadcast::Sender<FeedEvent>,
}

impl ArticleFeed {
    pub fn new(client: NewsClient) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            client: Arc::new(client),
            results: Arc::new(RwLock::new(HashMap::new())),
            last_error: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub async fn refresh(&self, category: Category) -> Result<usize, FetchError> {
        match self.client.fetch(category).await {
            Ok(articles) => {
                let count = articles.len();
                self.results.write().await.insert(category, articles);
                *self.last_error.write().await = None;
                info!(category = %category, count, "articles updated");
                let _ = self.events.send(FeedEvent::Updated { category, count });
                Ok(count)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(category = %category, error = %message, "failed to fetch articles");
                *self.last_error.write().await = Some(message.clone());
                let _ = self.events.send(FeedEvent::Failed { category, message });
                Err(err)
            }
        }
    }

    /// Runs [`ArticleFeed::refresh`] in the background; the outcome arrives as a [`FeedEvent`].
    pub fn spawn_refresh(&self, category: Category) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            let _ = feed.refresh(category).await;
        })
    }

    pub async fn articles(&self, category: Category) -> Vec<Article> {
        self.results
            .read()
            .await
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }
}
