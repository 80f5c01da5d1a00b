pub mod article;
pub mod config;
pub mod error;
pub mod favorite;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod identity;
pub mod store;

pub use article::{parse_published_at, DEFAULT_PLACEHOLDER};
pub use article::{Article, ArticleDecoder, NewsResponse};
pub use config::{ApiConfig, NewsConfig, StorageConfig};
pub use error::{ConfigError, DecodeError, FetchError, StorageError};
pub use favorite::FavoriteRecord;
pub use favorite::{from_article, is_favorited, strip_markup, to_article, to_articles};
pub use feed::{ArticleFeed, Category, FeedEvent, SharedResults};
pub use fetcher::NewsClient;
pub use filter::{filter_articles, has_displayable_text};
pub use identity::{assign_id, generate_id};
pub use store::{FavoriteEngine, FavoriteSnapshot, FavoriteStore, JsonFileEngine, MemoryEngine};
