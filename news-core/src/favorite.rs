use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::identity::generate_id;

static MARKUP_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^<>]*>").expect("valid tag regex")
});
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(amp|lt|gt|quot|apos|nbsp|#39);").expect("valid entity regex"));

/// Durable form of a favorited article, keyed by the article identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteRecord {
    pub id: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

/// Removes markup tags and decodes the handful of entities feeds commonly emit.
pub fn strip_markup(text: &str) -> String {
    let without_tags = MARKUP_TAG_RE.replace_all(text, "");
    ENTITY_RE
        .replace_all(&without_tags, |caps: &regex::Captures<'_>| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" | "#39" => "'",
            _ => " ",
        })
        .trim()
        .to_owned()
}

pub fn from_article(article: &Article) -> FavoriteRecord {
    FavoriteRecord {
        id: article.id.clone(),
        author: article.author.clone(),
        title: article.title.as_deref().map(strip_markup),
        content: article.content.as_deref().map(strip_markup),
        url: article.url.clone(),
    }
}

/// Rebuilds a display article from a stored favorite.
///
/// Lossy: the original publish time is not stored, so `published_at` is the
/// conversion time, and there is no image.
pub fn to_article(record: &FavoriteRecord) -> Article {
    let id = if record.id.is_empty() {
        generate_id()
    } else {
        record.id.clone()
    };
    Article {
        id,
        author: record.author.clone(),
        title: record.title.clone(),
        description: record.content.clone(),
        url: record.url.clone(),
        image_url: None,
        published_at: Some(Utc::now()),
        content: record.content.clone(),
    }
}

pub fn to_articles(records: &[FavoriteRecord]) -> Vec<Article> {
    records.iter().map(to_article).collect()
}

pub fn is_favorited(article: &Article, records: &[FavoriteRecord]) -> bool {
    records.iter().any(|record| record.id == article.id)
}
