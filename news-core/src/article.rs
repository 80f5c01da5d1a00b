use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;
use crate::identity::assign_id;

/// Text the feed substitutes for fields it is not licensed to deliver.
pub const DEFAULT_PLACEHOLDER: &str = "[Removed]";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

/// Decoded feed envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsResponse {
    pub status: String,
    pub total_results: u64,
    pub articles: Vec<Article>,
}

/// Turns raw feed elements into canonical articles.
///
/// Decoding is two-phase: the payload is first parsed into a loose
/// `serde_json::Value`, then each element is validated field by field.
#[derive(Debug, Clone)]
pub struct ArticleDecoder {
    placeholder: String,
}

impl Default for ArticleDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl ArticleDecoder {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// Decodes one feed element. Only `title` is required to be present; it may be null.
    pub fn decode(&self, raw: &Value) -> Result<Article, DecodeError> {
        let fields = raw.as_object().ok_or(DecodeError::NotAnObject("article"))?;
        if !fields.contains_key("title") {
            return Err(DecodeError::MissingField("title"));
        }

        let title = self.scrub(optional_string(fields, "title")?);
        let description = self.scrub(optional_string(fields, "description")?);
        let content = self.scrub(optional_string(fields, "content")?);
        let author = optional_string(fields, "author")?;
        let url = optional_string(fields, "url")?;
        let image_url = optional_string(fields, "urlToImage")?;
        let published_at = fields.get("publishedAt").and_then(parse_published_at);

        Ok(Article {
            id: assign_id(url.as_deref()),
            author,
            title,
            description,
            url,
            image_url,
            published_at,
            content,
        })
    }

    /// Decodes a whole envelope. Any failing element fails the batch.
    pub fn decode_envelope(&self, payload: &Value) -> Result<NewsResponse, DecodeError> {
        let envelope = payload
            .as_object()
            .ok_or(DecodeError::NotAnObject("response"))?;

        let status = match envelope.get("status") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(DecodeError::InvalidField {
                    field: "status",
                    expected: "a string",
                })
            }
            None => return Err(DecodeError::MissingField("status")),
        };
        let total_results = match envelope.get("totalResults") {
            Some(value) => value.as_u64().ok_or(DecodeError::InvalidField {
                field: "totalResults",
                expected: "a non-negative integer",
            })?,
            None => return Err(DecodeError::MissingField("totalResults")),
        };
        let raw_articles = match envelope.get("articles") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(DecodeError::InvalidField {
                    field: "articles",
                    expected: "an array",
                })
            }
            None => return Err(DecodeError::MissingField("articles")),
        };

        let articles = raw_articles
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                self.decode(raw).map_err(|err| DecodeError::Element {
                    index,
                    source: Box::new(err),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            status = %status,
            total_results,
            decoded = articles.len(),
            "decoded feed envelope"
        );

        Ok(NewsResponse {
            status,
            total_results,
            articles,
        })
    }

    pub fn decode_response(&self, bytes: &[u8]) -> Result<NewsResponse, DecodeError> {
        let payload: Value = serde_json::from_slice(bytes)?;
        self.decode_envelope(&payload)
    }

    fn scrub(&self, value: Option<String>) -> Option<String> {
        value.filter(|v| *v != self.placeholder)
    }
}

fn optional_string(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

/// Reads `publishedAt`: ISO-8601 first, then Unix epoch seconds. Never fails.
pub fn parse_published_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            parse_iso8601(text).or_else(|| text.parse::<i64>().ok().and_then(from_epoch_seconds))
        }
        Value::Number(number) => number.as_i64().and_then(from_epoch_seconds),
        _ => None,
    }
}

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| text.parse::<DateTime<FixedOffset>>())
        // minutes-only times such as `2024-12-05T08:30Z`
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn from_epoch_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
