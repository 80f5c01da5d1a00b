use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::article::{Article, ArticleDecoder};
use crate::config::{ApiConfig, NewsConfig};
use crate::error::{DecodeError, FetchError};
use crate::feed::Category;
use crate::filter::filter_articles;

const USER_AGENT: &str = concat!("newsreader/", env!("CARGO_PKG_VERSION"));

/// Fetches one category from the remote feed and returns its displayable articles.
///
/// No retries: every failure is handed back to the caller.
#[derive(Debug, Clone)]
pub struct NewsClient {
    http: Client,
    api: ApiConfig,
    decoder: ArticleDecoder,
}

impl NewsClient {
    pub fn new(http: Client, api: ApiConfig, decoder: ArticleDecoder) -> Self {
        Self { http, api, decoder }
    }

    pub fn from_config(config: &NewsConfig) -> Result<Self, FetchError> {
        let http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.api.request_timeout())
            .build()?;
        Ok(Self::new(
            http,
            config.api.clone(),
            ArticleDecoder::new(config.placeholder.clone()),
        ))
    }

    pub fn endpoint(&self, category: Category) -> Result<Url, FetchError> {
        let mut base = self.api.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base)?.join(category.path())?;
        url.query_pairs_mut()
            .append_pair("q", &self.api.query)
            .append_pair("sortBy", &self.api.sort_by)
            .append_pair("apiKey", &self.api.api_key);
        Ok(url)
    }

    pub async fn fetch(&self, category: Category) -> Result<Vec<Article>, FetchError> {
        let url = self.endpoint(category)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(category = %category, status = status.as_u16(), bytes = bytes.len(), "raw response received");

        if !status.is_success() {
            return Err(serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|payload| api_error(&payload))
                .unwrap_or(FetchError::Status(status.as_u16())));
        }

        let payload: Value = serde_json::from_slice(&bytes).map_err(DecodeError::from)?;
        if let Some(err) = api_error(&payload) {
            return Err(err);
        }

        let response = self.decoder.decode_envelope(&payload)?;
        let decoded = response.articles.len();
        let articles = filter_articles(response.articles);
        debug!(category = %category, decoded, kept = articles.len(), "articles filtered");
        Ok(articles)
    }
}

/// In-band failure report: `{"status": "error", "code": ..., "message": ...}`.
fn api_error(payload: &Value) -> Option<FetchError> {
    if payload.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    Some(FetchError::Api {
        code: text("code"),
        message: text("message"),
    })
}
