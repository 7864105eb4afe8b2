use crate::config::Settings;
use crate::news::{Article, NewsProvider};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/everything";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_QUERY: &str = "Russia stocks";
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_news_api_key()?.to_string();
        let base_url =
            std::env::var("NEWSAPI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("NEWSAPI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiClient {
    async fn fetch_news(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        let query = if query.trim().is_empty() { DEFAULT_QUERY } else { query };
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };

        let res = self
            .http
            .get(&self.base_url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", &limit.to_string()),
            ])
            .send()
            .await
            .context("news request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news response body")?;
        if !status.is_success() {
            anyhow::bail!("news API returned HTTP {status}: {text}");
        }

        let parsed: NewsApiResponse = serde_json::from_str(&text)
            .with_context(|| format!("failed to decode news response: {text}"))?;
        anyhow::ensure!(
            parsed.status == "ok",
            "news API returned error status: {}",
            parsed.status
        );

        Ok(parsed.articles.into_iter().map(WireArticle::into_article).collect())
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: String,
    published_at: DateTime<Utc>,
    #[serde(default)]
    source: WireSource,
}

#[derive(Debug, Default, Deserialize)]
struct WireSource {
    #[serde(default)]
    name: String,
}

impl WireArticle {
    fn into_article(self) -> Article {
        Article {
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            url: self.url,
            published_at: self.published_at,
            source: self.source.name,
        }
    }
}
