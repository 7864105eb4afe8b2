use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod newsapi;

/// One externally sourced news item. Read-only; absence of articles never
/// blocks a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Article>>;
}
