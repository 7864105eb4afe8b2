use crate::domain::portfolio::Portfolio;

pub mod tinkoff;

/// Source of portfolio snapshots. A fresh snapshot is produced on every call;
/// nothing is cached across pipeline runs.
#[async_trait::async_trait]
pub trait PortfolioProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_portfolio(&self) -> anyhow::Result<Portfolio>;
}
