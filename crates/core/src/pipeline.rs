use crate::analysis::parser::parse_advisory;
use crate::analysis::prompt;
use crate::broker::PortfolioProvider;
use crate::delivery::DeliveryChannel;
use crate::llm::{AdvisoryGenerator, AdvisoryRequest};
use crate::news::NewsProvider;
use crate::report;
use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Budget for a whole scheduled run.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(120);
/// Tighter budget for manually triggered, latency-sensitive runs.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

const NEWS_LIMIT: usize = 5;

/// The four-step analysis workflow: fetch portfolio, fetch news, generate
/// advisory, deliver the formatted report. News failure degrades to an empty
/// article set; every other step failure aborts the run.
pub struct Pipeline {
    broker: Arc<dyn PortfolioProvider>,
    news: Arc<dyn NewsProvider>,
    advisor: Arc<dyn AdvisoryGenerator>,
    delivery: Arc<dyn DeliveryChannel>,
    news_query: String,
    // Single-flight guard: the advisory generator and the delivery channel
    // are shared rate-limited resources, so at most one run may be in flight.
    run_guard: tokio::sync::Mutex<()>,
}

impl Pipeline {
    pub fn new(
        broker: Arc<dyn PortfolioProvider>,
        news: Arc<dyn NewsProvider>,
        advisor: Arc<dyn AdvisoryGenerator>,
        delivery: Arc<dyn DeliveryChannel>,
        news_query: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            news,
            advisor,
            delivery,
            news_query: news_query.into(),
            run_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn run(&self, monthly_reminder: bool) -> Result<()> {
        self.run_with_deadline(monthly_reminder, RUN_TIMEOUT).await
    }

    pub async fn run_with_deadline(&self, monthly_reminder: bool, budget: Duration) -> Result<()> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| anyhow!("a portfolio analysis run is already in progress"))?;
        let deadline = Instant::now() + budget;

        tracing::info!(monthly_reminder, "starting portfolio analysis run");

        let portfolio = step(deadline, "fetch portfolio", self.broker.fetch_portfolio()).await?;
        tracing::info!(
            provider = self.broker.provider_name(),
            positions = portfolio.positions.len(),
            total_amount = portfolio.total_amount,
            "portfolio snapshot fetched"
        );

        let articles = match step(
            deadline,
            "fetch news",
            self.news.fetch_news(&self.news_query, NEWS_LIMIT),
        )
        .await
        {
            Ok(articles) => articles,
            Err(err) => {
                // News is supplementary context; its absence degrades the
                // advisory but never voids the run.
                tracing::warn!(error = %err, "news fetch failed; continuing with an empty article set");
                Vec::new()
            }
        };

        let request = AdvisoryRequest {
            portfolio_text: prompt::render_portfolio(&portfolio),
            news_text: prompt::render_news(&articles),
            monthly_reminder,
        };
        let advisory = step(deadline, "generate advisory", self.advisor.generate(&request)).await?;

        let mut analysis = parse_advisory(&advisory, &portfolio.positions);
        analysis.monthly_reminder = monthly_reminder;
        tracing::info!(
            provider = self.advisor.provider_name(),
            recommendations = analysis.recommendations.len(),
            opportunities = analysis.opportunities.len(),
            "advisory parsed"
        );

        let chunks = report::format_report(&portfolio, &analysis);
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!(part = i + 1, parts = chunks.len(), "delivering report chunk");
            if let Err(err) = step(deadline, "deliver report", self.delivery.send(chunk, true)).await
            {
                tracing::warn!(error = %err, "markdown delivery rejected; retrying as plain text");
                let plain = report::strip_markdown(chunk);
                step(
                    deadline,
                    "deliver report (plain)",
                    self.delivery.send(&plain, false),
                )
                .await?;
            }
        }

        tracing::info!("portfolio analysis run completed");
        Ok(())
    }
}

/// Runs one step under the shared run deadline; a timeout is attributed to
/// the step that was in flight.
async fn step<T>(
    deadline: Instant,
    name: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(res) => res.with_context(|| format!("failed to {name}")),
        Err(_) => Err(anyhow!("run deadline exceeded while trying to {name}")),
    }
}
