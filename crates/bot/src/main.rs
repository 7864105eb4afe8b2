use advisor_core::broker::tinkoff::TinkoffClient;
use advisor_core::broker::PortfolioProvider;
use advisor_core::delivery::telegram::TelegramClient;
use advisor_core::delivery::DeliveryChannel;
use advisor_core::llm::openai::OpenAiClient;
use advisor_core::llm::AdvisoryGenerator;
use advisor_core::news::newsapi::{NewsApiClient, DEFAULT_QUERY};
use advisor_core::news::NewsProvider;
use advisor_core::pipeline::Pipeline;
use advisor_core::schedule::Scheduler;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "advisor_bot")]
struct Args {
    /// Run one analysis immediately and exit instead of starting the daemon.
    #[arg(long)]
    run_once: bool,

    /// Force the monthly funding reminder into the run (only with --run-once).
    #[arg(long)]
    monthly: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let broker = TinkoffClient::from_settings(&settings)?;
    let news = NewsApiClient::from_settings(&settings)?;
    let advisor = OpenAiClient::from_settings(&settings)?;
    let telegram = Arc::new(TelegramClient::from_settings(&settings)?);

    let news_query = settings
        .news_query
        .clone()
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(broker) as Arc<dyn PortfolioProvider>,
        Arc::new(news) as Arc<dyn NewsProvider>,
        Arc::new(advisor) as Arc<dyn AdvisoryGenerator>,
        Arc::clone(&telegram) as Arc<dyn DeliveryChannel>,
        news_query,
    ));

    let report_hour = settings.report_hour()?;
    let mut scheduler = Scheduler::new(Arc::clone(&pipeline), settings.timezone()?, report_hour);

    if args.run_once {
        if let Err(err) = scheduler.run_now(args.monthly).await {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
        return Ok(());
    }

    scheduler.start()?;
    tracing::info!(report_hour, "advisor bot started");

    if let Err(err) = telegram
        .send_message("🤖 Invest advisor bot started.", false)
        .await
    {
        tracing::warn!(error = %err, "startup notification failed");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let listener = tokio::spawn(commands::listen(
        Arc::clone(&telegram),
        Arc::clone(&pipeline),
        shutdown_rx,
    ));

    wait_for_signal().await;
    tracing::info!("shutdown signal received");

    let _ = shutdown_tx.send(true);
    let drain = async {
        scheduler.stop().await;
        let _ = listener.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("shutdown grace period elapsed; exiting anyway");
    }

    Ok(())
}

fn init_sentry(settings: &advisor_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(error = %err, "failed to install SIGTERM handler; using ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
