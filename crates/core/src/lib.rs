pub mod analysis;
pub mod broker;
pub mod delivery;
pub mod domain;
pub mod llm;
pub mod news;
pub mod pipeline;
pub mod report;
pub mod schedule;

pub mod config {
    use anyhow::Context;
    use chrono::FixedOffset;

    // Moscow time; the brokerage and the report recipient live there.
    const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;
    const DEFAULT_DAILY_REPORT_HOUR: u32 = 7;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub broker_token: Option<String>,
        pub broker_account_id: Option<String>,
        pub broker_base_url: Option<String>,
        pub openai_api_key: Option<String>,
        pub telegram_token: Option<String>,
        pub telegram_chat_id: Option<String>,
        pub news_api_key: Option<String>,
        pub news_query: Option<String>,
        pub sentry_dsn: Option<String>,
        pub utc_offset_hours: i32,
        pub daily_report_hour: u32,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                broker_token: std::env::var("TINKOFF_TOKEN").ok(),
                broker_account_id: std::env::var("TINKOFF_ACCOUNT_ID").ok(),
                broker_base_url: std::env::var("TINKOFF_BASE_URL").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                telegram_token: std::env::var("TELEGRAM_TOKEN").ok(),
                telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
                news_api_key: std::env::var("NEWSAPI_TOKEN").ok(),
                news_query: std::env::var("NEWS_QUERY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                utc_offset_hours: env_parse("TIMEZONE_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS),
                daily_report_hour: env_parse("DAILY_REPORT_HOUR", DEFAULT_DAILY_REPORT_HOUR),
            })
        }

        pub fn require_broker_token(&self) -> anyhow::Result<&str> {
            self.broker_token
                .as_deref()
                .context("TINKOFF_TOKEN is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_telegram_token(&self) -> anyhow::Result<&str> {
            self.telegram_token
                .as_deref()
                .context("TELEGRAM_TOKEN is required")
        }

        pub fn require_telegram_chat_id(&self) -> anyhow::Result<&str> {
            self.telegram_chat_id
                .as_deref()
                .context("TELEGRAM_CHAT_ID is required")
        }

        pub fn require_news_api_key(&self) -> anyhow::Result<&str> {
            self.news_api_key
                .as_deref()
                .context("NEWSAPI_TOKEN is required")
        }

        pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
            FixedOffset::east_opt(self.utc_offset_hours * 3600)
                .with_context(|| format!("invalid TIMEZONE_OFFSET_HOURS: {}", self.utc_offset_hours))
        }

        /// Scheduled run hour, validated to a real wall-clock hour. An
        /// out-of-range hour would otherwise degrade the schedule silently.
        pub fn report_hour(&self) -> anyhow::Result<u32> {
            anyhow::ensure!(
                self.daily_report_hour < 24,
                "DAILY_REPORT_HOUR must be between 0 and 23, got {}",
                self.daily_report_hour
            );
            Ok(self.daily_report_hour)
        }
    }

    fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn settings_with_hour(daily_report_hour: u32) -> Settings {
            Settings {
                broker_token: None,
                broker_account_id: None,
                broker_base_url: None,
                openai_api_key: None,
                telegram_token: None,
                telegram_chat_id: None,
                news_api_key: None,
                news_query: None,
                sentry_dsn: None,
                utc_offset_hours: 3,
                daily_report_hour,
            }
        }

        #[test]
        fn report_hour_accepts_wall_clock_hours() {
            assert_eq!(settings_with_hour(0).report_hour().unwrap(), 0);
            assert_eq!(settings_with_hour(7).report_hour().unwrap(), 7);
            assert_eq!(settings_with_hour(23).report_hour().unwrap(), 23);
        }

        #[test]
        fn report_hour_rejects_out_of_range_values() {
            let err = settings_with_hour(24).report_hour().unwrap_err();
            assert!(err.to_string().contains("DAILY_REPORT_HOUR"));
            assert!(settings_with_hour(99).report_hour().is_err());
        }
    }
}
