use crate::pipeline::Pipeline;
use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, FixedOffset, Timelike, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Day of month on which the daily run carries the funding reminder.
pub const MONTHLY_REMINDER_DAY: u32 = 5;

/// Fires the pipeline once a day at a fixed local hour. The monthly reminder
/// flag is computed from the local date at fire time, not at scheduling time,
/// so a restart shortly before midnight cannot pin a stale date.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    timezone: FixedOffset,
    fire_hour: u32,
    worker: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, timezone: FixedOffset, fire_hour: u32) -> Self {
        Self {
            pipeline,
            timezone,
            fire_hour,
            worker: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            bail!("scheduler already started");
        }

        let (tx, mut rx) = watch::channel(false);
        let pipeline = Arc::clone(&self.pipeline);
        let timezone = self.timezone;
        let fire_hour = self.fire_hour;

        let handle = tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&timezone);
                let next = next_fire_time(now, fire_hour);
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::info!(next_fire = %next, "scheduler sleeping until next daily run");

                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            tracing::info!("scheduler stopping");
                            break;
                        }
                    }
                    () = tokio::time::sleep(wait) => {
                        let fired = Utc::now().with_timezone(&timezone);
                        let monthly = is_monthly_reminder(fired.date_naive());
                        tracing::info!(fired = %fired, monthly, "daily run firing");
                        if let Err(err) = pipeline.run(monthly).await {
                            tracing::error!(error = %format!("{err:#}"), "scheduled run failed");
                        }
                    }
                }
            }
        });

        self.worker = Some((tx, handle));
        Ok(())
    }

    /// Signals the worker and waits for it to drain.
    pub async fn stop(&mut self) {
        if let Some((tx, handle)) = self.worker.take() {
            let _ = tx.send(true);
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "scheduler worker did not shut down cleanly");
            }
        }
    }

    /// Runs the pipeline immediately, outside the daily cadence.
    pub async fn run_now(&self, monthly_reminder: bool) -> Result<()> {
        self.pipeline.run(monthly_reminder).await
    }
}

pub fn is_monthly_reminder(date: chrono::NaiveDate) -> bool {
    date.day() == MONTHLY_REMINDER_DAY
}

/// Next local instant at `fire_hour:00:00` strictly after `now`.
pub fn next_fire_time(now: DateTime<FixedOffset>, fire_hour: u32) -> DateTime<FixedOffset> {
    let candidate = now
        .with_hour(fire_hour)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    if candidate <= now {
        candidate + ChronoDuration::days(1)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn moscow() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn reminder_fires_only_on_day_five() {
        assert!(is_monthly_reminder(
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        ));
        assert!(!is_monthly_reminder(
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        ));
        assert!(!is_monthly_reminder(
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        ));
    }

    #[test]
    fn fire_time_is_today_when_hour_not_yet_reached() {
        let now = moscow().with_ymd_and_hms(2025, 3, 4, 5, 30, 0).unwrap();
        let next = next_fire_time(now, 7);
        assert_eq!(
            next,
            moscow().with_ymd_and_hms(2025, 3, 4, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn fire_time_rolls_to_tomorrow_when_hour_passed() {
        let now = moscow().with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        let next = next_fire_time(now, 7);
        assert_eq!(
            next,
            moscow().with_ymd_and_hms(2025, 3, 5, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn fire_time_rolls_when_exactly_at_the_hour() {
        let now = moscow().with_ymd_and_hms(2025, 3, 4, 7, 0, 0).unwrap();
        let next = next_fire_time(now, 7);
        assert_eq!(
            next,
            moscow().with_ymd_and_hms(2025, 3, 5, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_boundary_rolls_into_next_month() {
        let now = moscow().with_ymd_and_hms(2025, 3, 31, 8, 0, 0).unwrap();
        let next = next_fire_time(now, 7);
        assert_eq!(
            next,
            moscow().with_ymd_and_hms(2025, 4, 1, 7, 0, 0).unwrap()
        );
    }
}
