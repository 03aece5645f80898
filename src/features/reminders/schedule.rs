//! Daily fire time in a fixed IANA timezone
//!
//! The cron expression `MM HH * * *` is evaluated in `timezone` with `croner`.
//! On DST transitions the slot fires once: at the earlier instant of a repeated
//! wall time, and at the end of the gap when the wall time is skipped.

use crate::core::Config;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use croner::Cron;
use std::sync::Arc;

/// Longest DST gap we will walk back through, in minutes
const MAX_GAP_MINUTES: i64 = 24 * 60;

#[derive(Clone)]
pub struct DailySchedule {
    fire_time: NaiveTime,
    timezone: Tz,
    cron: Arc<Cron>,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, timezone: Tz) -> Result<Self> {
        let fire_time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid fire time {:02}:{:02}", hour, minute))?;
        let expression = cron_expression_for(fire_time);
        let cron: Cron = expression
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid schedule '{}': {:?}", expression, e))?;

        Ok(DailySchedule {
            fire_time,
            timezone,
            cron: Arc::new(cron),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.reminder_hour, config.reminder_minute, config.reminder_timezone)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn fire_time(&self) -> NaiveTime {
        self.fire_time
    }

    pub fn cron_expression(&self) -> String {
        cron_expression_for(self.fire_time)
    }

    /// Next firing strictly after `after`
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut anchor = after.with_timezone(&self.timezone);
        loop {
            let next = self
                .cron
                .find_next_occurrence(&anchor, false)
                .map_err(|e| anyhow::anyhow!("No next occurrence for '{}': {:?}", self.cron_expression(), e))?;
            let next_utc = next.with_timezone(&Utc);

            // Apply the DST policy to every local day up to croner's answer
            let mut date = self.local_date(after);
            while date <= next.date_naive() {
                if let Some(slot) = self.resolve_local(date.and_time(self.fire_time)) {
                    if slot > after {
                        return Ok(slot.min(next_utc));
                    }
                }
                date += ChronoDuration::days(1);
            }

            // croner returned the second pass of a repeated wall time already fired
            anchor = next;
        }
    }

    /// Local calendar date at `at`
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    /// `[start, end)` of the local day containing `at`, as UTC instants
    pub fn local_day_bounds(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(at);
        let start = self.resolve_local_or_utc(date.and_time(NaiveTime::MIN));
        let end = self.resolve_local_or_utc((date + ChronoDuration::days(1)).and_time(NaiveTime::MIN));
        (start, end)
    }

    /// Map a wall-clock time to an instant: earliest of an ambiguous pair,
    /// the end of the gap for a skipped time.
    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => self.gap_end(naive),
        }
    }

    fn resolve_local_or_utc(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        self.resolve_local(naive)
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }

    /// First valid instant after the gap containing `naive`: one minute past the
    /// last wall minute that still exists before it.
    fn gap_end(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        (1..=MAX_GAP_MINUTES).find_map(|minutes| {
            self.timezone
                .from_local_datetime(&(naive - ChronoDuration::minutes(minutes)))
                .earliest()
                .map(|before| before.with_timezone(&Utc) + ChronoDuration::minutes(minutes))
        })
    }
}

/// Five-field cron form: minute, hour, every day
fn cron_expression_for(fire_time: NaiveTime) -> String {
    format!("{} {} * * *", fire_time.format("%-M"), fire_time.format("%-H"))
}
