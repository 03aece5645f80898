//! Environment-driven configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Added APP_ENV and REMINDER_DEV_DELAY_SECS for the development trigger
//! - 1.0.0: Initial release with database, migrations and reminder settings

use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use std::env;
use std::time::Duration;

/// Zone used when REMINDER_TIMEZONE is unset
pub const DEFAULT_FALLBACK_TIMEZONE: &str = "UTC";

/// Local time of the daily reminder when REMINDER_TIME is unset
pub const DEFAULT_REMINDER_TIME: &str = "20:00";

const DEFAULT_DATABASE_PATH: &str = "finance.db";
const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
const DEFAULT_DEV_DELAY_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub migrations_dir: String,
    pub log_level: String,
    pub reminder_timezone: Tz,
    pub reminder_hour: u32,
    pub reminder_minute: u32,
    /// True when APP_ENV=development
    pub development: bool,
    pub dev_trigger_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tz_name = get("REMINDER_TIMEZONE").unwrap_or_else(|| DEFAULT_FALLBACK_TIMEZONE.to_string());
        let reminder_timezone = parse_timezone(&tz_name)?;

        let time_str = get("REMINDER_TIME").unwrap_or_else(|| DEFAULT_REMINDER_TIME.to_string());
        let (reminder_hour, reminder_minute) = parse_fire_time(&time_str)?;

        let dev_delay_secs = match get("REMINDER_DEV_DELAY_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid REMINDER_DEV_DELAY_SECS: {raw}"))?,
            None => DEFAULT_DEV_DELAY_SECS,
        };

        let development = get("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        Ok(Config {
            database_path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            migrations_dir: get("MIGRATIONS_DIR").unwrap_or_else(|| DEFAULT_MIGRATIONS_DIR.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            reminder_timezone,
            reminder_hour,
            reminder_minute,
            development,
            dev_trigger_delay: Duration::from_secs(dev_delay_secs),
        })
    }
}

/// Parse an IANA zone name such as `Asia/Jakarta`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {}", name, e))
}

/// Parse a `HH:MM` wall-clock time
pub fn parse_fire_time(value: &str) -> Result<(u32, u32)> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid reminder time '{value}': expected HH:MM"))?;
    Ok((time.hour(), time.minute()))
}
