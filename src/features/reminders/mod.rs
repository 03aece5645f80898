//! # Feature: Daily Transaction Reminders
//!
//! Once a day at a fixed local time, reminds every linked user who has not logged
//! a transaction that day. Can also be triggered on demand.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.2.0: Scheduler owns its timer handle; stop() cancels the timer it armed
//! - 1.1.0: reminder_log prevents a second reminder on the same local day
//! - 1.0.0: Initial release with daily timer, manual trigger and development trigger

pub mod evaluator;
pub mod notifier;
pub mod schedule;
pub mod scheduler;

pub use evaluator::{ReminderCandidate, ReminderCheckResult, ReminderEvaluator, TransactionReminderService};
pub use notifier::{build_reminder_message, LogNotificationSink, NotificationSink};
pub use schedule::DailySchedule;
pub use scheduler::{ReminderScheduler, StartOutcome, StopOutcome};
