//! Daily transaction check
//!
//! Decides per user whether a "you haven't logged anything today" reminder is due
//! and sends it through a [`NotificationSink`].

use super::notifier::{build_reminder_message, NotificationSink};
use super::schedule::DailySchedule;
use crate::database::Database;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

/// Work performed on every firing of the reminder schedule
#[async_trait]
pub trait ReminderEvaluator: Send + Sync {
    async fn check_and_send_reminders(&self) -> Result<()>;
}

/// A user eligible for reminders (linked chat, reminders enabled)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCandidate {
    pub user_id: i64,
    pub name: String,
    pub chat_id: String,
}

/// Outcome of the check for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCheckResult {
    pub user_id: i64,
    pub logged_today: bool,
    pub already_reminded: bool,
    pub should_notify: bool,
    /// Whether the reminder actually went out
    pub sent: bool,
}

pub struct TransactionReminderService {
    database: Database,
    sink: Arc<dyn NotificationSink>,
    schedule: DailySchedule,
}

impl TransactionReminderService {
    pub fn new(database: Database, sink: Arc<dyn NotificationSink>, schedule: DailySchedule) -> Self {
        TransactionReminderService {
            database,
            sink,
            schedule,
        }
    }

    /// Run the check as of `now`. Store errors abort the run; a failed send only
    /// affects that user.
    pub async fn evaluate_at(&self, now: DateTime<Utc>) -> Result<Vec<ReminderCheckResult>> {
        let (day_start, day_end) = self.schedule.local_day_bounds(now);
        let local_date = self.schedule.local_date(now).to_string();

        let candidates = self.database.reminder_candidates().await?;
        debug!(
            "Checking {} user(s) for transactions on {local_date}",
            candidates.len()
        );

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let logged = self
                .database
                .count_transactions_between(
                    candidate.user_id,
                    day_start.timestamp(),
                    day_end.timestamp(),
                )
                .await?;
            let logged_today = logged > 0;
            let already_reminded = self
                .database
                .reminder_sent_on(candidate.user_id, &local_date)
                .await?;
            let should_notify = !logged_today && !already_reminded;

            let mut sent = false;
            if should_notify {
                let text = build_reminder_message(&candidate.name);
                match self.sink.send(&candidate.chat_id, &text).await {
                    Ok(()) => {
                        self.database
                            .record_reminder_sent(candidate.user_id, &local_date, now.timestamp())
                            .await?;
                        sent = true;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to send reminder to user {} (chat {}): {e:#}",
                            candidate.user_id, candidate.chat_id
                        );
                    }
                }
            }

            results.push(ReminderCheckResult {
                user_id: candidate.user_id,
                logged_today,
                already_reminded,
                should_notify,
                sent,
            });
        }

        let due = results.iter().filter(|r| r.should_notify).count();
        let sent = results.iter().filter(|r| r.sent).count();
        info!(
            "Reminder check for {local_date}: {} user(s) checked, {due} due, {sent} sent",
            results.len()
        );

        Ok(results)
    }
}

#[async_trait]
impl ReminderEvaluator for TransactionReminderService {
    async fn check_and_send_reminders(&self) -> Result<()> {
        self.evaluate_at(Utc::now()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::migrations::MigrationRunner;
    use tokio::sync::Mutex;

    /// Records deliveries; fails for chats listed in `failing`
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
            if self.failing.iter().any(|c| c == chat_id) {
                anyhow::bail!("chat {chat_id} unreachable");
            }
            self.sent
                .lock()
                .await
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    async fn migrated_db() -> Database {
        let db = Database::in_memory().unwrap();
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");
        MigrationRunner::new(db.clone(), dir)
            .apply_pending()
            .await
            .unwrap();
        db
    }

    fn service(db: &Database, sink: Arc<RecordingSink>) -> TransactionReminderService {
        let schedule = DailySchedule::new(20, 0, chrono_tz::Asia::Jakarta).unwrap();
        TransactionReminderService::new(db.clone(), sink, schedule)
    }

    #[tokio::test]
    async fn test_reminds_only_users_without_transactions() {
        let db = migrated_db().await;
        let idle = db.add_user("Dana", Some("chat-dana")).await.unwrap();
        let busy = db.add_user("Rio", Some("chat-rio")).await.unwrap();
        let _unlinked = db.add_user("Sam", None).await.unwrap();

        // 2024-05-01 10:00 local Jakarta
        db.add_transaction(busy, 1250, "expense", Some("food"), utc("2024-05-01T03:00:00Z").timestamp())
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let svc = service(&db, sink.clone());

        // 20:00 local
        let results = svc.evaluate_at(utc("2024-05-01T13:00:00Z")).await.unwrap();
        assert_eq!(results.len(), 2);

        let idle_result = results.iter().find(|r| r.user_id == idle).unwrap();
        assert!(!idle_result.logged_today);
        assert!(idle_result.should_notify);
        assert!(idle_result.sent);

        let busy_result = results.iter().find(|r| r.user_id == busy).unwrap();
        assert!(busy_result.logged_today);
        assert!(!busy_result.should_notify);

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chat-dana");
        assert!(sent[0].1.contains("Dana"));
    }

    #[tokio::test]
    async fn test_transaction_from_previous_local_day_does_not_count() {
        let db = migrated_db().await;
        let user = db.add_user("Dana", Some("chat-dana")).await.unwrap();
        // 2024-04-30 23:30 local Jakarta, same UTC date as the check
        db.add_transaction(user, 500, "expense", None, utc("2024-04-30T16:30:00Z").timestamp())
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let results = service(&db, sink.clone())
            .evaluate_at(utc("2024-05-01T13:00:00Z"))
            .await
            .unwrap();
        assert!(!results[0].logged_today);
        assert!(results[0].sent);
    }

    #[tokio::test]
    async fn test_second_run_same_day_does_not_resend() {
        let db = migrated_db().await;
        db.add_user("Dana", Some("chat-dana")).await.unwrap();

        let sink = Arc::new(RecordingSink::default());
        let svc = service(&db, sink.clone());

        svc.evaluate_at(utc("2024-05-01T13:00:00Z")).await.unwrap();
        let results = svc.evaluate_at(utc("2024-05-01T14:00:00Z")).await.unwrap();
        assert!(results[0].already_reminded);
        assert!(!results[0].should_notify);
        assert_eq!(sink.sent.lock().await.len(), 1);

        // Next local day reminds again
        svc.evaluate_at(utc("2024-05-02T13:00:00Z")).await.unwrap();
        assert_eq!(sink.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_other_users() {
        let db = migrated_db().await;
        let broken = db.add_user("Ana", Some("chat-broken")).await.unwrap();
        let ok = db.add_user("Budi", Some("chat-ok")).await.unwrap();

        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
            failing: vec!["chat-broken".to_string()],
        });
        let svc = service(&db, sink.clone());

        let results = svc.evaluate_at(utc("2024-05-01T13:00:00Z")).await.unwrap();
        let broken_result = results.iter().find(|r| r.user_id == broken).unwrap();
        assert!(broken_result.should_notify);
        assert!(!broken_result.sent);
        assert!(results.iter().find(|r| r.user_id == ok).unwrap().sent);

        // Unsent reminder is retried on the next run the same day
        assert!(!db.reminder_sent_on(broken, "2024-05-01").await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_users_are_skipped() {
        let db = migrated_db().await;
        let user = db.add_user("Dana", Some("chat-dana")).await.unwrap();
        db.set_reminders_enabled(user, false).await.unwrap();

        let sink = Arc::new(RecordingSink::default());
        let results = service(&db, sink.clone())
            .evaluate_at(utc("2024-05-01T13:00:00Z"))
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        // No migrations applied: the users table does not exist
        let db = Database::in_memory().unwrap();
        let sink = Arc::new(RecordingSink::default());
        assert!(service(&db, sink).check_and_send_reminders().await.is_err());
    }
}
