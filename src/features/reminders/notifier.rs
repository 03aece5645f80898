//! Outbound reminder delivery
//!
//! The messaging transport lives outside this crate; implementations of
//! [`NotificationSink`] bridge to it.

use anyhow::Result;
use async_trait::async_trait;
use log::info;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` to the linked chat `chat_id`
    async fn send(&self, chat_id: &str, text: &str) -> Result<()>;
}

/// Writes reminders to the log instead of a messaging channel
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        info!("📨 Reminder for chat {chat_id}: {text}");
        Ok(())
    }
}

/// Reminder text for a user who has not logged anything today
pub fn build_reminder_message(name: &str) -> String {
    let greeting = if name.trim().is_empty() {
        "Hi there".to_string()
    } else {
        format!("Hi {}", name.trim())
    };
    format!(
        "{greeting}! You haven't logged any transactions today. \
         Reply with something like \"lunch 12.50\" to record one."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_reminder_message() {
        let msg = build_reminder_message("Dana");
        assert!(msg.starts_with("Hi Dana!"));
        assert!(msg.contains("haven't logged any transactions today"));
    }

    #[test]
    fn test_build_reminder_message_without_name() {
        assert!(build_reminder_message("  ").starts_with("Hi there!"));
    }

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        assert!(LogNotificationSink.send("chat-1", "hello").await.is_ok());
    }
}
