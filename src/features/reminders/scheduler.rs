//! Daily reminder scheduler
//!
//! Owns the one recurring timer that runs the reminder check. The timer task and its
//! shutdown channel are held together, so `stop()` cancels the same timer `start()`
//! armed and a later `start()` never leaves two timers running.
//!
//! Each firing runs the evaluator on its own task: errors are logged and the timer
//! stays armed. A firing already in flight when `stop()` is called runs to completion.

use super::evaluator::ReminderEvaluator;
use super::schedule::DailySchedule;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Scheduled,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// The live timer: its task plus the channel that tells it to exit
struct ArmedTimer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct ReminderScheduler {
    evaluator: Arc<dyn ReminderEvaluator>,
    schedule: DailySchedule,
    dev_trigger_delay: Option<Duration>,
    armed: Mutex<Option<ArmedTimer>>,
}

impl ReminderScheduler {
    pub fn new(evaluator: Arc<dyn ReminderEvaluator>, schedule: DailySchedule) -> Self {
        ReminderScheduler {
            evaluator,
            schedule,
            dev_trigger_delay: None,
            armed: Mutex::new(None),
        }
    }

    /// Also run the check once, `delay` after `start()` (development only)
    pub fn with_dev_trigger(mut self, delay: Duration) -> Self {
        self.dev_trigger_delay = Some(delay);
        self
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    pub async fn is_running(&self) -> bool {
        self.armed.lock().await.is_some()
    }

    /// Arm the daily timer. A second call while armed changes nothing.
    pub async fn start(&self) -> StartOutcome {
        let mut armed = self.armed.lock().await;
        if armed.is_some() {
            info!("Reminder scheduler already running");
            return StartOutcome::AlreadyRunning;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_timer(
            self.evaluator.clone(),
            self.schedule.clone(),
            shutdown_rx,
        ));
        *armed = Some(ArmedTimer {
            shutdown: shutdown_tx,
            task,
        });

        info!(
            "⏰ Reminder scheduler started: daily at {} {} (cron \"{}\")",
            self.schedule.fire_time().format("%H:%M"),
            self.schedule.timezone().name(),
            self.schedule.cron_expression()
        );

        if let Some(delay) = self.dev_trigger_delay {
            info!("Development mode: running reminder check once in {delay:?}");
            let evaluator = self.evaluator.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                run_check(evaluator, "development").await;
            });
        }

        StartOutcome::Scheduled
    }

    /// Cancel the daily timer. Waits for the timer task to exit, not for in-flight checks.
    pub async fn stop(&self) -> StopOutcome {
        let Some(timer) = self.armed.lock().await.take() else {
            debug!("Reminder scheduler not running");
            return StopOutcome::NotRunning;
        };

        // The receiver may already be gone if the task ended on its own
        let _ = timer.shutdown.send(());
        if let Err(e) = timer.task.await {
            error!("Reminder timer task ended abnormally: {e}");
        }

        info!("Reminder scheduler stopped");
        StopOutcome::Stopped
    }

    /// Run the check now, outside the timer. Errors go to the caller.
    pub async fn trigger_manually(&self) -> Result<()> {
        info!("Manually triggering reminder check");
        self.evaluator.check_and_send_reminders().await
    }
}

async fn run_timer(
    evaluator: Arc<dyn ReminderEvaluator>,
    schedule: DailySchedule,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        // Never pick the same slot twice if the timer wakes a little early
        let from = match last_fire {
            Some(fired) if fired > now => fired,
            _ => now,
        };
        let next = match schedule.next_fire_after(from) {
            Ok(next) => next,
            Err(e) => {
                error!("Reminder timer has no next slot, disarming: {e:#}");
                return;
            }
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!("Next reminder check at {next} (in {wait:?})");

        tokio::select! {
            _ = &mut shutdown => {
                debug!("Reminder timer cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        last_fire = Some(next);
        tokio::spawn(run_check(evaluator.clone(), "scheduled"));
    }
}

/// One firing. Failures are logged here and go no further.
async fn run_check(evaluator: Arc<dyn ReminderEvaluator>, source: &'static str) {
    info!("Running {source} reminder check");
    match evaluator.check_and_send_reminders().await {
        Ok(()) => debug!("{source} reminder check finished"),
        Err(e) => error!("{source} reminder check failed: {e:#}"),
    }
}
