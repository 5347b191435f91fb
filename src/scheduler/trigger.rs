//! Rotation trigger
//!
//! Sleeps until the next fire of the configured [`ScheduleMode`] on the local
//! wall clock, then runs one rotation cycle. Only one cycle is ever in flight:
//! the loop is sequential and the rotation sits behind a mutex shared with
//! [`RotationTrigger::run_now`]. Fires that pass while a cycle is still
//! running are skipped, never queued.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};

use super::error::{SchedulerError, SchedulerResult};
use super::report::CycleResult;
use super::rotation::BannerRotation;
use super::schedule::ScheduleMode;
use crate::publisher::Publisher;

/// Longest single sleep; the wall clock is re-checked after each one
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Upper bound when counting overrun fires
const MAX_MISSED_COUNT: u32 = 10_000;

// ============================================================================
// Trigger Events
// ============================================================================

/// Events emitted by the trigger
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    /// Waiting for the next fire
    Armed {
        mode: ScheduleMode,
        next_fire: DateTime<Utc>,
        /// Whether that fire will publish (false for odd biweekly weeks)
        executes: bool,
    },

    /// A fire was handled (published, failed or skipped by parity)
    CycleFinished {
        fired_at: DateTime<Utc>,
        result: CycleResult,
    },

    /// Fires that elapsed while a cycle was running
    TickSkipped { missed: u32, resumed_at: DateTime<Utc> },
}

/// Count fires strictly after `fire` and no later than `until`
pub fn missed_fires<Tz: TimeZone>(
    mode: ScheduleMode,
    fire: &DateTime<Tz>,
    until: &DateTime<Tz>,
) -> u32 {
    let mut missed = 0;
    let mut cursor = fire.clone();
    while missed < MAX_MISSED_COUNT {
        match mode.next_fire_after(&cursor) {
            Some(next) if next <= *until => {
                missed += 1;
                cursor = next;
            }
            _ => break,
        }
    }
    missed
}

// ============================================================================
// Rotation Trigger
// ============================================================================

/// Drives a [`BannerRotation`] on a recurring schedule
pub struct RotationTrigger<P> {
    mode: ScheduleMode,
    rotation: Arc<Mutex<BannerRotation<P>>>,
    event_sender: broadcast::Sender<TriggerEvent>,
    is_running: Arc<RwLock<bool>>,
    stop_signal: Arc<Notify>,
}

impl<P: Publisher> RotationTrigger<P> {
    /// Create a new trigger
    pub fn new(mode: ScheduleMode, rotation: BannerRotation<P>) -> Self {
        let (event_sender, _) = broadcast::channel(100);

        Self {
            mode,
            rotation: Arc::new(Mutex::new(rotation)),
            event_sender,
            is_running: Arc::new(RwLock::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    /// Subscribe to trigger events
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.event_sender.subscribe()
    }

    /// Start the trigger loop (runs until stopped)
    pub async fn start(&self) -> SchedulerResult<()> {
        *self.is_running.write().await = true;
        tracing::info!(mode = %self.mode, "Rotation trigger started");

        let mut after = Local::now();
        while *self.is_running.read().await {
            let next_fire = self.mode.next_fire_after(&after).ok_or_else(|| {
                SchedulerError::NoUpcomingFire {
                    mode: self.mode.to_string(),
                }
            })?;
            let executes = self.mode.executes_on(next_fire.date_naive());

            tracing::info!(
                next_fire = %next_fire.to_rfc3339(),
                executes,
                "Next banner rotation armed"
            );
            let _ = self.event_sender.send(TriggerEvent::Armed {
                mode: self.mode,
                next_fire: next_fire.with_timezone(&Utc),
                executes,
            });

            if !self.wait_until(&next_fire).await {
                break;
            }

            let result = self.rotation.lock().await.run_fire(self.mode, &next_fire).await;
            let _ = self.event_sender.send(TriggerEvent::CycleFinished {
                fired_at: next_fire.with_timezone(&Utc),
                result,
            });

            let finished = Local::now();
            let missed = missed_fires(self.mode, &next_fire, &finished);
            if missed > 0 {
                tracing::warn!(missed, mode = %self.mode, "Cycle overran later fires, skipping them");
                let _ = self.event_sender.send(TriggerEvent::TickSkipped {
                    missed,
                    resumed_at: finished.with_timezone(&Utc),
                });
            }

            after = std::cmp::max(next_fire, finished);
        }

        *self.is_running.write().await = false;
        tracing::info!("Rotation trigger stopped");
        Ok(())
    }

    /// Stop the trigger loop
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        self.stop_signal.notify_one();
    }

    /// Check if trigger is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Run one cycle immediately, ignoring the schedule
    ///
    /// Waits for any cycle already in flight to finish first.
    pub async fn run_now(&self) -> CycleResult {
        let result = self.rotation.lock().await.run_cycle().await;
        let _ = self.event_sender.send(TriggerEvent::CycleFinished {
            fired_at: result.report.started_at(),
            result: result.clone(),
        });
        result
    }

    /// Schedule and catalog summary as of now
    pub async fn status(&self) -> TriggerStatus {
        let now = Local::now();
        let banners = self.rotation.lock().await.catalog().len();

        TriggerStatus {
            mode: self.mode,
            next_fire: self.mode.next_fire_after(&now),
            next_execution: self.mode.next_execution_after(&now),
            banners,
        }
    }

    // Internal: sleep until the wall clock reaches `target`; false if stopped
    async fn wait_until(&self, target: &DateTime<Local>) -> bool {
        loop {
            let remaining = match target.signed_duration_since(Local::now()).to_std() {
                Ok(d) if !d.is_zero() => d,
                _ => return true,
            };

            tokio::select! {
                _ = tokio::time::sleep(remaining.min(MAX_SLEEP)) => {}
                _ = self.stop_signal.notified() => return false,
            }

            if !*self.is_running.read().await {
                return false;
            }
        }
    }
}

/// What the trigger will do next
#[derive(Debug, Clone)]
pub struct TriggerStatus {
    pub mode: ScheduleMode,
    pub next_fire: Option<DateTime<Local>>,
    pub next_execution: Option<DateTime<Local>>,
    pub banners: usize,
}

impl TriggerStatus {
    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = String::from("Banner Rotation\n");
        output.push_str(&format!("{:-<40}\n", ""));
        output.push_str(&format!(
            "Schedule: {} ({})\n",
            self.mode,
            self.mode.description()
        ));
        output.push_str(&format!("Banners: {}\n", self.banners));

        if let Some(next) = &self.next_fire {
            output.push_str(&format!("Next Fire: {}\n", next.format("%Y-%m-%d %H:%M %Z")));
        }
        if let Some(next) = &self.next_execution {
            output.push_str(&format!(
                "Next Publish: {}\n",
                next.format("%Y-%m-%d %H:%M %Z")
            ));
        }

        output
    }
}

// ============================================================================
// Tests
// ============================================================================
