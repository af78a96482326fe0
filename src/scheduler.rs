//! # Refresh Scheduling
//!
//! The widget refreshes on three occasions:
//! 1. **Startup**: immediately, so the chart fills in as soon as possible
//! 2. **Deferred**: once, after `initial_load_delay`, giving a slow first
//!    fetch a second chance right after boot
//! 3. **Interval**: every `animation_speed` from start (6 minutes by default,
//!    the rate at which NOAA publishes new water levels)
//!
//! Triggers are delivered over an unbounded channel. Firing never waits on
//! an outstanding fetch: if the previous request has not answered yet, a new
//! one is issued anyway.

use crate::config::RefreshConfig;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Why a refresh was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Deferred,
    Interval,
}

/// Owns the refresh timing for one widget.
#[derive(Clone, Debug)]
pub struct RefreshScheduler {
    initial_load_delay: Duration,
    update_interval: Duration,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(refresh: &RefreshConfig) -> Self {
        RefreshScheduler {
            initial_load_delay: refresh.initial_load_delay(),
            update_interval: refresh.update_interval(),
            // tokio intervals panic on a zero period
            period: refresh.animation_speed().max(Duration::from_millis(1)),
        }
    }

    /// Send the startup trigger and arm the deferred and repeating timers.
    pub fn start(&self, triggers: UnboundedSender<Trigger>) -> SchedulerHandle {
        let _ = triggers.send(Trigger::Startup);

        let deferred = self.schedule_update(Some(self.initial_load_delay), triggers.clone());
        let repeating = self.schedule_repeating(triggers);

        SchedulerHandle {
            deferred,
            repeating,
        }
    }

    /// Fire a single [`Trigger::Deferred`] after `delay`, or after the
    /// configured update interval when no delay is given.
    pub fn schedule_update(
        &self,
        delay: Option<Duration>,
        triggers: UnboundedSender<Trigger>,
    ) -> JoinHandle<()> {
        let delay = delay.unwrap_or(self.update_interval);
        tokio::spawn(async move {
            time::sleep(delay).await;
            debug!(?delay, "deferred refresh");
            let _ = triggers.send(Trigger::Deferred);
        })
    }

    fn schedule_repeating(&self, triggers: UnboundedSender<Trigger>) -> JoinHandle<()> {
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if triggers.send(Trigger::Interval).is_err() {
                    break;
                }
            }
        })
    }
}

/// Running timers of a started scheduler.
///
/// Dropping the handle stops the timers as well.
#[derive(Debug)]
pub struct SchedulerHandle {
    deferred: JoinHandle<()>,
    repeating: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancel both the deferred and the repeating trigger.
    pub fn stop(&self) {
        self.deferred.abort();
        self.repeating.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
