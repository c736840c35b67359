// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Lightwatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Poll, detect a state change, persist it and alert.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertFormatter;
use crate::config::{MIN_POLL_INTERVAL, MonitorConfig};
use crate::db::StateStore;
use crate::error::MonitorResult;
use crate::notifications::Notifier;
use crate::status::StatusSource;

/// Source of "now", swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    /// Delay doubles after each failure, capped at `max_delay`
    Exponential { max_delay: Duration },
}

/// How a failing tick is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries forever
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(2),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// No delay between attempts, unbounded.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    #[must_use]
    pub fn from_settings(config: &MonitorConfig) -> Self {
        Self {
            max_attempts: config.schedule.max_attempts,
            delay: Duration::from_secs(config.schedule.retry_delay_secs),
            backoff: Backoff::Fixed,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        match self.backoff {
            Backoff::Fixed => current,
            Backoff::Exponential { max_delay } => (current * 2).min(max_delay),
        }
    }

    /// Run `op` until it succeeds, fails permanently or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> MonitorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MonitorResult<T>>,
    {
        let mut attempts: u32 = 0;
        let mut delay = self.delay;

        loop {
            attempts = attempts.saturating_add(1);
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if self.max_attempts.is_some_and(|max| attempts >= max) => {
                    error!(attempts, error = %e, "Check failed, giving up");
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "Check failed. Retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                }
            }
        }
    }
}

/// Timing and presentation knobs of the monitor.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub timezone: Tz,
    pub quiet_start_hour: u32,
    pub quiet_end_hour: u32,
    pub formatter: AlertFormatter,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            cooldown: Duration::from_secs(600),
            timezone: chrono_tz::Europe::Kyiv,
            quiet_start_hour: 23,
            quiet_end_hour: 9,
            formatter: AlertFormatter::default(),
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        Ok(Self {
            poll_interval: config.schedule.poll_interval()?,
            cooldown: config.schedule.cooldown(),
            timezone: config.alerts.tz()?,
            quiet_start_hour: config.alerts.quiet_start_hour,
            quiet_end_hour: config.alerts.quiet_end_hour,
            formatter: AlertFormatter::new(config.alerts.language),
        })
    }
}

/// `[start, end)` in local hours; `start > end` wraps past midnight.
#[must_use]
pub fn is_quiet_hour(hour: u32, start: u32, end: u32) -> bool {
    if start == end {
        false
    } else if start < end {
        (start..end).contains(&hour)
    } else {
        hour >= start || hour < end
    }
}

/// What a single tick observed and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Store was empty; first row written, nobody notified
    Bootstrapped { online: bool },
    Unchanged { online: bool },
    Restored { elapsed_secs: i64, silent: bool },
    Lost { elapsed_secs: i64, silent: bool },
}

pub struct Monitor {
    source: Arc<dyn StatusSource>,
    store: Arc<StateStore>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorSettings,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<StateStore>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            settings,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn is_quiet(&self, now: DateTime<Utc>) -> bool {
        let hour = now.with_timezone(&self.settings.timezone).hour();
        is_quiet_hour(
            hour,
            self.settings.quiet_start_hour,
            self.settings.quiet_end_hour,
        )
    }

    /// One detection pass without retry or cool-down.
    pub async fn tick(&self) -> MonitorResult<TickOutcome> {
        debug!(source = self.source.name(), "Checking device status");
        let online = self.source.is_online().await?;
        let now = self.clock.now();
        let ts = now.timestamp();

        let Some(last) = self.store.get_last()? else {
            self.store.insert(ts, online)?;
            info!(online, "State store initialized");
            return Ok(TickOutcome::Bootstrapped { online });
        };

        if last.online == online {
            debug!(online, "No change");
            return Ok(TickOutcome::Unchanged { online });
        }

        self.store.insert(ts, online)?;

        let elapsed_secs = (ts - last.timestamp).max(0);
        let silent = self.is_quiet(now);
        let formatter = &self.settings.formatter;

        // Anything not online counts as lost
        let (outcome, message) = if online {
            (
                TickOutcome::Restored {
                    elapsed_secs,
                    silent,
                },
                formatter.restored(elapsed_secs),
            )
        } else {
            (
                TickOutcome::Lost {
                    elapsed_secs,
                    silent,
                },
                formatter.lost(elapsed_secs),
            )
        };

        info!(online, elapsed_secs, silent, "Power state changed");

        // The row is already written, so a retried tick would see no change
        if let Err(e) = self.notifier.send_text(&message, silent).await {
            error!(error = %e, "Failed to send alert");
        }

        Ok(outcome)
    }

    /// `tick` under the retry policy, then the cool-down after a restore.
    pub async fn run_once(&self) -> MonitorResult<TickOutcome> {
        let outcome = self.retry.run(|| self.tick()).await?;

        if matches!(outcome, TickOutcome::Restored { .. }) && !self.settings.cooldown.is_zero() {
            info!(
                cooldown_secs = self.settings.cooldown.as_secs(),
                "Power restored, pausing checks"
            );
            tokio::time::sleep(self.settings.cooldown).await;
        }

        Ok(outcome)
    }

    /// Poll forever. The first check runs immediately.
    pub async fn run(&self) {
        let period = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            source = self.source.name(),
            interval_secs = period.as_secs_f64(),
            "Monitor started"
        );

        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Status check failed");
            }
        }
    }
}

/// Resolve once `signal` reports a shutdown request.
///
/// If the signal handler cannot be installed this never resolves, so the
/// monitor keeps polling instead of exiting.
pub async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
