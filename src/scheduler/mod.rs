//! Market-hours scheduler driving the scan loop.
//!
//! Every decision is made against one reference time zone. The loop sleeps
//! between cycles and after faults, but each sleep races the shutdown signal
//! so the process can stop cleanly at any wait point.

use crate::config::ScheduleConfig;
use crate::pipeline::Pipeline;
use crate::source::MarketDataSource;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Upper bound for the poll interval and the next-day buffer.
const MAX_STEP_MINS: i64 = 24 * 60;

// ── Trading hours ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TradingHours {
    pub tz: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub next_day_buffer: TimeDelta,
    pub poll_interval: TimeDelta,
}

impl TradingHours {
    pub fn from_config(cfg: &ScheduleConfig) -> Result<Self> {
        let tz: Tz = cfg
            .timezone
            .parse()
            .map_err(|e| anyhow!("Invalid timezone {:?}: {}", cfg.timezone, e))?;

        let open = NaiveTime::parse_from_str(&cfg.market_open, "%H:%M")
            .with_context(|| format!("Invalid market_open {:?}", cfg.market_open))?;
        let close = NaiveTime::parse_from_str(&cfg.market_close, "%H:%M")
            .with_context(|| format!("Invalid market_close {:?}", cfg.market_close))?;

        if open >= close {
            bail!("market_open {} must be before market_close {}", open, close);
        }
        if !(1..=MAX_STEP_MINS).contains(&cfg.poll_interval_mins) {
            bail!(
                "poll_interval_mins must be between 1 and {}, got {}",
                MAX_STEP_MINS,
                cfg.poll_interval_mins
            );
        }
        if !(0..=MAX_STEP_MINS).contains(&cfg.next_day_buffer_mins) {
            bail!(
                "next_day_buffer_mins must be between 0 and {}, got {}",
                MAX_STEP_MINS,
                cfg.next_day_buffer_mins
            );
        }

        let next_day_buffer = TimeDelta::try_minutes(cfg.next_day_buffer_mins)
            .context("next_day_buffer_mins out of range")?;
        let poll_interval = TimeDelta::try_minutes(cfg.poll_interval_mins)
            .context("poll_interval_mins out of range")?;

        Ok(Self {
            tz,
            open,
            close,
            next_day_buffer,
            poll_interval,
        })
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Monday to Friday, between open and close inclusive.
    pub fn is_market_open(&self, now: DateTime<Tz>) -> bool {
        let weekday = !matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let time = now.time();
        weekday && time >= self.open && time <= self.close
    }

    /// The first cycle after startup always runs so the output exists early.
    pub fn is_eligible(&self, now: DateTime<Tz>, is_first_cycle: bool) -> bool {
        is_first_cycle || self.is_market_open(now)
    }

    /// After the close: tomorrow's open plus the buffer. Otherwise the next
    /// poll, truncated to the minute.
    ///
    /// Weekends and holidays are not skipped; the loop just wakes and waits.
    pub fn next_wake(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let soon = self.next_poll(now);
        if now.time() <= self.close {
            return soon;
        }

        let Some(tomorrow) = now.date_naive().succ_opt() else {
            return soon;
        };
        let Some(local) = tomorrow
            .and_time(self.open)
            .checked_add_signed(self.next_day_buffer)
        else {
            return soon;
        };
        self.tz.from_local_datetime(&local).earliest().unwrap_or(soon)
    }

    fn next_poll(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let Some(next) = now.checked_add_signed(self.poll_interval) else {
            return now;
        };
        next.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(next)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Sleeping until the next wake time
    Waiting,
    /// Running a scan cycle
    Evaluating,
    /// Cooling down after a failed cycle
    ErrorBackoff,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::ErrorBackoff => write!(f, "error-backoff"),
        }
    }
}

type Clock = Box<dyn Fn() -> DateTime<Tz> + Send + Sync>;

pub struct Scheduler<S> {
    hours: TradingHours,
    pipeline: Pipeline<S>,
    error_backoff: Duration,
    state: SchedulerState,
    clock: Clock,
}

impl<S: MarketDataSource> Scheduler<S> {
    pub fn new(hours: TradingHours, pipeline: Pipeline<S>, cfg: &ScheduleConfig) -> Self {
        let tz = hours.tz;
        Self {
            hours,
            pipeline,
            error_backoff: Duration::from_secs(cfg.error_backoff_secs),
            state: SchedulerState::Waiting,
            clock: Box::new(move || Utc::now().with_timezone(&tz)),
        }
    }

    /// Replace the wall clock the loop reads "now" from.
    #[cfg(test)]
    fn with_clock(mut self, clock: impl Fn() -> DateTime<Tz> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!("scheduler {} → {}", self.state, next);
            self.state = next;
        }
    }

    /// Run until `shutdown` flips. A cycle interrupted by shutdown is dropped
    /// before it writes anything.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scheduler started: market hours {}-{} ({}), poll every {} min",
            self.hours.open.format("%H:%M"),
            self.hours.close.format("%H:%M"),
            self.hours.tz,
            self.hours.poll_interval.num_minutes()
        );

        let mut is_first_cycle = true;

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            self.transition(SchedulerState::Waiting);
            let now = (self.clock)();

            if self.hours.is_eligible(now, is_first_cycle) {
                is_first_cycle = false;
                self.transition(SchedulerState::Evaluating);

                let outcome = tokio::select! {
                    outcome = self.pipeline.run_cycle(now) => outcome,
                    _ = shutdown.changed() => {
                        warn!("Shutdown during scan cycle; candidate list left as it was");
                        break;
                    }
                };

                if let Err(e) = outcome {
                    self.transition(SchedulerState::ErrorBackoff);
                    error!("An error occurred: {:#}", e);
                    info!("Restarting the scan in {:?}...", self.error_backoff);
                    if !wait(&mut shutdown, self.error_backoff).await {
                        break;
                    }
                    continue;
                }
            } else {
                debug!("Market closed at {}, not scanning", now.format("%a %H:%M"));
            }

            let next = self.hours.next_wake(now);
            info!(
                "Next run will be soon after the time of {} ({})",
                next.format("%I:%M %p"),
                self.hours.tz
            );

            let pause = (next - (self.clock)()).to_std().unwrap_or(Duration::ZERO);
            if !wait(&mut shutdown, pause).await {
                break;
            }
        }

        info!("Scheduler stopped");
    }
}

/// Sleep for `pause` unless shutdown comes first. `false` means stop.
async fn wait(shutdown: &mut watch::Receiver<bool>, pause: Duration) -> bool {
    tokio::select! {
        _ = sleep(pause) => true,
        _ = shutdown.changed() => false,
    }
}
