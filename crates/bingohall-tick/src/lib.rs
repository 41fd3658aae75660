//! Cancellable phase timer for Bingo Hall room actors.
//!
//! A room is always in at most one timed phase: the countdown ticks once a
//! second, the draw fires every few seconds, and the post-game settle
//! delay fires once. [`Pacer`] models exactly one such timer. Arming it
//! replaces whatever was armed before, and stopping it makes
//! [`Pacer::wait`] pend forever, so a stale tick can never fire after a
//! reset.
//!
//! # Integration
//!
//! The pacer sits inside the room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = commands.recv() => { /* handle commands */ }
//!         beat = pacer.wait() => { /* advance countdown / draw / settle */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Beat info (returned to caller each firing)
// ---------------------------------------------------------------------------

/// Information about one firing, returned by [`Pacer::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beat {
    /// Firings since the pacer was last armed (starts at 1).
    pub seq: u64,
    /// `true` if the timer woke noticeably later than scheduled.
    pub overrun: bool,
    /// Whole periods skipped because of the overrun (0 normally).
    pub skipped: u64,
    /// `true` if this was the last firing of a one-shot timer.
    pub last: bool,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters across every arming of one pacer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacerMetrics {
    pub total_beats: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    pub total_armed: u64,
}

// ---------------------------------------------------------------------------
// Pacer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Schedule {
    next: Instant,
    /// `None` for a one-shot timer.
    period: Option<Duration>,
}

/// A single re-armable timer.
#[derive(Debug)]
pub struct Pacer {
    label: &'static str,
    schedule: Option<Schedule>,
    seq: u64,
    metrics: PacerMetrics,
}

impl Pacer {
    /// Creates a stopped pacer. `label` only shows up in logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            schedule: None,
            seq: 0,
            metrics: PacerMetrics::default(),
        }
    }

    /// Arms a periodic timer: the first beat after `first_delay`, then
    /// every `period`. Replaces any schedule already armed.
    pub fn start_periodic(&mut self, period: Duration, first_delay: Duration) {
        self.arm(Schedule {
            next: Instant::now() + first_delay,
            period: Some(period),
        });
    }

    /// Arms a one-shot timer that fires once after `delay`.
    pub fn start_once(&mut self, delay: Duration) {
        self.arm(Schedule {
            next: Instant::now() + delay,
            period: None,
        });
    }

    fn arm(&mut self, schedule: Schedule) {
        self.schedule = Some(schedule);
        self.seq = 0;
        self.metrics.total_armed += 1;
        debug!(timer = self.label, period = ?schedule.period, "timer armed");
    }

    /// Disarms the timer. Idempotent.
    pub fn stop(&mut self) {
        if self.schedule.take().is_some() {
            debug!(timer = self.label, beats = self.seq, "timer stopped");
        }
    }

    /// Whether a schedule is armed.
    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    /// Waits until the next beat is due.
    ///
    /// When stopped this future pends forever, and `tokio::select!` keeps
    /// servicing its other branches. Cancel-safe: dropping the future
    /// before it resolves leaves the schedule untouched.
    pub async fn wait(&mut self) -> Beat {
        let Some(Schedule { next, period }) = self.schedule else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.seq += 1;
        self.metrics.total_beats += 1;

        let late_by = now.saturating_duration_since(next);
        let (overrun, skipped) = match period {
            Some(period) if late_by > period / 10 => {
                let skipped = (late_by.as_nanos() / period.as_nanos().max(1)) as u64;
                (true, skipped)
            }
            _ => (false, 0),
        };
        if overrun {
            self.metrics.total_overruns += 1;
            self.metrics.total_skipped += skipped;
            warn!(
                timer = self.label,
                beat = self.seq,
                skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "timer overrun, skipping ahead"
            );
        }

        // Schedule from now, not from the missed deadline.
        self.schedule = period.map(|period| Schedule {
            next: now + period,
            period: Some(period),
        });

        trace!(timer = self.label, beat = self.seq, overrun, "timer fired");

        Beat {
            seq: self.seq,
            overrun,
            skipped,
            last: period.is_none(),
        }
    }

    /// Beats since the last arming.
    pub fn beats(&self) -> u64 {
        self.seq
    }

    pub fn metrics(&self) -> &PacerMetrics {
        &self.metrics
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}
