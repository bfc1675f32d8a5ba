//! Time-gated update scheduling.
//!
//! Each inbound queue request asks the scheduler whether the population is due to advance.
//! Policy: one simulated step per elapsed interval since the stored cursor, capped at
//! `max_passes_per_request`; nothing runs until a full interval has elapsed, and the cursor
//! only moves when passes actually run.

use chrono::{DateTime, Duration, Utc};

/// What a request should do before serving the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerDecision {
    /// No cursor yet: record `now` and run nothing.
    Bootstrap,
    /// Less than one interval since the cursor.
    Idle { elapsed_minutes: i64 },
    /// Run `passes` passes, then move the cursor to `now`.
    Advance { passes: u32, updates_needed: i64 },
}

#[derive(Clone, Copy, Debug)]
pub struct UpdateScheduler {
    interval: Duration,
    max_passes: u32,
}

impl UpdateScheduler {
    /// `interval` must be at least one minute and `max_passes` at least one; `CoreConfig`
    /// enforces both.
    pub fn new(interval: Duration, max_passes: u32) -> Self {
        Self {
            interval,
            max_passes: max_passes.max(1),
        }
    }

    pub fn plan(&self, cursor: Option<DateTime<Utc>>, now: DateTime<Utc>) -> SchedulerDecision {
        let Some(last_update) = cursor else {
            return SchedulerDecision::Bootstrap;
        };

        let mut elapsed_minutes = (now - last_update).num_minutes();
        if elapsed_minutes < 0 {
            tracing::warn!(
                "last update {} is after now {}; treating as no time elapsed",
                last_update,
                now
            );
            elapsed_minutes = 0;
        }

        let updates_needed = elapsed_minutes / self.interval.num_minutes().max(1);
        if updates_needed == 0 {
            return SchedulerDecision::Idle { elapsed_minutes };
        }

        let passes = u32::try_from(updates_needed)
            .unwrap_or(u32::MAX)
            .min(self.max_passes);
        SchedulerDecision::Advance {
            passes,
            updates_needed,
        }
    }
}
