//! Virtual playback time.
//!
//! Time is counted in ticks of one sample period at the unified rate, so it
//! never drifts from the audio actually delivered and never depends on the
//! wall clock.

use std::time::Duration;

use crate::cue::Cue;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Step-driven clock over the unified sample rate.
#[derive(Debug, Clone)]
pub struct SyncClock {
    rate: u32,
    ticks: u64,
    ticks_per_step: u64,
}

impl SyncClock {
    /// A clock at `rate` Hz that moves `ticks_per_step` sample periods per
    /// [`advance`](Self::advance).
    pub fn new(rate: u32, ticks_per_step: usize) -> Self {
        Self {
            rate: rate.max(1),
            ticks: 0,
            ticks_per_step: ticks_per_step.max(1) as u64,
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Elapsed sample periods.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ticks_per_step(&self) -> u64 {
        self.ticks_per_step
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        ticks_to_duration(self.ticks, self.rate)
    }

    /// Virtual time after the next [`advance`](Self::advance).
    pub fn peek_next(&self) -> Duration {
        ticks_to_duration(self.ticks.saturating_add(self.ticks_per_step), self.rate)
    }

    /// Move forward by one step and return the new virtual time.
    pub fn advance(&mut self) -> Duration {
        self.ticks = self.ticks.saturating_add(self.ticks_per_step);
        self.now()
    }

    /// Whether `cue` is shown at `at`: `begin <= at < begin + duration`.
    pub fn is_active(cue: &Cue, at: Duration) -> bool {
        cue.begin() <= at && at < cue.effective_end()
    }

    /// Whether `cue` has stopped being shown by `at`.
    pub fn has_expired(cue: &Cue, at: Duration) -> bool {
        at >= cue.effective_end()
    }
}

/// Virtual time of sample tick `ticks` at `rate` Hz.
pub fn ticks_to_duration(ticks: u64, rate: u32) -> Duration {
    let nanos = u128::from(ticks) * NANOS_PER_SEC / u128::from(rate.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Index of the sample tick containing `at` at `rate` Hz (rounded down).
pub fn duration_to_ticks(at: Duration, rate: u32) -> u64 {
    let ticks = at.as_nanos() * u128::from(rate) / NANOS_PER_SEC;
    u64::try_from(ticks).unwrap_or(u64::MAX)
}
