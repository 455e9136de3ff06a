//! Time bookkeeping for stateful blocks.
//!
//! Every block that integrates, differentiates or limits a rate remembers the
//! last time it was evaluated. The first evaluation has no predecessor and
//! contributes `dt = 0`; time that moves backwards (a rejected solver step
//! being retried) also yields `dt = 0` and does not rewind the stored time.

/// Last evaluation time of a stateful block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LastTime {
    /// Never evaluated since construction or reset.
    #[default]
    Uninitialized,
    At(f64),
}

impl LastTime {
    pub fn is_uninitialized(self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    /// Elapsed time from the last evaluation to `t`, never negative.
    pub fn dt_to(self, t: f64) -> f64 {
        match self {
            Self::Uninitialized => 0.0,
            // f64::max discards a NaN operand.
            Self::At(last) => (t - last).max(0.0),
        }
    }

    /// Record an evaluation at `t`. The stored time never decreases.
    pub fn advance(self, t: f64) -> Self {
        if !t.is_finite() {
            return self;
        }
        match self {
            Self::Uninitialized => Self::At(t),
            Self::At(last) => Self::At(last.max(t)),
        }
    }
}

/// Sample clock for a sample-and-hold block.
///
/// A non-positive period samples on every evaluation. Otherwise the first
/// evaluation samples and later samples fall on a grid of `period` anchored
/// at that first time.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleClock {
    period: f64,
    next_sample_time: Option<f64>,
}

impl SampleClock {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            next_sample_time: None,
        }
    }

    /// Check if a sample is due at `t`.
    pub fn should_sample(&self, t: f64) -> bool {
        if !(self.period > 0.0) {
            return true;
        }
        match self.next_sample_time {
            None => true,
            Some(next) => t >= next,
        }
    }

    /// Take a sample at `t` if one is due. Returns `true` if sampled.
    pub fn tick(&mut self, t: f64) -> bool {
        if !self.should_sample(t) {
            return false;
        }
        if self.period > 0.0 && t.is_finite() {
            let mut next = self.next_sample_time.unwrap_or(t);
            if next <= t {
                next += ((t - next) / self.period).floor() * self.period + self.period;
            }
            if next <= t {
                next += self.period;
            }
            self.next_sample_time = Some(next);
        }
        true
    }

    pub fn reset(&mut self) {
        self.next_sample_time = None;
    }

    /// Time of the next scheduled sample, if the clock has started.
    pub fn next_sample_time(&self) -> Option<f64> {
        self.next_sample_time
    }
}
