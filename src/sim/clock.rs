//! Fixed-rate tick scheduling
//!
//! Wall-clock time is accumulated and converted into whole ticks. The number of
//! ticks released per advance is capped; time beyond the cap is dropped rather
//! than replayed later.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameClock {
    period: Duration,
    accumulator: Duration,
    max_catch_up: u32,
    paused: bool,
    stopped: bool,
    ticks: u64,
}

impl GameClock {
    pub fn new(tick_rate_hz: u32, max_catch_up: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / tick_rate_hz.max(1),
            accumulator: Duration::ZERO,
            max_catch_up: max_catch_up.max(1),
            paused: false,
            stopped: false,
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks released since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Feed elapsed wall time; returns how many ticks are due now
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.paused || self.stopped {
            return 0;
        }
        self.accumulator += elapsed;

        let mut due = 0;
        while self.accumulator >= self.period && due < self.max_catch_up {
            self.accumulator -= self.period;
            due += 1;
        }
        if due == self.max_catch_up && self.accumulator >= self.period {
            log::trace!("Clock dropping {:?} of backlog", self.accumulator);
            self.accumulator = Duration::ZERO;
        }
        self.ticks += due as u64;
        due
    }

    /// Suspend scheduling; elapsed time while paused is ignored
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.accumulator = Duration::ZERO;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop for good (level over)
    pub fn stop(&mut self) {
        self.stopped = true;
        self.accumulator = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }
}
