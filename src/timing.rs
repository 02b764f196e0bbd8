//! Wall-clock and CPU timing for drivers and linear solvers.
//!
//! CPU time is process-wide, so with rayon enabled it grows faster than wall
//! time by roughly the number of busy threads.

use std::time::{Duration, Instant};

use cpu_time::ProcessTime;

/// Accumulated wall-clock and CPU time, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunTimes {
    /// Wall-clock seconds
    pub wall: f64,
    /// Process CPU seconds
    pub cpu: f64,
}

impl RunTimes {
    /// Add another measurement.
    pub fn accumulate(&mut self, other: RunTimes) {
        self.wall += other.wall;
        self.cpu += other.cpu;
    }
}

impl std::ops::Add for RunTimes {
    type Output = RunTimes;

    fn add(self, rhs: RunTimes) -> RunTimes {
        RunTimes {
            wall: self.wall + rhs.wall,
            cpu: self.cpu + rhs.cpu,
        }
    }
}

/// A running stopwatch over both clocks.
#[derive(Debug)]
pub struct RunTimer {
    wall: Instant,
    cpu: ProcessTime,
}

impl RunTimer {
    /// Start measuring.
    pub fn start() -> Self {
        Self {
            wall: Instant::now(),
            cpu: ProcessTime::now(),
        }
    }

    /// Time since `start`.
    pub fn elapsed(&self) -> RunTimes {
        RunTimes {
            wall: secs(self.wall.elapsed()),
            cpu: secs(self.cpu.elapsed()),
        }
    }
}

#[inline]
fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}
