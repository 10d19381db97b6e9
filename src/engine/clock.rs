//! Clock sources for the software engine

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock, optionally running faster than realtime
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    speed: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_speed(1.0)
    }

    /// Clock that advances `speed` seconds per real second
    pub fn with_speed(speed: f64) -> Self {
        Self {
            origin: Instant::now(),
            speed,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * self.speed
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.time.set(secs);
    }

    pub fn advance(&self, secs: f64) {
        self.time.set(self.time.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}
