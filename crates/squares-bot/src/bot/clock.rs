use core::cell::Cell;
use core::time::Duration;
use std::time::Instant;

/// Monotonic time source consulted by the search loop.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that advances by `tick` on every read, so a search
/// loop bounded by it runs a fixed number of iterations.
#[derive(Debug, Clone)]
pub struct TickClock {
    tick: Duration,
    ticks: Cell<u64>,
}

impl TickClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            ticks: Cell::new(0),
        }
    }

    pub fn reads(&self) -> u64 {
        self.ticks.get()
    }
}

impl Clock for TickClock {
    fn now(&self) -> Duration {
        let ticks = self.ticks.get();
        self.ticks.set(ticks + 1);
        self.tick.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, SystemClock, TickClock};
    use core::time::Duration;

    #[test]
    fn tick_clock_advances_on_every_read() {
        let clock = TickClock::new(Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::from_millis(4));
        assert_eq!(clock.reads(), 3);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
