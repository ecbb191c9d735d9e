//! Wall-clock driven 60Hz countdown register.
//!
//! The timer is never decremented by a background task. It remembers the value it was given
//! and the clock mark of that moment, and works out how many ticks have elapsed whenever it
//! is read.
use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of a single 60Hz tick
pub const TICK: Duration = Duration::from_nanos(16_666_667);

/// Source of monotonic time marks
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary, fixed origin
    fn now(&self) -> Duration;
}

/// `Clock` backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// `Clock` that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// Delay timer
#[derive(Clone)]
pub struct Timer {
    clock: Arc<dyn Clock>,
    ticks: u8,
    mark: Duration,
}

impl Timer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mark = clock.now();
        Self {
            clock,
            ticks: 0,
            mark,
        }
    }

    /// Set the timer to `ticks` starting from now
    pub fn store(&mut self, ticks: u8) {
        self.ticks = ticks;
        self.mark = self.clock.now();
    }

    /// Current value of the timer
    ///
    /// Whole ticks elapsed since the last mark are consumed and the mark moves forward by
    /// exactly that many ticks, so partial ticks are never lost between reads.
    pub fn load(&mut self) -> u8 {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.mark);
        let consumed = elapsed.as_nanos() / TICK.as_nanos();
        if consumed >= self.ticks as u128 {
            self.ticks = 0;
            self.mark = now;
        } else {
            self.ticks -= consumed as u8;
            self.mark += TICK * consumed as u32;
        }
        self.ticks
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("ticks", &self.ticks)
            .field("mark", &self.mark)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn counts_down_at_60hz() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = Timer::new(clock.clone());

        timer.store(10);
        assert_eq!(timer.load(), 10);
        clock.advance(ms(10));
        assert_eq!(timer.load(), 10);
        clock.advance(ms(10));
        assert_eq!(timer.load(), 9);
        clock.advance(ms(10));
        assert_eq!(timer.load(), 9);
        clock.advance(ms(50));
        assert_eq!(timer.load(), 6);
        clock.advance(ms(87));
        assert_eq!(timer.load(), 0);
        clock.advance(ms(100));
        assert_eq!(timer.load(), 0);
    }

    #[test]
    fn repeated_reads_are_stable() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = Timer::new(clock.clone());
        timer.store(3);
        clock.advance(ms(20));
        let first = timer.load();
        assert_eq!(first, 2);
        assert_eq!(timer.load(), first);
        assert_eq!(timer.load(), first);
    }

    #[test]
    fn store_restarts_countdown() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = Timer::new(clock.clone());
        timer.store(1);
        clock.advance(ms(100));
        assert_eq!(timer.load(), 0);
        timer.store(2);
        assert_eq!(timer.load(), 2);
        clock.advance(ms(17));
        assert_eq!(timer.load(), 1);
    }

    #[test]
    fn starts_expired() {
        let mut timer = Timer::new(Arc::new(ManualClock::new()));
        assert_eq!(timer.load(), 0);
    }

    #[test]
    fn monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
