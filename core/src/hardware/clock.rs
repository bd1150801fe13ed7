use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used for every timed wait in the pipeline.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`]; a zero sleep spins once.
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

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            std::hint::spin_loop();
        } else {
            thread::sleep(duration);
        }
    }
}

/// Simulated clock: time only moves when someone sleeps or calls [`VirtualClock::advance`].
///
/// Every sleep advances time by at least one microsecond so polling loops
/// always make progress.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Mutex<Duration>,
}

pub const VIRTUAL_TICK: Duration = Duration::from_micros(1);

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.max(VIRTUAL_TICK));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_moves_only_on_sleep() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.sleep(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(5));
        clock.sleep(Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(5) + VIRTUAL_TICK);
    }
}
