use crate::hardware::Clock;
use crate::prelude::{ScanError, ScanResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Longest uninterrupted sleep; cancellable waits re-check the signal this often.
pub const CANCEL_SLICE: Duration = Duration::from_millis(20);

/// Cooperative shutdown flag shared by every long-running activity.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> ScanResult<()> {
        if self.is_triggered() {
            Err(ScanError::ShutdownRequested)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` in [`CANCEL_SLICE`] steps, returning early on shutdown.
    pub fn sleep(&self, clock: &dyn Clock, duration: Duration) -> ScanResult<()> {
        let deadline = clock.now() + duration;
        loop {
            self.check()?;
            let now = clock.now();
            if now >= deadline {
                return Ok(());
            }
            clock.sleep((deadline - now).min(CANCEL_SLICE));
        }
    }
}
