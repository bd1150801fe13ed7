use serde::Serialize;
use std::sync::Mutex;

/// Counters shared between the scan loop and whoever reports on it.
#[derive(Debug)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub samples: u64,
    pub timeouts: u64,
    pub alerts: u64,
    pub coalesced_alerts: u64,
    pub passes: u64,
    pub aborted_passes: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_sample(&self) {
        self.update(|m| m.samples += 1);
    }

    pub fn record_timeout(&self) {
        self.update(|m| m.timeouts += 1);
    }

    pub fn record_alert(&self) {
        self.update(|m| m.alerts += 1);
    }

    pub fn record_coalesced_alert(&self) {
        self.update(|m| m.coalesced_alerts += 1);
    }

    pub fn record_pass(&self) {
        self.update(|m| m.passes += 1);
    }

    pub fn record_aborted_pass(&self) {
        self.update(|m| m.aborted_passes += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
