use crate::prelude::ScanConfig;
use crate::processing::sample::ScanPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which alert output a stage drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    Primary,
    Secondary,
}

/// Set `channel` to `active` and hold that level for `hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStage {
    pub channel: AlertChannel,
    pub active: bool,
    pub hold: Duration,
}

/// Hold times of the four alert stages, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertTimings {
    pub primary_on_ms: u64,
    pub primary_off_ms: u64,
    pub secondary_on_ms: u64,
    pub secondary_off_ms: u64,
}

impl Default for AlertTimings {
    fn default() -> Self {
        Self {
            primary_on_ms: 2_000,
            primary_off_ms: 2_000,
            secondary_on_ms: 1_000,
            secondary_off_ms: 1_000,
        }
    }
}

impl AlertTimings {
    pub fn stages(&self) -> Vec<AlertStage> {
        let stage = |channel, active, ms| AlertStage {
            channel,
            active,
            hold: Duration::from_millis(ms),
        };
        vec![
            stage(AlertChannel::Primary, true, self.primary_on_ms),
            stage(AlertChannel::Primary, false, self.primary_off_ms),
            stage(AlertChannel::Secondary, true, self.secondary_on_ms),
            stage(AlertChannel::Secondary, false, self.secondary_off_ms),
        ]
    }
}

/// Timed alert sequence requested for one close reading.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertAction {
    pub trigger: ScanPoint,
    pub stages: Vec<AlertStage>,
}

impl AlertAction {
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.hold).sum()
    }
}

/// Threshold classifier for incoming scan points.
#[derive(Debug, Clone)]
pub struct DetectionPolicy {
    near_threshold_cm: f32,
    timings: AlertTimings,
}

pub const DEFAULT_NEAR_THRESHOLD_CM: f32 = 10.0;

impl DetectionPolicy {
    pub fn new(near_threshold_cm: f32, timings: AlertTimings) -> Self {
        Self {
            near_threshold_cm,
            timings,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.near_threshold_cm, config.alert_timings)
    }

    pub fn near_threshold_cm(&self) -> f32 {
        self.near_threshold_cm
    }

    /// Requests an alert when the point is known and at or inside the threshold.
    pub fn evaluate(&self, sample: &ScanPoint) -> Option<AlertAction> {
        let cm = sample.distance.known()?;
        if cm > self.near_threshold_cm {
            return None;
        }
        Some(AlertAction {
            trigger: *sample,
            stages: self.timings.stages(),
        })
    }
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_NEAR_THRESHOLD_CM, AlertTimings::default())
    }
}
