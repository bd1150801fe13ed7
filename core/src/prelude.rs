use crate::processing::detection::AlertTimings;
use crate::render::RenderConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where a new sweep pass starts once the previous one reached its end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SweepDirection {
    /// Every pass runs 0° → 180°.
    #[default]
    Restart,
    /// Passes alternate between 0° → 180° and 180° → 0°.
    Alternate,
}

/// How an alert sequence is executed relative to the sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// The sweep thread plays the whole sequence before stepping on.
    Blocking,
    /// A separate worker plays the sequence while the sweep keeps stepping.
    #[default]
    Deferred,
}

/// Digital line numbers (BCM numbering) assigned to each collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LineAssignment {
    pub mount: u8,
    pub trigger: u8,
    pub echo: u8,
    pub primary_alert: u8,
    pub secondary_alert: u8,
    pub motors: [u8; 4],
}

impl Default for LineAssignment {
    fn default() -> Self {
        Self {
            mount: 23,
            trigger: 12,
            echo: 6,
            primary_alert: 25,
            secondary_alert: 5,
            motors: [26, 20, 17, 18],
        }
    }
}

impl LineAssignment {
    fn all(&self) -> Vec<u8> {
        let mut lines = vec![
            self.mount,
            self.trigger,
            self.echo,
            self.primary_alert,
            self.secondary_alert,
        ];
        lines.extend_from_slice(&self.motors);
        lines
    }
}

/// Shared configuration for the scanning pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub step_degrees: u16,
    pub settle_ms: u64,
    pub trigger_pulse_us: u64,
    pub echo_timeout_ms: u64,
    pub poll_interval_us: u64,
    pub near_threshold_cm: f32,
    pub history_capacity: usize,
    pub sweep_direction: SweepDirection,
    pub alert_mode: AlertMode,
    pub alert_timings: AlertTimings,
    pub render_interval_ms: u64,
    pub retry_backoff_ms: u64,
    pub max_passes: Option<u64>,
    pub lines: LineAssignment,
    pub render: RenderConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step_degrees: 10,
            settle_ms: 50,
            trigger_pulse_us: 10,
            echo_timeout_ms: 38,
            poll_interval_us: 0,
            near_threshold_cm: 10.0,
            history_capacity: 50,
            sweep_direction: SweepDirection::Restart,
            alert_mode: AlertMode::Deferred,
            alert_timings: AlertTimings::default(),
            render_interval_ms: 100,
            retry_backoff_ms: 500,
            max_passes: None,
            lines: LineAssignment::default(),
            render: RenderConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> ScanResult<()> {
        if self.step_degrees == 0 || self.step_degrees > 180 {
            return Err(ScanError::InvalidConfig(format!(
                "step_degrees must be within 1..=180, got {}",
                self.step_degrees
            )));
        }
        if self.history_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.echo_timeout_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "echo_timeout_ms must be positive".into(),
            ));
        }
        if !self.near_threshold_cm.is_finite() || self.near_threshold_cm < 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "near_threshold_cm must be a non-negative number, got {}",
                self.near_threshold_cm
            )));
        }

        let mut lines = self.lines.all();
        lines.sort_unstable();
        if let Some(pair) = lines.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ScanError::InvalidConfig(format!(
                "line {} is assigned to more than one collaborator",
                pair[0]
            )));
        }
        Ok(())
    }
}

/// Echo signal edge the range sensor waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    Rising,
    Falling,
}

impl fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoEdge::Rising => f.write_str("rising"),
            EchoEdge::Falling => f.write_str("falling"),
        }
    }
}

/// Common error type for the scanning pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("sensor timeout: no {edge} echo edge within {waited:?}")]
    SensorTimeout { edge: EchoEdge, waited: Duration },
    #[error("actuator unavailable: {0}")]
    ActuatorUnavailable(String),
    #[error("shutdown requested")]
    ShutdownRequested,
    #[error("line {line} already claimed by {owner}")]
    LineConflict { line: u8, owner: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unrecognized operator input {0:?}")]
    UnrecognizedInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
