//! Seams to the physical collaborators of the scanner.
//!
//! Pin-level drivers live outside this crate; the pipeline only talks to these
//! traits. [`sim`] provides host-side implementations driven by a synthetic
//! scene.

pub mod clock;
pub mod lines;
pub mod sim;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use lines::{LineClaim, LineRegistry};

use crate::processing::sample::Angle;
use crate::prelude::ScanResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Positions the single-axis sensor mount.
pub trait MountActuator: Send + Sync {
    fn set_mount_angle(&self, angle: Angle) -> ScanResult<()>;
}

/// Rotation direction of one drive motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorDirection {
    Forward,
    Backward,
}

/// Two-motor differential drive.
pub trait MotorDriver: Send + Sync {
    fn drive_motors(&self, left: MotorDirection, right: MotorDirection) -> ScanResult<()>;
    fn stop_motors(&self) -> ScanResult<()>;
}

/// Primary (laser) and secondary (buzzer) alert outputs.
pub trait AlertOutput: Send + Sync {
    fn set_primary_alert(&self, on: bool);
    fn set_secondary_alert(&self, on: bool);
}

/// Output line that fires the ranging burst.
pub trait TriggerLine: Send {
    fn set_level(&mut self, high: bool);
}

/// Input line carrying the echo pulse.
pub trait EchoLine: Send {
    fn is_high(&mut self) -> bool;
}

/// Everything the scan loop needs from the outside world.
pub struct ScanHardware {
    pub mount: Arc<dyn MountActuator>,
    pub trigger: Box<dyn TriggerLine>,
    pub echo: Box<dyn EchoLine>,
    pub alerts: Arc<dyn AlertOutput>,
    pub clock: Arc<dyn Clock>,
}
