use crate::math::StatsHelper;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Half the speed of sound in cm/s; the echo covers the distance twice.
pub const HALF_SPEED_OF_SOUND_CM_PER_S: f32 = 17_150.0;

/// Commanded mount angle in whole degrees, always within `0..=180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "u16")]
pub struct Angle(u16);

impl Angle {
    pub const MIN: Angle = Angle(0);
    pub const MAX: Angle = Angle(180);

    /// Builds an angle, clamping out-of-range values to the arc limits.
    pub fn new(degrees: i32) -> Self {
        Angle(degrees.clamp(0, 180) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32
    }

    /// Every angle of one pass from `0` up to `180` spaced `step` apart.
    pub fn sweep(step: u16) -> Vec<Angle> {
        let step = usize::from(step.max(1));
        (0..=180u16).step_by(step).map(Angle).collect()
    }
}

impl From<i32> for Angle {
    fn from(degrees: i32) -> Self {
        Angle::new(degrees)
    }
}

impl From<Angle> for u16 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// One range reading, or the sentinel left behind when no echo came back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Known(f32),
    Unknown,
}

impl Distance {
    /// Known distance in centimeters, rounded to two decimals. Negative values
    /// clamp to zero and non-finite values become `Unknown`.
    pub fn from_cm(cm: f32) -> Self {
        if !cm.is_finite() {
            return Distance::Unknown;
        }
        Distance::Known(StatsHelper::round_to(cm.max(0.0), 2))
    }

    /// Converts an echo pulse width into the distance to the reflecting surface.
    pub fn from_pulse_width(width: Duration) -> Self {
        Distance::from_cm(width.as_secs_f32() * HALF_SPEED_OF_SOUND_CM_PER_S)
    }

    pub fn known(self) -> Option<f32> {
        match self {
            Distance::Known(cm) => Some(cm),
            Distance::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Distance::Known(_))
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Known(cm) => write!(f, "{cm:.2} cm"),
            Distance::Unknown => f.write_str("unknown"),
        }
    }
}

/// Immutable (angle, distance) pair produced once per sweep step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub angle: Angle,
    pub distance: Distance,
    /// Sweep pass that produced the point, counted from zero.
    pub pass: u64,
}

impl ScanPoint {
    pub fn new(angle: Angle, distance: Distance) -> Self {
        Self {
            angle,
            distance,
            pass: 0,
        }
    }

    pub fn with_pass(mut self, pass: u64) -> Self {
        self.pass = pass;
        self
    }
}

/// Most recently commanded mount angle, written by the sweep and read by the renderer.
#[derive(Debug, Default)]
pub struct CommandedAngle(AtomicU16);

impl CommandedAngle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, angle: Angle) {
        self.0.store(angle.degrees(), Ordering::Release);
    }

    pub fn load(&self) -> Angle {
        Angle::new(i32::from(self.0.load(Ordering::Acquire)))
    }
}
