//! Host-side stand-ins for the scanner hardware, driven by a synthetic [`Scene`].

use super::{AlertOutput, Clock, EchoLine, MotorDirection, MotorDriver, MountActuator, TriggerLine};
use crate::processing::sample::{Angle, HALF_SPEED_OF_SOUND_CM_PER_S};
use crate::prelude::{ScanError, ScanResult};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Delay between the end of the trigger pulse and the echo line going high.
pub const ECHO_LATENCY: Duration = Duration::from_micros(50);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Flat surface covering an angular span at a fixed distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub from_deg: u16,
    pub to_deg: u16,
    pub distance_cm: f32,
}

impl Obstacle {
    pub fn new(from_deg: u16, to_deg: u16, distance_cm: f32) -> Self {
        Self {
            from_deg,
            to_deg,
            distance_cm,
        }
    }

    fn covers(&self, angle: Angle) -> bool {
        (self.from_deg..=self.to_deg).contains(&angle.degrees())
    }
}

/// What the simulated sensor sees around the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Distance reported where no obstacle is present.
    pub background_cm: f32,
    pub obstacles: Vec<Obstacle>,
    /// Angles at which no echo ever comes back.
    pub silent_angles: Vec<u16>,
    /// Peak uniform noise added to each reading.
    pub noise_cm: f32,
    pub seed: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background_cm: 200.0,
            obstacles: Vec::new(),
            silent_angles: Vec::new(),
            noise_cm: 0.0,
            seed: 0,
        }
    }
}

impl Scene {
    pub fn uniform(distance_cm: f32) -> Self {
        Self {
            background_cm: distance_cm,
            ..Default::default()
        }
    }

    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn with_silent_angle(mut self, degrees: u16) -> Self {
        self.silent_angles.push(degrees);
        self
    }

    /// Rejects scenes the transducer cannot model.
    pub fn validate(&self) -> ScanResult<()> {
        let finite = |value: f32| value.is_finite() && value >= 0.0;
        if !finite(self.background_cm) {
            return Err(ScanError::InvalidConfig(format!(
                "background_cm must be a finite non-negative distance, got {}",
                self.background_cm
            )));
        }
        if !finite(self.noise_cm) {
            return Err(ScanError::InvalidConfig(format!(
                "noise_cm must be finite and non-negative, got {}",
                self.noise_cm
            )));
        }
        for obstacle in &self.obstacles {
            if !finite(obstacle.distance_cm) {
                return Err(ScanError::InvalidConfig(format!(
                    "obstacle {}..={} has distance {}",
                    obstacle.from_deg, obstacle.to_deg, obstacle.distance_cm
                )));
            }
            if obstacle.from_deg > obstacle.to_deg {
                return Err(ScanError::InvalidConfig(format!(
                    "obstacle span {}..={} is reversed",
                    obstacle.from_deg, obstacle.to_deg
                )));
            }
        }
        Ok(())
    }

    /// Noise-free distance at `angle`, or `None` when the angle never echoes.
    /// The nearest covering obstacle wins.
    pub fn distance_at(&self, angle: Angle) -> Option<f32> {
        if self.silent_angles.contains(&angle.degrees()) {
            return None;
        }
        let nearest = self
            .obstacles
            .iter()
            .filter(|obstacle| obstacle.covers(angle))
            .map(|obstacle| obstacle.distance_cm)
            .fold(f32::INFINITY, f32::min);
        Some(nearest.min(self.background_cm))
    }
}

/// Records every commanded angle; can be switched unavailable to simulate a fault.
#[derive(Debug, Default)]
pub struct SimulatedMount {
    current: Mutex<Option<Angle>>,
    commanded: Mutex<Vec<Angle>>,
    unavailable: Mutex<bool>,
}

impl SimulatedMount {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> Option<Angle> {
        *lock(&self.current)
    }

    pub fn commanded(&self) -> Vec<Angle> {
        lock(&self.commanded).clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }
}

impl MountActuator for SimulatedMount {
    fn set_mount_angle(&self, angle: Angle) -> ScanResult<()> {
        if *lock(&self.unavailable) {
            return Err(ScanError::ActuatorUnavailable(format!(
                "mount did not accept {angle}"
            )));
        }
        *lock(&self.current) = Some(angle);
        lock(&self.commanded).push(angle);
        debug!("mount -> {}", angle);
        Ok(())
    }
}

#[derive(Debug)]
struct EchoState {
    trigger_high: bool,
    /// Start and end of the pending echo pulse.
    pulse: Option<(Duration, Duration)>,
    rng: StdRng,
}

/// Ultrasonic transducer model: a falling trigger edge schedules an echo pulse
/// whose width matches the scene distance at the mount's current angle.
pub struct SimulatedTransducer {
    scene: Scene,
    mount: Arc<SimulatedMount>,
    clock: Arc<dyn Clock>,
    state: Mutex<EchoState>,
}

impl SimulatedTransducer {
    pub fn new(scene: Scene, mount: Arc<SimulatedMount>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let rng = StdRng::seed_from_u64(scene.seed);
        Arc::new(Self {
            scene,
            mount,
            clock,
            state: Mutex::new(EchoState {
                trigger_high: false,
                pulse: None,
                rng,
            }),
        })
    }

    /// Trigger and echo line handles sharing this transducer.
    pub fn lines(self: &Arc<Self>) -> (SimulatedTrigger, SimulatedEcho) {
        (
            SimulatedTrigger(Arc::clone(self)),
            SimulatedEcho(Arc::clone(self)),
        )
    }

    fn fire(&self) {
        let now = self.clock.now();
        let angle = self.mount.current().unwrap_or(Angle::MIN);
        let mut state = lock(&self.state);
        let distance = self.scene.distance_at(angle).map(|cm| {
            let noise = if self.scene.noise_cm.is_finite() && self.scene.noise_cm > 0.0 {
                state.rng.gen_range(-self.scene.noise_cm..self.scene.noise_cm)
            } else {
                0.0
            };
            (cm + noise).max(0.0)
        });
        // A distance too large for a pulse width behaves like a lost echo.
        state.pulse = distance
            .and_then(|cm| Duration::try_from_secs_f32(cm / HALF_SPEED_OF_SOUND_CM_PER_S).ok())
            .map(|width| {
                let start = now + ECHO_LATENCY;
                (start, start + width)
            });
    }
}

pub struct SimulatedTrigger(Arc<SimulatedTransducer>);

impl TriggerLine for SimulatedTrigger {
    fn set_level(&mut self, high: bool) {
        let was_high = {
            let mut state = lock(&self.0.state);
            std::mem::replace(&mut state.trigger_high, high)
        };
        if was_high && !high {
            self.0.fire();
        }
    }
}

pub struct SimulatedEcho(Arc<SimulatedTransducer>);

impl EchoLine for SimulatedEcho {
    fn is_high(&mut self) -> bool {
        let now = self.0.clock.now();
        match lock(&self.0.state).pulse {
            Some((start, end)) => now >= start && now < end,
            None => false,
        }
    }
}

/// Alert output level change, stamped with the clock time it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    pub at: Duration,
    pub primary: bool,
    pub on: bool,
}

/// Alert outputs that remember every level change.
pub struct RecordingAlerts {
    clock: Arc<dyn Clock>,
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingAlerts {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        lock(&self.events).clone()
    }

    fn level(&self, primary: bool) -> bool {
        lock(&self.events)
            .iter()
            .rev()
            .find(|event| event.primary == primary)
            .map(|event| event.on)
            .unwrap_or(false)
    }

    pub fn primary(&self) -> bool {
        self.level(true)
    }

    pub fn secondary(&self) -> bool {
        self.level(false)
    }

    fn push(&self, primary: bool, on: bool) {
        let at = self.clock.now();
        lock(&self.events).push(AlertEvent { at, primary, on });
    }
}

impl AlertOutput for RecordingAlerts {
    fn set_primary_alert(&self, on: bool) {
        info!("primary alert {}", if on { "on" } else { "off" });
        self.push(true, on);
    }

    fn set_secondary_alert(&self, on: bool) {
        info!("secondary alert {}", if on { "on" } else { "off" });
        self.push(false, on);
    }
}

/// Motor driver that only keeps the last command.
#[derive(Debug, Default)]
pub struct SimulatedMotors {
    state: Mutex<Option<(MotorDirection, MotorDirection)>>,
}

impl SimulatedMotors {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current (left, right) directions, `None` while stopped.
    pub fn state(&self) -> Option<(MotorDirection, MotorDirection)> {
        *lock(&self.state)
    }
}

impl MotorDriver for SimulatedMotors {
    fn drive_motors(&self, left: MotorDirection, right: MotorDirection) -> ScanResult<()> {
        info!("motors left {:?} right {:?}", left, right);
        *lock(&self.state) = Some((left, right));
        Ok(())
    }

    fn stop_motors(&self) -> ScanResult<()> {
        info!("motors stopped");
        *lock(&self.state) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::VirtualClock;

    #[test]
    fn nearest_obstacle_wins() {
        let scene = Scene::uniform(200.0)
            .with_obstacle(Obstacle::new(40, 60, 30.0))
            .with_obstacle(Obstacle::new(50, 50, 8.0))
            .with_silent_angle(120);

        assert_eq!(scene.distance_at(Angle::new(10)), Some(200.0));
        assert_eq!(scene.distance_at(Angle::new(40)), Some(30.0));
        assert_eq!(scene.distance_at(Angle::new(50)), Some(8.0));
        assert_eq!(scene.distance_at(Angle::new(120)), None);
    }

    #[test]
    fn falling_trigger_schedules_echo_pulse() {
        let clock = Arc::new(VirtualClock::new());
        let mount = SimulatedMount::new();
        mount.set_mount_angle(Angle::new(90)).unwrap();
        let transducer = SimulatedTransducer::new(Scene::uniform(17.15), mount, clock.clone());
        let (mut trigger, mut echo) = transducer.lines();

        trigger.set_level(true);
        assert!(!echo.is_high());
        trigger.set_level(false);
        assert!(!echo.is_high());

        clock.advance(ECHO_LATENCY);
        assert!(echo.is_high());
        // 17.15 cm corresponds to a 1 ms pulse.
        clock.advance(Duration::from_millis(1));
        assert!(!echo.is_high());
    }

    #[test]
    fn unrepresentable_distance_never_echoes() {
        let clock = Arc::new(VirtualClock::new());
        let mount = SimulatedMount::new();
        mount.set_mount_angle(Angle::new(90)).unwrap();
        let transducer =
            SimulatedTransducer::new(Scene::uniform(f32::INFINITY), mount, clock.clone());
        let (mut trigger, mut echo) = transducer.lines();

        trigger.set_level(true);
        trigger.set_level(false);
        clock.advance(Duration::from_millis(1));
        assert!(!echo.is_high());
    }

    #[test]
    fn scene_validation_rejects_bad_values() {
        assert!(Scene::uniform(200.0)
            .with_obstacle(Obstacle::new(10, 20, 8.0))
            .validate()
            .is_ok());
        assert!(Scene::uniform(f32::INFINITY).validate().is_err());
        assert!(Scene::uniform(200.0)
            .with_obstacle(Obstacle::new(10, 20, f32::NAN))
            .validate()
            .is_err());
        assert!(Scene::uniform(200.0)
            .with_obstacle(Obstacle::new(40, 20, 8.0))
            .validate()
            .is_err());
        let noisy = Scene {
            noise_cm: -1.0,
            ..Scene::default()
        };
        assert!(matches!(noisy.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn unavailable_mount_reports_actuator_error() {
        let mount = SimulatedMount::new();
        mount.set_unavailable(true);
        assert!(matches!(
            mount.set_mount_angle(Angle::new(10)),
            Err(ScanError::ActuatorUnavailable(_))
        ));
        assert!(mount.commanded().is_empty());
    }
}
