use crate::hardware::{Clock, LineClaim, LineRegistry, MountActuator};
use crate::prelude::{ScanConfig, ScanError, ScanResult, SweepDirection};
use crate::processing::range::RangeSensor;
use crate::processing::sample::{Angle, CommandedAngle, Distance, ScanPoint};
use crate::scheduler::shutdown::ShutdownSignal;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub pass: u64,
    pub points: usize,
    pub timeouts: usize,
}

/// Steps the mount across the arc and measures at every step.
pub struct SweepController {
    mount: Arc<dyn MountActuator>,
    sensor: RangeSensor,
    clock: Arc<dyn Clock>,
    settle: Duration,
    step_degrees: u16,
    direction: SweepDirection,
    commanded: Arc<CommandedAngle>,
    metrics: Arc<MetricsRecorder>,
    pass: u64,
    _mount_claim: LineClaim,
    logger: LogManager,
}

impl SweepController {
    pub fn new(
        config: &ScanConfig,
        mount: Arc<dyn MountActuator>,
        sensor: RangeSensor,
        clock: Arc<dyn Clock>,
        registry: &Arc<LineRegistry>,
        commanded: Arc<CommandedAngle>,
        metrics: Arc<MetricsRecorder>,
    ) -> ScanResult<Self> {
        let mount_claim = registry.claim(config.lines.mount, "sweep mount")?;
        Ok(Self {
            mount,
            sensor,
            clock,
            settle: config.settle(),
            step_degrees: config.step_degrees.clamp(1, 180),
            direction: config.sweep_direction,
            commanded,
            metrics,
            pass: 0,
            _mount_claim: mount_claim,
            logger: LogManager::new("sweep"),
        })
    }

    /// Number of passes completed so far. Aborted passes are retried under
    /// the same index and keep the direction they started with.
    pub fn passes(&self) -> u64 {
        self.pass
    }

    /// Angles of the next pass in the order they will be visited.
    pub fn plan(&self) -> Vec<Angle> {
        let mut angles = Angle::sweep(self.step_degrees);
        if self.direction == SweepDirection::Alternate && self.pass % 2 == 1 {
            angles.reverse();
        }
        angles
    }

    /// Runs one pass, handing every point to `on_sample` as soon as it is taken.
    ///
    /// A step whose echo times out still yields a point with
    /// [`Distance::Unknown`]. An actuator failure aborts the pass; a triggered
    /// `shutdown` stops it between steps. Errors from `on_sample` abort the
    /// pass as well.
    pub fn run_sweep<F>(&mut self, shutdown: &ShutdownSignal, mut on_sample: F) -> ScanResult<SweepSummary>
    where
        F: FnMut(ScanPoint) -> ScanResult<()>,
    {
        let plan = self.plan();
        let pass = self.pass;

        let mut summary = SweepSummary {
            pass,
            points: 0,
            timeouts: 0,
        };
        for angle in plan {
            shutdown.check()?;
            self.mount.set_mount_angle(angle)?;
            self.commanded.store(angle);
            self.clock.sleep(self.settle);

            let distance = match self.sensor.measure() {
                Ok(distance) => distance,
                Err(err @ ScanError::SensorTimeout { .. }) => {
                    self.metrics.record_timeout();
                    self.logger.detail(&format!("{angle}: {err}"));
                    summary.timeouts += 1;
                    Distance::Unknown
                }
                Err(err) => return Err(err),
            };

            self.metrics.record_sample();
            summary.points += 1;
            self.logger
                .detail(&format!("pass {pass} angle {angle} distance {distance}"));
            on_sample(ScanPoint::new(angle, distance).with_pass(pass))?;
        }

        self.logger.record(&format!(
            "pass {} complete: {} points, {} timeouts",
            pass, summary.points, summary.timeouts
        ));
        self.pass += 1;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{Obstacle, Scene, SimulatedMount, SimulatedTransducer};
    use crate::hardware::VirtualClock;
    use crate::processing::range::EchoTiming;

    struct Rig {
        sweep: SweepController,
        mount: Arc<SimulatedMount>,
        commanded: Arc<CommandedAngle>,
        metrics: Arc<MetricsRecorder>,
    }

    fn rig(config: &ScanConfig, scene: Scene) -> Rig {
        let clock = Arc::new(VirtualClock::new());
        let registry = LineRegistry::new();
        let mount = SimulatedMount::new();
        let transducer = SimulatedTransducer::new(scene, mount.clone(), clock.clone());
        let (trigger, echo) = transducer.lines();
        let sensor = RangeSensor::new(
            Box::new(trigger),
            Box::new(echo),
            clock.clone(),
            EchoTiming::from_config(config),
            &registry,
            [config.lines.trigger, config.lines.echo],
        )
        .unwrap();
        let commanded = Arc::new(CommandedAngle::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let sweep = SweepController::new(
            config,
            mount.clone(),
            sensor,
            clock,
            &registry,
            commanded.clone(),
            metrics.clone(),
        )
        .unwrap();
        Rig {
            sweep,
            mount,
            commanded,
            metrics,
        }
    }

    fn collect(sweep: &mut SweepController) -> ScanResult<Vec<ScanPoint>> {
        let mut points = Vec::new();
        sweep.run_sweep(&ShutdownSignal::new(), |p| {
            points.push(p);
            Ok(())
        })?;
        Ok(points)
    }

    #[test]
    fn even_steps_cover_the_arc_in_order() {
        for step in [1u16, 2, 3, 4, 5, 6, 9, 10, 12, 15, 18, 20, 30, 36, 45, 60, 90, 180] {
            let config = ScanConfig {
                step_degrees: step,
                settle_ms: 0,
                ..Default::default()
            };
            let mut rig = rig(&config, Scene::uniform(50.0));
            let points = collect(&mut rig.sweep).unwrap();

            assert_eq!(points.len(), 180 / step as usize + 1, "step {step}");
            assert_eq!(points.first().unwrap().angle, Angle::MIN);
            assert_eq!(points.last().unwrap().angle, Angle::MAX);
            assert!(points.windows(2).all(|w| w[0].angle < w[1].angle));
        }
    }

    #[test]
    fn timeout_leaves_unknown_sentinel() {
        let config = ScanConfig::default();
        let scene = Scene::uniform(120.0).with_silent_angle(70);
        let mut rig = rig(&config, scene);
        let points = collect(&mut rig.sweep).unwrap();

        assert_eq!(points.len(), 19);
        let at_70 = points.iter().find(|p| p.angle == Angle::new(70)).unwrap();
        assert_eq!(at_70.distance, Distance::Unknown);
        assert_eq!(rig.metrics.snapshot().timeouts, 1);
        assert_eq!(rig.metrics.snapshot().samples, 19);
    }

    #[test]
    fn readings_follow_the_scene() {
        let config = ScanConfig::default();
        let scene = Scene::uniform(200.0).with_obstacle(Obstacle::new(50, 50, 8.0));
        let mut rig = rig(&config, scene);
        let points = collect(&mut rig.sweep).unwrap();

        let at_50 = points[5].distance.known().unwrap();
        assert_eq!(points[5].angle, Angle::new(50));
        assert!((at_50 - 8.0).abs() < 0.05, "got {at_50}");
        assert_eq!(rig.commanded.load(), Angle::MAX);
        assert_eq!(rig.mount.commanded().len(), 19);
    }

    #[test]
    fn alternate_direction_reverses_every_other_pass() {
        let config = ScanConfig {
            step_degrees: 90,
            sweep_direction: SweepDirection::Alternate,
            ..Default::default()
        };
        let mut rig = rig(&config, Scene::default());
        let first: Vec<u16> = collect(&mut rig.sweep).unwrap().iter().map(|p| p.angle.degrees()).collect();
        let second: Vec<u16> = collect(&mut rig.sweep).unwrap().iter().map(|p| p.angle.degrees()).collect();
        assert_eq!(first, vec![0, 90, 180]);
        assert_eq!(second, vec![180, 90, 0]);
        assert_eq!(rig.sweep.passes(), 2);
    }

    #[test]
    fn actuator_failure_aborts_pass() {
        let config = ScanConfig::default();
        let mut rig = rig(&config, Scene::default());
        rig.mount.set_unavailable(true);
        assert!(matches!(
            collect(&mut rig.sweep),
            Err(ScanError::ActuatorUnavailable(_))
        ));
    }

    #[test]
    fn aborted_pass_keeps_index_and_direction() {
        let config = ScanConfig {
            step_degrees: 90,
            sweep_direction: SweepDirection::Alternate,
            ..Default::default()
        };
        let mut rig = rig(&config, Scene::default());
        collect(&mut rig.sweep).unwrap();

        rig.mount.set_unavailable(true);
        assert!(collect(&mut rig.sweep).is_err());
        assert_eq!(rig.sweep.passes(), 1);

        rig.mount.set_unavailable(false);
        let retried = collect(&mut rig.sweep).unwrap();
        let angles: Vec<u16> = retried.iter().map(|p| p.angle.degrees()).collect();
        assert_eq!(angles, vec![180, 90, 0]);
        assert!(retried.iter().all(|p| p.pass == 1));
        assert_eq!(rig.sweep.passes(), 2);
    }

    #[test]
    fn shutdown_stops_between_steps() {
        let config = ScanConfig::default();
        let mut rig = rig(&config, Scene::default());
        let shutdown = ShutdownSignal::new();
        let mut seen = 0;
        let result = rig.sweep.run_sweep(&shutdown, |_| {
            seen += 1;
            if seen == 3 {
                shutdown.trigger();
            }
            Ok(())
        });
        assert_eq!(result, Err(ScanError::ShutdownRequested));
        assert_eq!(seen, 3);
    }
}
