use crate::hardware::{LineRegistry, ScanHardware};
use crate::prelude::{ScanConfig, ScanError, ScanResult};
use crate::processing::alert::{AlertExecutor, AlertPanel, AlertState, AlertStatus};
use crate::processing::detection::DetectionPolicy;
use crate::processing::history::SampleHistory;
use crate::processing::range::{EchoTiming, RangeSensor};
use crate::processing::sample::{Angle, CommandedAngle, ScanPoint};
use crate::processing::sweep::SweepController;
use crate::scheduler::shutdown::ShutdownSignal;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Read side of the scan: everything a renderer or reporter may look at.
#[derive(Debug, Clone)]
pub struct ScanTelemetry {
    pub history: Arc<SampleHistory>,
    pub angle: Arc<CommandedAngle>,
    pub alert: Arc<AlertStatus>,
    pub metrics: Arc<MetricsRecorder>,
}

/// Consistent copy of [`ScanTelemetry`] taken at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub points: Vec<ScanPoint>,
    pub angle: Angle,
    pub alert: AlertState,
    pub metrics: MetricsSnapshot,
}

impl ScanTelemetry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Arc::new(SampleHistory::with_capacity(history_capacity)),
            angle: Arc::new(CommandedAngle::new()),
            alert: AlertStatus::new(),
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            points: self.history.snapshot(),
            angle: self.angle.load(),
            alert: self.alert.get(),
            metrics: self.metrics.snapshot(),
        }
    }
}

/// Repeats sweep passes on a dedicated thread until shutdown or `max_passes`.
///
/// Dropping the loop requests shutdown and joins the thread; every hardware
/// line it claimed is released and the alert outputs end up off.
pub struct ScanLoop {
    shutdown: ShutdownSignal,
    telemetry: ScanTelemetry,
    handle: Option<JoinHandle<()>>,
}

impl ScanLoop {
    pub fn spawn(
        config: ScanConfig,
        hardware: ScanHardware,
        registry: Arc<LineRegistry>,
    ) -> ScanResult<Self> {
        Self::spawn_with_signal(config, hardware, registry, ShutdownSignal::new())
    }

    pub fn spawn_with_signal(
        config: ScanConfig,
        hardware: ScanHardware,
        registry: Arc<LineRegistry>,
        shutdown: ShutdownSignal,
    ) -> ScanResult<Self> {
        config.validate()?;
        let telemetry = ScanTelemetry::new(config.history_capacity);
        let ScanHardware {
            mount,
            trigger,
            echo,
            alerts,
            clock,
        } = hardware;

        let sensor = RangeSensor::new(
            trigger,
            echo,
            clock.clone(),
            EchoTiming::from_config(&config),
            &registry,
            [config.lines.trigger, config.lines.echo],
        )?;
        let mut sweep = SweepController::new(
            &config,
            mount,
            sensor,
            clock.clone(),
            &registry,
            telemetry.angle.clone(),
            telemetry.metrics.clone(),
        )?;
        let panel = AlertPanel::new(
            alerts,
            &registry,
            [config.lines.primary_alert, config.lines.secondary_alert],
        )?;
        let mut executor = AlertExecutor::new(
            config.alert_mode,
            panel,
            clock.clone(),
            telemetry.alert.clone(),
            shutdown.clone(),
            telemetry.metrics.clone(),
        )?;
        let policy = DetectionPolicy::from_config(&config);

        let signal = shutdown.clone();
        let shared = telemetry.clone();
        let handle = thread::Builder::new()
            .name("scan-loop".into())
            .spawn(move || {
                let logger = LogManager::new("scan-loop");
                logger.record(&format!(
                    "starting: step {}°, threshold {} cm, {:?} alerts",
                    config.step_degrees, config.near_threshold_cm, config.alert_mode
                ));
                loop {
                    if signal.is_triggered() {
                        break;
                    }
                    if config
                        .max_passes
                        .is_some_and(|max| sweep.passes() >= max)
                    {
                        logger.record("pass limit reached");
                        break;
                    }

                    let outcome = sweep.run_sweep(&signal, |point| {
                        shared.history.push(point);
                        if let Some(action) = policy.evaluate(&point) {
                            shared.metrics.record_alert();
                            logger.record(&format!(
                                "obstacle at {} within {} cm",
                                point.angle, point.distance
                            ));
                            executor.dispatch(action, &signal)?;
                        }
                        Ok(())
                    });

                    match outcome {
                        Ok(_) => shared.metrics.record_pass(),
                        Err(ScanError::ShutdownRequested) => break,
                        Err(err) => {
                            shared.metrics.record_aborted_pass();
                            logger.warn(&format!("pass aborted: {err}; retrying"));
                            if signal.sleep(&*clock, config.retry_backoff()).is_err() {
                                break;
                            }
                        }
                    }
                }
                drop(sweep);
                executor.finish();
                logger.record("stopped, lines released");
            })
            .map_err(|err| ScanError::Internal(format!("spawning scan loop: {err}")))?;

        Ok(Self {
            shutdown,
            telemetry,
            handle: Some(handle),
        })
    }

    pub fn telemetry(&self) -> ScanTelemetry {
        self.telemetry.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the loop thread to exit without requesting shutdown.
    pub fn join(mut self) -> ScanResult<MetricsSnapshot> {
        self.wait()?;
        Ok(self.telemetry.metrics.snapshot())
    }

    fn wait(&mut self) -> ScanResult<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ScanError::Internal("scan loop panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown.trigger();
            if let Err(err) = self.wait() {
                LogManager::new("scan-loop").warn(&err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{Obstacle, RecordingAlerts, Scene, SimulatedMount, SimulatedTransducer};
    use crate::hardware::{Clock, SystemClock, VirtualClock};
    use crate::prelude::AlertMode;
    use crate::processing::detection::AlertTimings;
    use std::time::Duration;

    struct Bench {
        hardware: ScanHardware,
        mount: Arc<SimulatedMount>,
        alerts: Arc<RecordingAlerts>,
    }

    fn bench(scene: Scene, clock: Arc<dyn Clock>) -> Bench {
        let mount = SimulatedMount::new();
        let transducer = SimulatedTransducer::new(scene, mount.clone(), clock.clone());
        let (trigger, echo) = transducer.lines();
        let alerts = RecordingAlerts::new(clock.clone());
        Bench {
            hardware: ScanHardware {
                mount: mount.clone(),
                trigger: Box::new(trigger),
                echo: Box::new(echo),
                alerts: alerts.clone(),
                clock,
            },
            mount,
            alerts,
        }
    }

    fn one_pass(alert_mode: AlertMode) -> ScanConfig {
        ScanConfig {
            max_passes: Some(1),
            alert_mode,
            ..Default::default()
        }
    }

    #[test]
    fn clear_scene_raises_no_alerts() {
        let clock: Arc<dyn Clock> = Arc::new(VirtualClock::new());
        let bench = bench(Scene::uniform(200.0), clock);
        let registry = LineRegistry::new();
        let scan = ScanLoop::spawn(one_pass(AlertMode::Blocking), bench.hardware, registry.clone())
            .unwrap();
        let telemetry = scan.telemetry();
        let metrics = scan.join().unwrap();

        assert_eq!(metrics.passes, 1);
        assert_eq!(metrics.samples, 19);
        assert_eq!(metrics.alerts, 0);
        assert_eq!(telemetry.history.len(), 19);
        assert!(bench.alerts.events().iter().all(|e| !e.on));
        assert!(registry.claimed().is_empty());
    }

    #[test]
    fn close_obstacle_blocks_sweep_for_alert_sequence() {
        let virtual_clock = Arc::new(VirtualClock::new());
        let clock: Arc<dyn Clock> = virtual_clock.clone();
        let scene = Scene::uniform(200.0).with_obstacle(Obstacle::new(50, 50, 8.0));
        let bench = bench(scene, clock);
        let scan = ScanLoop::spawn(
            one_pass(AlertMode::Blocking),
            bench.hardware,
            LineRegistry::new(),
        )
        .unwrap();
        let metrics = scan.join().unwrap();

        assert_eq!(metrics.alerts, 1);
        let on: Vec<_> = bench.alerts.events().into_iter().filter(|e| e.on).collect();
        assert_eq!(on.len(), 2);
        assert!(on[0].primary && !on[1].primary);
        assert_eq!(on[1].at - on[0].at, Duration::from_secs(4));

        // The whole pass took at least the six second stall on top of 19 steps.
        assert!(virtual_clock.now() >= Duration::from_secs(6) + Duration::from_millis(19 * 50));
        let angles = bench.mount.commanded();
        assert_eq!(angles.len(), 19);
    }

    #[test]
    fn deferred_alert_does_not_stall_the_sweep() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let scene = Scene::uniform(30.0).with_obstacle(Obstacle::new(50, 50, 8.0));
        let bench = bench(scene, clock.clone());
        let config = ScanConfig {
            settle_ms: 0,
            alert_timings: AlertTimings {
                primary_on_ms: 200,
                primary_off_ms: 200,
                secondary_on_ms: 100,
                secondary_off_ms: 100,
            },
            ..one_pass(AlertMode::Deferred)
        };
        let started = clock.now();
        let scan = ScanLoop::spawn(config, bench.hardware, LineRegistry::new()).unwrap();
        let telemetry = scan.telemetry();

        // The pass finishes long before the 600 ms alert sequence does.
        while telemetry.metrics.snapshot().passes == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(clock.now() - started < Duration::from_millis(500));
        assert!(!telemetry.alert.get().is_idle());

        let metrics = scan.join().unwrap();
        assert_eq!(metrics.alerts, 1);
        assert!(clock.now() - started >= Duration::from_millis(600));
        let levels: Vec<(bool, bool)> = bench
            .alerts
            .events()
            .iter()
            .filter(|e| e.on)
            .map(|e| (e.primary, e.on))
            .collect();
        assert_eq!(levels, vec![(true, true), (false, true)]);
        assert!(telemetry.alert.get().is_idle());
    }

    #[test]
    fn actuator_failure_is_retried_until_shutdown() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let bench = bench(Scene::default(), clock);
        bench.mount.set_unavailable(true);
        let config = ScanConfig {
            retry_backoff_ms: 5,
            ..Default::default()
        };
        let scan = ScanLoop::spawn(config, bench.hardware, LineRegistry::new()).unwrap();
        let telemetry = scan.telemetry();
        while telemetry.metrics.snapshot().aborted_passes < 2 {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!scan.is_finished());

        bench.mount.set_unavailable(false);
        scan.request_shutdown();
        let metrics = scan.join().unwrap();
        assert!(metrics.aborted_passes >= 2);
    }

    #[test]
    fn unreachable_scene_times_out_instead_of_failing() {
        let clock: Arc<dyn Clock> = Arc::new(VirtualClock::new());
        let bench = bench(Scene::uniform(f32::INFINITY), clock);
        let scan = ScanLoop::spawn(
            one_pass(AlertMode::Blocking),
            bench.hardware,
            LineRegistry::new(),
        )
        .unwrap();
        let metrics = scan.join().unwrap();

        assert_eq!(metrics.passes, 1);
        assert_eq!(metrics.timeouts, 19);
        assert_eq!(metrics.alerts, 0);
    }

    #[test]
    fn pass_limit_counts_completed_passes_only() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let bench = bench(Scene::uniform(20.0), clock);
        bench.mount.set_unavailable(true);
        let config = ScanConfig {
            settle_ms: 0,
            retry_backoff_ms: 5,
            max_passes: Some(2),
            ..Default::default()
        };
        let scan = ScanLoop::spawn(config, bench.hardware, LineRegistry::new()).unwrap();
        let telemetry = scan.telemetry();
        while telemetry.metrics.snapshot().aborted_passes < 2 {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!scan.is_finished());

        bench.mount.set_unavailable(false);
        let metrics = scan.join().unwrap();
        assert_eq!(metrics.passes, 2);
        assert!(metrics.aborted_passes >= 2);
        assert_eq!(metrics.samples, 38);
    }

    #[test]
    fn conflicting_lines_prevent_start() {
        let clock: Arc<dyn Clock> = Arc::new(VirtualClock::new());
        let bench = bench(Scene::default(), clock);
        let registry = LineRegistry::new();
        let _motor = registry.claim(25, "motor driver").unwrap();
        let result = ScanLoop::spawn(ScanConfig::default(), bench.hardware, registry.clone());

        assert!(matches!(result, Err(ScanError::LineConflict { line: 25, .. })));
        assert_eq!(registry.claimed(), vec![25]);
    }

    #[test]
    fn dropping_the_loop_shuts_it_down() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let bench = bench(Scene::uniform(20.0), clock);
        let registry = LineRegistry::new();
        let scan = ScanLoop::spawn(ScanConfig::default(), bench.hardware, registry.clone()).unwrap();
        thread::sleep(Duration::from_millis(30));
        drop(scan);
        assert!(registry.claimed().is_empty());
    }
}
