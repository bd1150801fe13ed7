use crate::console::operator::{run_operator, OPERATOR_HELP};
use crate::console::surface::ConsoleSurface;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use scancore::drive::DriveController;
use scancore::hardware::sim::{RecordingAlerts, SimulatedMotors, SimulatedMount, SimulatedTransducer};
use scancore::hardware::{Clock, LineRegistry, ScanHardware, SystemClock};
use scancore::math::StatsHelper;
use scancore::render::RadarRenderer;
use scancore::scheduler::{RenderTicker, ScanLoop};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Read operator drive commands from stdin while scanning.
    pub interactive: bool,
}

/// What one run produced, printed at exit.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub passes: u64,
    pub aborted_passes: u64,
    pub samples: u64,
    pub timeouts: u64,
    pub alerts: u64,
    pub coalesced_alerts: u64,
    pub alert_output_changes: usize,
    pub frames: u64,
    pub last_frame_commands: usize,
    pub max_wedges: usize,
    pub history_len: usize,
    pub closest_cm: Option<f32>,
    pub mean_cm: Option<f32>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    registry: Arc<LineRegistry>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self::with_registry(config, LineRegistry::global())
    }

    pub fn with_registry(config: WorkflowConfig, registry: Arc<LineRegistry>) -> Self {
        Self { config, registry }
    }

    /// Scans the configured scene until the pass limit, an operator quit or Ctrl+C.
    pub async fn run(&self, options: RunOptions) -> anyhow::Result<RunReport> {
        let scan_config = self.config.scan.clone();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mount = SimulatedMount::new();
        let transducer =
            SimulatedTransducer::new(self.config.resolve_scene(), mount.clone(), clock.clone());
        let (trigger, echo) = transducer.lines();
        let alerts = RecordingAlerts::new(clock.clone());
        let hardware = ScanHardware {
            mount,
            trigger: Box::new(trigger),
            echo: Box::new(echo),
            alerts: alerts.clone(),
            clock,
        };

        let drive = DriveController::new(
            SimulatedMotors::new(),
            &self.registry,
            scan_config.lines.motors,
        )
        .context("claiming drive motors")?;
        let scan = ScanLoop::spawn(scan_config.clone(), hardware, self.registry.clone())
            .context("starting scan loop")?;

        // Without an operator the motors stay claimed and stopped for the run.
        let (operator, _parked_drive) = if options.interactive {
            println!("{OPERATOR_HELP}");
            let input = BufReader::new(tokio::io::stdin());
            let task = tokio::spawn(run_operator(input, drive, scan.shutdown_signal()));
            (Some(task), None)
        } else {
            (None, Some(drive))
        };

        let telemetry = scan.telemetry();
        let mut ticker = RenderTicker::new(
            RadarRenderer::new(scan_config.render.clone()),
            telemetry.clone(),
            ConsoleSurface::new(self.config.canvas),
        );
        let mut interval = tokio::time::interval(scan_config.render_interval());
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    ticker.tick();
                    if scan.is_finished() {
                        break;
                    }
                }
                result = &mut ctrl_c => {
                    result.context("awaiting Ctrl+C")?;
                    info!("Ctrl+C received, stopping scan");
                    scan.request_shutdown();
                    break;
                }
            }
        }

        let metrics = tokio::task::spawn_blocking(move || scan.join())
            .await
            .context("joining scan loop")??;
        ticker.tick();

        if let Some(handle) = operator {
            handle.abort();
            if let Ok(result) = handle.await {
                let handled = result?;
                info!("operator forwarded {handled} event(s)");
            }
        }

        let points = telemetry.history.snapshot();
        let known: Vec<f32> = points.iter().filter_map(|p| p.distance.known()).collect();
        let closest_cm = known.iter().copied().reduce(f32::min);

        Ok(RunReport {
            passes: metrics.passes,
            aborted_passes: metrics.aborted_passes,
            samples: metrics.samples,
            timeouts: metrics.timeouts,
            alerts: metrics.alerts,
            coalesced_alerts: metrics.coalesced_alerts,
            alert_output_changes: alerts.events().len(),
            frames: ticker.frames(),
            last_frame_commands: ticker.surface().last_commands(),
            max_wedges: ticker.surface().max_wedges(),
            history_len: points.len(),
            closest_cm,
            mean_cm: StatsHelper::mean(&known).map(|mean| StatsHelper::round_to(mean, 2)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scancore::hardware::sim::{Obstacle, Scene};
    use scancore::processing::AlertTimings;

    fn quick_config(scene: Scene) -> WorkflowConfig {
        let mut config = WorkflowConfig {
            scene: Some(scene),
            ..Default::default()
        };
        config.scan.step_degrees = 30;
        config.scan.settle_ms = 0;
        config.scan.render_interval_ms = 10;
        config.scan.max_passes = Some(2);
        config.scan.alert_timings = AlertTimings {
            primary_on_ms: 5,
            primary_off_ms: 5,
            secondary_on_ms: 5,
            secondary_off_ms: 5,
        };
        config
    }

    #[tokio::test]
    async fn runner_scans_until_pass_limit() {
        let scene = Scene::uniform(200.0).with_obstacle(Obstacle::new(55, 65, 8.0));
        let runner = Runner::with_registry(quick_config(scene), LineRegistry::new());
        let report = runner.run(RunOptions::default()).await.unwrap();

        assert_eq!(report.passes, 2);
        assert_eq!(report.samples, 14);
        assert_eq!(report.timeouts, 0);
        assert_eq!(report.alerts, 2);
        assert!(report.alert_output_changes >= 4);
        assert!(report.frames >= 2);
        // Clear, outline arc, seven guides and two sweep edges at minimum.
        assert!(report.last_frame_commands >= 11);
        assert_eq!(report.history_len, 14);
        let closest = report.closest_cm.unwrap();
        assert!((closest - 8.0).abs() < 0.1, "closest {closest}");
    }

    #[tokio::test]
    async fn silent_scene_reports_timeouts_without_distances() {
        let mut scene = Scene::uniform(200.0);
        scene.silent_angles = (0..=180).step_by(30).collect();
        let mut config = quick_config(scene);
        config.scan.echo_timeout_ms = 2;
        config.scan.max_passes = Some(1);
        let runner = Runner::with_registry(config, LineRegistry::new());
        let report = runner.run(RunOptions::default()).await.unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.timeouts, 7);
        assert_eq!(report.alerts, 0);
        assert_eq!(report.closest_cm, None);
        assert_eq!(report.mean_cm, None);
        assert_eq!(report.max_wedges, 0);
    }

    #[tokio::test]
    async fn conflicting_lines_fail_before_scanning() {
        let registry = LineRegistry::new();
        let _held = registry.claim(26, "another tool").unwrap();
        let runner = Runner::with_registry(quick_config(Scene::default()), registry.clone());
        let err = runner.run(RunOptions::default()).await.unwrap_err();

        assert!(format!("{err:#}").contains("line 26"));
        assert_eq!(registry.claimed(), vec![26]);
    }
}
