mod radar_canvas;

use iced::{
    time,
    widget::{button, column, row, scrollable, text, Canvas, Column, Container},
    Alignment, Element, Length, Subscription, Task, Theme,
};
use radar_canvas::RadarView;
use scancore::drive::{DriveController, OperatorEvent};
use scancore::hardware::sim::{
    Obstacle, RecordingAlerts, Scene, SimulatedMotors, SimulatedMount, SimulatedTransducer,
};
use scancore::hardware::{Clock, LineRegistry, ScanHardware, SystemClock};
use scancore::processing::AlertState;
use scancore::render::RadarRenderer;
use scancore::scheduler::{ScanLoop, ScanTelemetry, TelemetrySnapshot};
use scancore::{ScanConfig, ScanResult};
use std::sync::Arc;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "Sweep Sonar Radar".into()
}

fn application_subscription(state: &Visualizer) -> Subscription<Message> {
    time::every(state.config.render_interval()).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

/// Obstacles around the simulated robot: two side walls and a box close by.
fn demo_scene() -> Scene {
    Scene {
        background_cm: 180.0,
        obstacles: vec![
            Obstacle::new(0, 25, 60.0),
            Obstacle::new(45, 55, 8.0),
            Obstacle::new(100, 130, 120.0),
            Obstacle::new(160, 180, 45.0),
        ],
        noise_cm: 0.8,
        seed: 11,
        ..Default::default()
    }
}

/// Everything one running scan owns. Dropping it stops the sweep, turns the
/// alerts off, stops the motors and releases every line.
struct Session {
    scan: ScanLoop,
    telemetry: ScanTelemetry,
    drive: DriveController,
    alerts: Arc<RecordingAlerts>,
}

impl Session {
    fn start(config: &ScanConfig, scene: Scene) -> ScanResult<Self> {
        let registry = LineRegistry::global();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let mount = SimulatedMount::new();
        let transducer = SimulatedTransducer::new(scene, mount.clone(), clock.clone());
        let (trigger, echo) = transducer.lines();
        let alerts = RecordingAlerts::new(clock.clone());

        let drive = DriveController::new(SimulatedMotors::new(), &registry, config.lines.motors)?;
        let scan = ScanLoop::spawn(
            config.clone(),
            ScanHardware {
                mount,
                trigger: Box::new(trigger),
                echo: Box::new(echo),
                alerts: alerts.clone(),
                clock,
            },
            registry,
        )?;
        let telemetry = scan.telemetry();
        Ok(Self {
            scan,
            telemetry,
            drive,
            alerts,
        })
    }
}

struct Visualizer {
    config: ScanConfig,
    renderer: RadarRenderer,
    session: Option<Session>,
    snapshot: Option<TelemetrySnapshot>,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Drive(OperatorEvent),
    StopScan,
    RestartScan,
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let config = ScanConfig::default();
        let mut state = Visualizer {
            renderer: RadarRenderer::new(config.render.clone()),
            config,
            session: None,
            snapshot: None,
            status: "Starting scan...".into(),
            history: Vec::new(),
        };
        state.start_session();
        (state, Task::none())
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if let Some(session) = &state.session {
                    let snapshot = session.telemetry.snapshot();
                    if session.scan.is_finished() {
                        state.status = "Scan stopped.".into();
                    } else {
                        state.status = format!(
                            "Scanning at {} | alert {}",
                            snapshot.angle,
                            alert_label(snapshot.alert)
                        );
                    }
                    state.snapshot = Some(snapshot);
                }
                Task::none()
            }
            Message::Drive(event) => {
                match state.session.as_mut() {
                    Some(session) => match session.drive.handle(event) {
                        Ok(command) => state.push_history(format!("{event:?} -> {command:?}")),
                        Err(err) => state.status = format!("Drive error: {err}"),
                    },
                    None => state.status = "No scan session; restart to drive.".into(),
                }
                Task::none()
            }
            Message::StopScan => {
                if let Some(session) = &state.session {
                    session.scan.request_shutdown();
                    state.push_history("Shutdown requested".into());
                }
                Task::none()
            }
            Message::RestartScan => {
                if let Some(session) = state.session.take() {
                    state.push_history(format!(
                        "Previous session toggled alerts {} time(s)",
                        session.alerts.events().len()
                    ));
                }
                state.start_session();
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let drive_pad = column![
            button("Forward")
                .on_press(Message::Drive(OperatorEvent::Forward))
                .padding(10),
            row![
                button("Left")
                    .on_press(Message::Drive(OperatorEvent::Left))
                    .padding(10),
                button("Stop")
                    .on_press(Message::Drive(OperatorEvent::Stop))
                    .padding(10),
                button("Right")
                    .on_press(Message::Drive(OperatorEvent::Right))
                    .padding(10),
            ]
            .spacing(6),
            button("Backward")
                .on_press(Message::Drive(OperatorEvent::Backward))
                .padding(10),
        ]
        .spacing(6)
        .align_x(Alignment::Center);

        let metrics_info = match &state.snapshot {
            Some(snapshot) => column![
                text(format!(
                    "Passes: {} (aborted {})",
                    snapshot.metrics.passes, snapshot.metrics.aborted_passes
                ))
                .size(14),
                text(format!(
                    "Samples: {} | timeouts {}",
                    snapshot.metrics.samples, snapshot.metrics.timeouts
                ))
                .size(14),
                text(format!(
                    "Alerts: {} | coalesced {}",
                    snapshot.metrics.alerts, snapshot.metrics.coalesced_alerts
                ))
                .size(14),
                text(format!("History: {} point(s)", snapshot.points.len())).size(14),
            ]
            .spacing(4),
            None => column![text("Metrics: n/a").size(14)],
        };

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let control_column = column![
            text("Drive").size(26),
            drive_pad,
            row![
                button("Stop scan").on_press(Message::StopScan).padding(10),
                button("Restart scan")
                    .on_press(Message::RestartScan)
                    .padding(10),
            ]
            .spacing(6),
            text(&state.status).size(14),
            text("Telemetry").size(20),
            metrics_info,
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(160.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(320.0));

        let (points, angle) = match &state.snapshot {
            Some(snapshot) => (snapshot.points.as_slice(), snapshot.angle),
            None => (&[][..], Default::default()),
        };
        let radar = Canvas::new(RadarView::new(&state.renderer, points, angle))
            .width(Length::Fill)
            .height(Length::Fill);

        let layout = row![control_column, radar]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn start_session(&mut self) {
        match Session::start(&self.config, demo_scene()) {
            Ok(session) => {
                self.session = Some(session);
                self.snapshot = None;
                self.push_history("Scan started".into());
            }
            Err(err) => {
                log::error!("starting scan session: {err}");
                self.status = format!("Scan error: {err}");
            }
        }
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn alert_label(state: AlertState) -> String {
    match state {
        AlertState::Idle => "idle".into(),
        AlertState::Engaged { stage, .. } => format!("stage {} on", stage + 1),
        AlertState::Cooldown { stage, .. } => format!("stage {} off", stage + 1),
    }
}
