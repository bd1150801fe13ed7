use crate::hardware::{AlertOutput, Clock, LineClaim, LineRegistry};
use crate::prelude::{AlertMode, ScanError, ScanResult};
use crate::processing::detection::{AlertAction, AlertChannel, AlertStage};
use crate::scheduler::shutdown::{ShutdownSignal, CANCEL_SLICE};
use crate::telemetry::{LogManager, MetricsRecorder};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Progress of the alert sequence. `since` is the clock time the stage began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Idle,
    /// The current stage drives an output high.
    Engaged { stage: usize, since: Duration },
    /// The current stage holds an output low.
    Cooldown { stage: usize, since: Duration },
}

impl AlertState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AlertState::Idle)
    }

    fn stage(&self) -> Option<(usize, Duration)> {
        match *self {
            AlertState::Idle => None,
            AlertState::Engaged { stage, since } | AlertState::Cooldown { stage, since } => {
                Some((stage, since))
            }
        }
    }
}

/// Latest [`AlertState`], readable from other threads.
#[derive(Debug, Default)]
pub struct AlertStatus(Mutex<AlertState>);

impl AlertStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self) -> AlertState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: AlertState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Clock-driven state machine walking an [`AlertAction`] stage by stage.
#[derive(Debug, Default)]
pub struct AlertSequencer {
    state: AlertState,
    stages: Vec<AlertStage>,
    status: Option<Arc<AlertStatus>>,
}

impl AlertSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors every state change into `status`.
    pub fn with_status(status: Arc<AlertStatus>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Begins `action` at `now`. Returns `false` and leaves the running
    /// sequence untouched when one is already in progress.
    pub fn start(&mut self, action: &AlertAction, now: Duration, outputs: &dyn AlertOutput) -> bool {
        if !self.is_idle() || action.stages.is_empty() {
            return false;
        }
        self.stages = action.stages.clone();
        self.enter(0, now, outputs);
        true
    }

    /// When the current stage ends, or `None` while idle.
    pub fn deadline(&self) -> Option<Duration> {
        let (stage, since) = self.state.stage()?;
        self.stages.get(stage).map(|s| since + s.hold)
    }

    /// Moves through every stage that has ended by `now` and returns the
    /// deadline of the stage now in effect.
    pub fn advance(&mut self, now: Duration, outputs: &dyn AlertOutput) -> Option<Duration> {
        while let Some(deadline) = self.deadline() {
            if now < deadline {
                return Some(deadline);
            }
            let next = self.state.stage().map_or(0, |(stage, _)| stage + 1);
            self.enter(next, deadline, outputs);
        }
        None
    }

    /// Drops the running sequence and switches both outputs off.
    pub fn abort(&mut self, outputs: &dyn AlertOutput) {
        if self.is_idle() {
            return;
        }
        outputs.set_primary_alert(false);
        outputs.set_secondary_alert(false);
        self.stages.clear();
        self.publish(AlertState::Idle);
    }

    /// Plays `action` to completion on the calling thread.
    ///
    /// Returns the time spent, or `ShutdownRequested` with the outputs off
    /// when the signal fires between waits.
    pub fn run_blocking(
        &mut self,
        action: &AlertAction,
        outputs: &dyn AlertOutput,
        clock: &dyn Clock,
        shutdown: &ShutdownSignal,
    ) -> ScanResult<Duration> {
        let started = clock.now();
        if !self.start(action, started, outputs) {
            return Ok(Duration::ZERO);
        }
        while let Some(deadline) = self.advance(clock.now(), outputs) {
            if shutdown.is_triggered() {
                self.abort(outputs);
                return Err(ScanError::ShutdownRequested);
            }
            let remaining = deadline.saturating_sub(clock.now());
            clock.sleep(remaining.min(CANCEL_SLICE));
        }
        Ok(clock.now().saturating_sub(started))
    }

    fn enter(&mut self, index: usize, since: Duration, outputs: &dyn AlertOutput) {
        let Some(stage) = self.stages.get(index).copied() else {
            self.stages.clear();
            self.publish(AlertState::Idle);
            return;
        };
        match stage.channel {
            AlertChannel::Primary => outputs.set_primary_alert(stage.active),
            AlertChannel::Secondary => outputs.set_secondary_alert(stage.active),
        }
        self.publish(if stage.active {
            AlertState::Engaged {
                stage: index,
                since,
            }
        } else {
            AlertState::Cooldown {
                stage: index,
                since,
            }
        });
    }

    fn publish(&mut self, state: AlertState) {
        self.state = state;
        if let Some(status) = &self.status {
            status.set(state);
        }
    }
}

/// Alert outputs together with the claims on their lines. Dropping the panel
/// switches both outputs off and releases the lines.
pub struct AlertPanel {
    outputs: Arc<dyn AlertOutput>,
    _claims: Vec<LineClaim>,
}

impl AlertPanel {
    pub fn new(
        outputs: Arc<dyn AlertOutput>,
        registry: &Arc<LineRegistry>,
        lines: [u8; 2],
    ) -> ScanResult<Self> {
        let claims = registry.claim_all(&lines, "alert panel")?;
        outputs.set_primary_alert(false);
        outputs.set_secondary_alert(false);
        Ok(Self {
            outputs,
            _claims: claims,
        })
    }

    pub fn outputs(&self) -> &dyn AlertOutput {
        &*self.outputs
    }
}

impl Drop for AlertPanel {
    fn drop(&mut self) {
        self.outputs.set_primary_alert(false);
        self.outputs.set_secondary_alert(false);
    }
}

/// Background thread that plays alert sequences on its own timer.
///
/// Requests arriving while a sequence runs are coalesced into it. The clock
/// must advance by itself; waits between stages use real time.
pub struct AlertWorker {
    sender: Option<Sender<AlertAction>>,
    handle: Option<JoinHandle<()>>,
}

impl AlertWorker {
    pub fn spawn(
        panel: AlertPanel,
        clock: Arc<dyn Clock>,
        status: Arc<AlertStatus>,
        shutdown: ShutdownSignal,
        metrics: Arc<MetricsRecorder>,
    ) -> ScanResult<Self> {
        let (sender, receiver) = mpsc::channel::<AlertAction>();
        let handle = thread::Builder::new()
            .name("alert-worker".into())
            .spawn(move || {
                let logger = LogManager::new("alert");
                let mut sequencer = AlertSequencer::with_status(status);
                let mut connected = true;
                loop {
                    if shutdown.is_triggered() {
                        sequencer.abort(panel.outputs());
                        break;
                    }
                    let deadline = sequencer.advance(clock.now(), panel.outputs());
                    if !connected && deadline.is_none() {
                        break;
                    }
                    let wait = deadline
                        .map(|d| d.saturating_sub(clock.now()))
                        .unwrap_or(CANCEL_SLICE)
                        .min(CANCEL_SLICE);
                    if !connected {
                        clock.sleep(wait);
                        continue;
                    }
                    match receiver.recv_timeout(wait) {
                        Ok(action) => {
                            if sequencer.start(&action, clock.now(), panel.outputs()) {
                                logger.record(&format!(
                                    "alert started for {} at {}",
                                    action.trigger.distance, action.trigger.angle
                                ));
                            } else {
                                metrics.record_coalesced_alert();
                                logger.detail("alert already running, request coalesced");
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => connected = false,
                    }
                }
            })
            .map_err(|err| ScanError::Internal(format!("spawning alert worker: {err}")))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn submit(&self, action: AlertAction) -> ScanResult<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| ScanError::Internal("alert worker closed".into()))?
            .send(action)
            .map_err(|_| ScanError::Internal("alert worker stopped".into()))
    }

    /// Closes the request channel and waits for the running sequence to end.
    pub fn join(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                LogManager::new("alert").warn("alert worker panicked");
            }
        }
    }
}

impl Drop for AlertWorker {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs alert actions according to the configured [`AlertMode`].
pub enum AlertExecutor {
    Blocking {
        sequencer: AlertSequencer,
        panel: AlertPanel,
        clock: Arc<dyn Clock>,
    },
    Deferred(AlertWorker),
}

impl AlertExecutor {
    pub fn new(
        mode: AlertMode,
        panel: AlertPanel,
        clock: Arc<dyn Clock>,
        status: Arc<AlertStatus>,
        shutdown: ShutdownSignal,
        metrics: Arc<MetricsRecorder>,
    ) -> ScanResult<Self> {
        Ok(match mode {
            AlertMode::Blocking => AlertExecutor::Blocking {
                sequencer: AlertSequencer::with_status(status),
                panel,
                clock,
            },
            AlertMode::Deferred => {
                AlertExecutor::Deferred(AlertWorker::spawn(panel, clock, status, shutdown, metrics)?)
            }
        })
    }

    /// Plays or hands off `action`. In blocking mode this returns only after
    /// the whole sequence, or with `ShutdownRequested`.
    pub fn dispatch(&mut self, action: AlertAction, shutdown: &ShutdownSignal) -> ScanResult<()> {
        match self {
            AlertExecutor::Blocking {
                sequencer,
                panel,
                clock,
            } => sequencer
                .run_blocking(&action, panel.outputs(), &**clock, shutdown)
                .map(|_| ()),
            AlertExecutor::Deferred(worker) => worker.submit(action),
        }
    }

    /// Waits for any sequence still in flight, then releases the outputs.
    pub fn finish(self) {
        if let AlertExecutor::Deferred(worker) = self {
            worker.join();
        }
    }
}
