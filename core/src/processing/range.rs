use crate::hardware::{Clock, EchoLine, LineClaim, LineRegistry, TriggerLine};
use crate::prelude::{EchoEdge, ScanConfig, ScanError, ScanResult};
use crate::processing::sample::Distance;
use crate::telemetry::log::LogManager;
use std::sync::Arc;
use std::time::Duration;

/// Timing parameters of one ranging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTiming {
    pub trigger_pulse: Duration,
    /// Upper bound for each of the two edge waits.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl EchoTiming {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            trigger_pulse: config.trigger_pulse(),
            timeout: config.echo_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Default for EchoTiming {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Pulse-echo range sensor owning its trigger and echo lines.
pub struct RangeSensor {
    trigger: Box<dyn TriggerLine>,
    echo: Box<dyn EchoLine>,
    clock: Arc<dyn Clock>,
    timing: EchoTiming,
    _claims: Vec<LineClaim>,
    logger: LogManager,
}

impl RangeSensor {
    pub fn new(
        trigger: Box<dyn TriggerLine>,
        echo: Box<dyn EchoLine>,
        clock: Arc<dyn Clock>,
        timing: EchoTiming,
        registry: &Arc<LineRegistry>,
        lines: [u8; 2],
    ) -> ScanResult<Self> {
        let claims = registry.claim_all(&lines, "range sensor")?;
        Ok(Self {
            trigger,
            echo,
            clock,
            timing,
            _claims: claims,
            logger: LogManager::new("range"),
        })
    }

    pub fn timing(&self) -> EchoTiming {
        self.timing
    }

    /// Fires one burst and converts the echo pulse width into a distance.
    ///
    /// Fails with [`ScanError::SensorTimeout`] when either echo edge does not
    /// show up within [`EchoTiming::timeout`].
    pub fn measure(&mut self) -> ScanResult<Distance> {
        self.trigger.set_level(true);
        self.clock.sleep(self.timing.trigger_pulse);
        self.trigger.set_level(false);

        let start = self.wait_for_edge(EchoEdge::Rising)?;
        let end = self.wait_for_edge(EchoEdge::Falling)?;
        let width = end.saturating_sub(start);
        let distance = Distance::from_pulse_width(width);
        self.logger
            .detail(&format!("echo width {:?} -> {}", width, distance));
        Ok(distance)
    }

    fn wait_for_edge(&mut self, edge: EchoEdge) -> ScanResult<Duration> {
        let level = edge == EchoEdge::Rising;
        let began = self.clock.now();
        loop {
            if self.echo.is_high() == level {
                return Ok(self.clock.now());
            }
            let waited = self.clock.now().saturating_sub(began);
            if waited >= self.timing.timeout {
                return Err(ScanError::SensorTimeout { edge, waited });
            }
            self.clock.sleep(self.timing.poll_interval);
        }
    }
}
