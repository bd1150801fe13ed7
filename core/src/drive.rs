//! Operator drive surface: directional events to two-motor commands.

use crate::hardware::{LineClaim, LineRegistry, MotorDirection, MotorDriver};
use crate::prelude::{ScanError, ScanResult};
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Discrete input from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorEvent {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    /// A held direction key was let go.
    Released,
}

impl FromStr for OperatorEvent {
    type Err = ScanError;

    /// Accepts event names, arrow-style aliases and WASD keys.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "forward" | "up" | "w" => Ok(OperatorEvent::Forward),
            "backward" | "back" | "down" | "s" => Ok(OperatorEvent::Backward),
            "left" | "a" => Ok(OperatorEvent::Left),
            "right" | "d" => Ok(OperatorEvent::Right),
            "stop" | "space" | "x" => Ok(OperatorEvent::Stop),
            "release" | "released" | "r" => Ok(OperatorEvent::Released),
            other => Err(ScanError::UnrecognizedInput(other.to_string())),
        }
    }
}

/// What the motors are told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveCommand {
    Drive {
        left: MotorDirection,
        right: MotorDirection,
    },
    Stop,
}

impl DriveCommand {
    /// Left turns spin the left motor forward and the right one backward;
    /// right turns mirror that.
    pub fn from_event(event: OperatorEvent) -> Self {
        use MotorDirection::{Backward, Forward};
        match event {
            OperatorEvent::Forward => DriveCommand::Drive {
                left: Forward,
                right: Forward,
            },
            OperatorEvent::Backward => DriveCommand::Drive {
                left: Backward,
                right: Backward,
            },
            OperatorEvent::Left => DriveCommand::Drive {
                left: Forward,
                right: Backward,
            },
            OperatorEvent::Right => DriveCommand::Drive {
                left: Backward,
                right: Forward,
            },
            OperatorEvent::Stop | OperatorEvent::Released => DriveCommand::Stop,
        }
    }
}

/// Owns the motor lines and forwards operator events to the driver.
/// Stops the motors when dropped.
pub struct DriveController {
    motors: Arc<dyn MotorDriver>,
    last: DriveCommand,
    _claims: Vec<LineClaim>,
    logger: LogManager,
}

impl DriveController {
    pub fn new(
        motors: Arc<dyn MotorDriver>,
        registry: &Arc<LineRegistry>,
        lines: [u8; 4],
    ) -> ScanResult<Self> {
        let claims = registry.claim_all(&lines, "drive motors")?;
        motors.stop_motors()?;
        Ok(Self {
            motors,
            last: DriveCommand::Stop,
            _claims: claims,
            logger: LogManager::new("drive"),
        })
    }

    pub fn last_command(&self) -> DriveCommand {
        self.last
    }

    pub fn handle(&mut self, event: OperatorEvent) -> ScanResult<DriveCommand> {
        let command = DriveCommand::from_event(event);
        match command {
            DriveCommand::Drive { left, right } => self.motors.drive_motors(left, right)?,
            DriveCommand::Stop => self.motors.stop_motors()?,
        }
        self.logger
            .detail(&format!("{:?} -> {:?}", event, command));
        self.last = command;
        Ok(command)
    }
}

impl Drop for DriveController {
    fn drop(&mut self) {
        if let Err(err) = self.motors.stop_motors() {
            self.logger.warn(&format!("stopping motors on release: {err}"));
        }
    }
}
